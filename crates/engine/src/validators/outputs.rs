//! OUTPUTS: the finite set of values a decision may return.

use super::{record, text};
use ddrgate_core::{Finding, ReasonCode, next_action};
use serde_json::Value;
use std::collections::BTreeSet;

pub fn validate_outputs(artifact: &Value) -> Vec<Finding> {
    let Some(outputs) = record(artifact) else {
        return vec![Finding::new(
            ReasonCode::OutputsMissingOutputSchema,
            "OUTPUTS artifact is missing.",
            next_action::DEFINE_OUTPUT_SCHEMA,
        )];
    };

    let mut findings = Vec::new();

    match outputs.get("output_schema") {
        None | Some(Value::Null) => findings.push(
            Finding::new(
                ReasonCode::OutputsMissingOutputSchema,
                "Output schema must be defined.",
                next_action::DEFINE_OUTPUT_SCHEMA,
            )
            .on_field("output_schema"),
        ),
        Some(schema) if !schema.is_object() => findings.push(
            Finding::new(
                ReasonCode::OutputsInvalidOutputSchema,
                "Output schema must be a JSON object.",
                next_action::DEFINE_OUTPUT_SCHEMA,
            )
            .on_field("output_schema"),
        ),
        Some(_) => {}
    }

    let allowed: Vec<&str> = match outputs.get("allowed_outputs").and_then(Value::as_array) {
        None => {
            findings.push(
                Finding::new(
                    ReasonCode::OutputsMissingAllowedOutputs,
                    "Allowed outputs must be listed.",
                    next_action::DEFINE_ALLOWED_OUTPUTS,
                )
                .on_field("allowed_outputs"),
            );
            Vec::new()
        }
        Some(items) if items.is_empty() => {
            findings.push(
                Finding::new(
                    ReasonCode::OutputsInvalidAllowedOutputsEmpty,
                    "Allowed outputs cannot be empty.",
                    next_action::DEFINE_ALLOWED_OUTPUTS,
                )
                .on_field("allowed_outputs"),
            );
            Vec::new()
        }
        Some(items) => items.iter().filter_map(Value::as_str).collect(),
    };

    let mut seen = BTreeSet::new();
    for value in &allowed {
        if !seen.insert(*value) {
            findings.push(
                Finding::new(
                    ReasonCode::OutputsConflictDuplicateOutputValue,
                    format!("Allowed output '{value}' is listed more than once."),
                    next_action::DEDUP_ALLOWED_OUTPUTS,
                )
                .at("allowed_outputs")
                .target(*value),
            );
        }
    }

    match text(outputs, "refusal_output") {
        None => findings.push(
            Finding::new(
                ReasonCode::OutputsMissingRefusalOutput,
                "A refusal output must be designated.",
                next_action::SET_REFUSAL_OUTPUT,
            )
            .on_field("refusal_output"),
        ),
        Some(refusal) if !allowed.contains(&refusal) => findings.push(
            Finding::new(
                ReasonCode::OutputsInvalidRefusalOutputNotAllowed,
                format!("Refusal output '{refusal}' is not among the allowed outputs."),
                next_action::CHOOSE_ALLOWED_REFUSAL_OUTPUT,
            )
            .at("refusal_output")
            .target(refusal),
        ),
        Some(_) => {}
    }

    if text(outputs, "output_authority_level").is_none() {
        findings.push(
            Finding::new(
                ReasonCode::OutputsMissingAuthorityLevel,
                "Output authority level must be declared.",
                next_action::SET_OUTPUT_AUTHORITY_LEVEL,
            )
            .on_field("output_authority_level"),
        );
    }

    findings
}
