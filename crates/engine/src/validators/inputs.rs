//! INPUTS: every value the decision may read, declared up front.

use super::{confirmed, matches_pattern, non_empty_list, record, text};
use ddrgate_core::{Finding, InputType, ReasonCode, next_action};
use serde_json::Value;
use std::collections::BTreeMap;

/// Input names must be usable as condition variables.
const INPUT_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

pub fn validate_inputs(artifact: &Value) -> Vec<Finding> {
    let Some(inputs) = record(artifact) else {
        return vec![Finding::new(
            ReasonCode::InputsMissingInputs,
            "INPUTS artifact is missing.",
            next_action::DECLARE_INPUTS,
        )];
    };

    let mut findings = Vec::new();

    if !confirmed(inputs, "no_undeclared_inputs_confirmed") {
        findings.push(
            Finding::new(
                ReasonCode::InputsViolationImplicitInputDetected,
                "It must be explicitly confirmed that no undeclared inputs exist.",
                next_action::CONFIRM_NO_UNDECLARED_INPUTS,
            )
            .on_field("no_undeclared_inputs_confirmed"),
        );
    }

    let Some(declared) = non_empty_list(inputs, "inputs") else {
        findings.insert(
            0,
            Finding::new(
                ReasonCode::InputsMissingInputs,
                "At least one input must be declared.",
                next_action::DECLARE_INPUTS,
            )
            .on_field("inputs"),
        );
        return findings;
    };

    let mut name_counts: BTreeMap<&str, usize> = BTreeMap::new();

    for (index, entry) in declared.iter().enumerate() {
        let path = |field: &str| format!("inputs[{index}].{field}");
        let Some(input) = entry.as_object() else {
            findings.push(
                Finding::new(
                    ReasonCode::InputsMissingInputName,
                    format!("Input #{index} is not a declaration record."),
                    next_action::SET_INPUT_NAME,
                )
                .at(format!("inputs[{index}]")),
            );
            continue;
        };

        let name = text(input, "input_name");
        match name {
            None => findings.push(
                Finding::new(
                    ReasonCode::InputsMissingInputName,
                    "Input name is required.",
                    next_action::SET_INPUT_NAME,
                )
                .at(path("input_name")),
            ),
            Some(name) => {
                *name_counts.entry(name).or_default() += 1;
                if !matches_pattern(INPUT_NAME_PATTERN, name) {
                    findings.push(
                        Finding::new(
                            ReasonCode::InputsInvalidInputNameFormat,
                            format!("Input name '{name}' must be an identifier (letters, digits, '_')."),
                            next_action::SET_INPUT_NAME,
                        )
                        .at(path("input_name"))
                        .target(name),
                    );
                }
            }
        }

        match text(input, "input_type") {
            None => findings.push(
                Finding::new(
                    ReasonCode::InputsMissingInputType,
                    "Input type is required.",
                    next_action::SET_INPUT_TYPE,
                )
                .at(path("input_type"))
                .with_target(name),
            ),
            Some(raw) if InputType::parse(raw).is_none() => findings.push(
                Finding::new(
                    ReasonCode::InputsInvalidInputType,
                    format!(
                        "Input type '{raw}' is not one of string, number, boolean, object, enum."
                    ),
                    next_action::SET_INPUT_TYPE,
                )
                .at(path("input_type"))
                .with_target(name),
            ),
            Some(_) => {}
        }

        if text(input, "input_source").is_none() {
            findings.push(
                Finding::new(
                    ReasonCode::InputsMissingInputSource,
                    "Input source is required.",
                    next_action::SET_INPUT_SOURCE,
                )
                .at(path("input_source"))
                .with_target(name),
            );
        }

        if text(input, "trust_level").is_none() {
            findings.push(
                Finding::new(
                    ReasonCode::InputsMissingTrustLevel,
                    "Trust level is required.",
                    next_action::SET_TRUST_LEVEL,
                )
                .at(path("trust_level"))
                .with_target(name),
            );
        }

        if !input.get("required").is_some_and(Value::is_boolean) {
            findings.push(
                Finding::new(
                    ReasonCode::InputsMissingRequiredFlag,
                    "Required flag must be an explicit boolean.",
                    next_action::SET_REQUIRED_FLAG,
                )
                .at(path("required"))
                .with_target(name),
            );
        }

        if text(input, "missing_input_behavior").is_none() {
            findings.push(
                Finding::new(
                    ReasonCode::InputsMissingMissingInputBehavior,
                    "Behavior for a missing input must be declared.",
                    next_action::SET_MISSING_INPUT_BEHAVIOR,
                )
                .at(path("missing_input_behavior"))
                .with_target(name),
            );
        }
    }

    for (name, count) in name_counts {
        if count > 1 {
            findings.push(
                Finding::new(
                    ReasonCode::InputsConflictDuplicateInputName,
                    format!("Input name '{name}' is declared {count} times."),
                    next_action::RENAME_DUPLICATE_INPUT,
                )
                .at("inputs")
                .target(name),
            );
        }
    }

    findings
}
