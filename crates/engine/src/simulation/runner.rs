//! Deterministic evaluation of simulation cases against a session's artifacts.

use super::assertions::{
    all_asserted_cases_passed, detect_non_reproducible_outputs, has_asserted_refusal_case,
    has_asserted_valid_case,
};
use crate::expression::{Condition, parse_condition};
use crate::finalization::canonical::canonicalize;
use crate::validators::{record, string_items, text};
use ddrgate_core::finding::has_blocking;
use ddrgate_core::{
    Finding, InputType, ReasonCode, Session, SimulationCase, SimulationCaseResult, Stage,
    StageState, Trace, next_action,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Outcome of a simulation batch before the facade records it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub case_results: Vec<SimulationCaseResult>,
    pub findings: Vec<Finding>,
    pub stage_state: StageState,
}

struct DeclaredInput {
    name: String,
    input_type: String,
    required: bool,
}

/// A rule with its condition parsed once for the whole batch.
struct CompiledRule {
    rule_id: String,
    condition: Option<Condition>,
    output: String,
}

/// Everything a case needs, read once from the session.
struct Contract {
    version: String,
    inputs: Vec<DeclaredInput>,
    allowed_outputs: Vec<String>,
    refusal_output: String,
    policy_checks: Vec<String>,
    rules: Vec<CompiledRule>,
}

fn stage_record(session: &Session, stage: Stage) -> Option<&Map<String, Value>> {
    session.artifact(stage).and_then(record)
}

/// The record members of an array field, with their index in the array.
fn entries<'a>(
    record: Option<&'a Map<String, Value>>,
    key: &str,
) -> impl Iterator<Item = (usize, &'a Map<String, Value>)> {
    record
        .and_then(|r| r.get(key))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, item)| item.as_object().map(|entry| (index, entry)))
}

fn owned_text(record: Option<&Map<String, Value>>, key: &str) -> String {
    record
        .and_then(|r| text(r, key))
        .unwrap_or_default()
        .to_string()
}

impl Contract {
    /// Read the contract field by field. A malformed field only loses
    /// itself, never its neighbours.
    fn from_session(session: &Session) -> Self {
        let framing = stage_record(session, Stage::Framing);
        let inputs = stage_record(session, Stage::Inputs);
        let outputs = stage_record(session, Stage::Outputs);
        let policies = stage_record(session, Stage::Policies);
        let rules = stage_record(session, Stage::Rules);

        Self {
            version: owned_text(framing, "contract_version"),
            inputs: entries(inputs, "inputs")
                .filter_map(|(_, declaration)| {
                    Some(DeclaredInput {
                        name: text(declaration, "input_name")?.to_string(),
                        input_type: owned_text(Some(declaration), "input_type"),
                        required: declaration.get("required").and_then(Value::as_bool)
                            == Some(true),
                    })
                })
                .collect(),
            allowed_outputs: outputs
                .map(|o| string_items(o, "allowed_outputs"))
                .unwrap_or_default(),
            refusal_output: owned_text(outputs, "refusal_output"),
            policy_checks: policy_ids_by_precedence(policies),
            rules: entries(rules, "rules")
                .map(|(index, rule)| CompiledRule {
                    rule_id: text(rule, "rule_id")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("rules[{index}]")),
                    condition: text(rule, "when").and_then(|when| parse_condition(when).ok()),
                    output: owned_text(Some(rule), "then"),
                })
                .collect(),
        }
    }

    /// Every violation in a case's input map, as `(input name, problem)`.
    fn input_violations(&self, provided: &BTreeMap<String, Value>) -> Vec<(String, String)> {
        let mut violations = Vec::new();

        for name in provided.keys() {
            if !self.inputs.iter().any(|d| &d.name == name) {
                violations.push((name.clone(), format!("'{name}' is not a declared input")));
            }
        }

        for declaration in &self.inputs {
            let name = &declaration.name;
            match provided.get(name) {
                None if declaration.required => {
                    violations.push((name.clone(), format!("required input '{name}' is missing")));
                }
                None => {}
                Some(value) => {
                    let type_ok = InputType::parse(&declaration.input_type)
                        .is_some_and(|declared| declared.matches(value));
                    if !type_ok {
                        violations.push((
                            name.clone(),
                            format!(
                                "'{name}' must be of type {}",
                                declaration.input_type
                            ),
                        ));
                    }
                }
            }
        }

        violations
    }

    /// First rule whose condition holds, in declared order.
    fn first_match(&self, inputs: &BTreeMap<String, Value>) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| {
            rule.condition
                .as_ref()
                .is_some_and(|condition| condition.evaluate(inputs))
        })
    }

    fn is_allowed(&self, output: &str) -> bool {
        self.allowed_outputs.iter().any(|allowed| allowed == output)
    }
}

/// Policy ids ordered by precedence, then id. Policies without a numeric
/// precedence sort last; unnamed ones are identified by position.
fn policy_ids_by_precedence(policies: Option<&Map<String, Value>>) -> Vec<String> {
    let mut ordered: Vec<(f64, String)> = entries(policies, "policies")
        .map(|(index, policy)| {
            (
                policy
                    .get("precedence")
                    .and_then(Value::as_f64)
                    .unwrap_or(f64::INFINITY),
                text(policy, "policy_id")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("policies[{index}]")),
            )
        })
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    ordered.into_iter().map(|(_, id)| id).collect()
}

/// Run every case, collect findings, and derive the SIMULATION_FINALIZATION state.
///
/// The caller is responsible for checking that prior stages are READY.
pub fn run_cases(session: &Session, cases: &[SimulationCase]) -> SimulationRun {
    let contract = Contract::from_session(session);
    let mut findings = Vec::new();
    let mut case_results = Vec::with_capacity(cases.len());
    let mut input_keys = BTreeMap::new();

    for case in cases {
        let (result, case_findings) = run_case(&contract, case);
        debug!(
            case = %case.case_id,
            output = %result.output,
            passed = ?result.assertion_passed,
            "Simulation case evaluated"
        );
        if let Ok(key) = canonicalize(&case.inputs) {
            input_keys.insert(case.case_id.clone(), key);
        }
        findings.extend(case_findings);
        case_results.push(result);
    }

    let has_valid = has_asserted_valid_case(&case_results);
    let has_refusal = has_asserted_refusal_case(&case_results);

    if !has_valid {
        findings.push(
            Finding::new(
                ReasonCode::SimulationMissingValidCase,
                "At least one asserted case must pass with a non-refusal output.",
                next_action::ADD_VALID_CASE,
            )
            .at("cases"),
        );
    }
    if !has_refusal {
        findings.push(
            Finding::new(
                ReasonCode::SimulationMissingRefusalCase,
                "At least one asserted case must pass with the refusal output.",
                next_action::ADD_REFUSAL_CASE,
            )
            .at("cases"),
        );
    }

    findings.extend(detect_non_reproducible_outputs(&case_results, &input_keys));

    let ready = !has_blocking(&findings)
        && has_valid
        && has_refusal
        && all_asserted_cases_passed(&case_results);
    let stage_state = if ready {
        StageState::Ready
    } else {
        StageState::Blocked
    };

    SimulationRun {
        case_results,
        findings,
        stage_state,
    }
}

fn run_case(contract: &Contract, case: &SimulationCase) -> (SimulationCaseResult, Vec<Finding>) {
    let mut findings = Vec::new();
    let case_path = format!("cases[case_id={}]", case.case_id);

    let violations = contract.input_violations(&case.inputs);
    let (mut output, matched_rule) = if violations.is_empty() {
        match contract.first_match(&case.inputs) {
            Some(rule) => (rule.output.clone(), Some(rule.rule_id.clone())),
            None => (contract.refusal_output.clone(), None),
        }
    } else {
        for (name, problem) in violations {
            findings.push(
                Finding::new(
                    ReasonCode::SimulationInvalidInputValues,
                    format!("Case inputs are invalid: {problem}."),
                    next_action::FIX_CASE_INPUTS,
                )
                .at(format!("{case_path}.inputs.{name}"))
                .target(case.case_id.as_str()),
            );
        }
        (contract.refusal_output.clone(), None)
    };

    if !contract.is_allowed(&output) {
        findings.push(
            Finding::new(
                ReasonCode::RulesInvalidOutputNotAllowed,
                format!("Output '{output}' is not an allowed output; refusing instead."),
                next_action::SELECT_ALLOWED_OUTPUT,
            )
            .at(case_path.as_str())
            .target(case.case_id.as_str()),
        );
        output = contract.refusal_output.clone();
    }

    let assertion_passed = case
        .expected_output
        .as_deref()
        .map(|expected| expected == output);

    if let (Some(false), Some(expected)) = (assertion_passed, case.expected_output.as_deref()) {
        findings.push(
            Finding::new(
                ReasonCode::SimulationInvalidOutputMismatch,
                format!("Expected '{expected}' but the contract produced '{output}'."),
                next_action::FIX_RULES_OR_EXPECTATION,
            )
            .at(case_path.as_str())
            .target(case.case_id.as_str()),
        );
    }

    let result = SimulationCaseResult {
        case_id: case.case_id.clone(),
        trace: Trace {
            contract_version: contract.version.clone(),
            policy_checks: contract.policy_checks.clone(),
            rule_path: matched_rule.iter().cloned().collect(),
            refusal: output == contract.refusal_output,
            matched_rule,
        },
        output,
        assertion_passed,
    };

    (result, findings)
}
