//! RULES: deterministic conditions mapping declared inputs to allowed outputs.

use super::{confirmed, non_empty_list, record, string_items, text};
use crate::expression::parse_condition;
use ddrgate_core::{Finding, ReasonCode, Session, Stage, next_action};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Substrings that make a condition depend on something other than its inputs.
const NONDETERMINISTIC_TOKENS: &[&str] = &["random", "now()", "Date()", "Math.random", "uuid"];

/// Prefixes that reach into ambient state instead of declared inputs.
const HIDDEN_STATE_TOKENS: &[&str] = &["session.", "context.", "env.", "state."];

/// Words the fallback identifier scan never treats as input names.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "true",
    "false",
    "null",
    "undefined",
    "if",
    "else",
    "and",
    "or",
    "not",
    "var",
    "op",
    "value",
    "all",
    "any",
    "in",
];

pub fn validate_rules(artifact: &Value, session: &Session) -> Vec<Finding> {
    let Some(rules) = record(artifact) else {
        return vec![Finding::new(
            ReasonCode::RulesMissingRules,
            "At least one rule must be defined.",
            next_action::ADD_RULE,
        )];
    };

    let declared_inputs = declared_input_names(session);
    let allowed_outputs = session
        .artifact(Stage::Outputs)
        .and_then(Value::as_object)
        .map(|outputs| string_items(outputs, "allowed_outputs"))
        .unwrap_or_default();

    let mut findings = Vec::new();

    match non_empty_list(rules, "rules") {
        None => findings.push(
            Finding::new(
                ReasonCode::RulesMissingRules,
                "At least one rule must be defined.",
                next_action::ADD_RULE,
            )
            .on_field("rules"),
        ),
        Some(list) => {
            let empty = Map::new();
            for (index, entry) in list.iter().enumerate() {
                let rule = entry.as_object().unwrap_or(&empty);
                check_rule(index, rule, &declared_inputs, &allowed_outputs, &mut findings);
            }
        }
    }

    if !confirmed(rules, "termination_confirmed") {
        findings.push(
            Finding::new(
                ReasonCode::RulesViolationNonTerminatingPath,
                "It must be confirmed that every evaluation path terminates.",
                next_action::ADD_TERMINATION_RULE,
            )
            .on_field("termination_confirmed"),
        );
    }
    if !confirmed(rules, "coverage_confirmed") {
        findings.push(
            Finding::new(
                ReasonCode::RulesIncompleteCoverageNotProven,
                "It must be confirmed that the rules cover every input combination.",
                next_action::ADD_COVERAGE_RULES,
            )
            .on_field("coverage_confirmed"),
        );
    }

    findings
}

fn check_rule(
    index: usize,
    rule: &Map<String, Value>,
    declared_inputs: &BTreeSet<String>,
    allowed_outputs: &[String],
    findings: &mut Vec<Finding>,
) {
    let rule_id = text(rule, "rule_id")
        .map(str::to_string)
        .unwrap_or_else(|| format!("rules[{index}]"));
    let when_path = format!("rules[{index}].when");
    let then_path = format!("rules[{index}].then");
    let finding = |code: ReasonCode, message: String, action: &str, path: &str| {
        Finding::new(code, message, action)
            .at(path)
            .target(rule_id.clone())
    };

    match text(rule, "when") {
        None => findings.push(finding(
            ReasonCode::RulesInvalidRuleExpression,
            "Rule condition must be defined.".into(),
            next_action::FIX_RULE_EXPRESSION,
            &when_path,
        )),
        Some(when) => {
            if NONDETERMINISTIC_TOKENS.iter().any(|t| when.contains(t)) {
                findings.push(finding(
                    ReasonCode::RulesViolationNondeterministicOperator,
                    "Rule condition contains a non-deterministic operator.".into(),
                    next_action::REMOVE_NONDETERMINISM,
                    &when_path,
                ));
            }
            if HIDDEN_STATE_TOKENS.iter().any(|t| when.contains(t)) {
                findings.push(finding(
                    ReasonCode::RulesViolationHiddenStateDependency,
                    "Rule condition references hidden state.".into(),
                    next_action::DECLARE_STATE_AS_INPUT,
                    &when_path,
                ));
            }

            let referenced = match parse_condition(when) {
                Ok(condition) => condition.referenced_inputs(),
                Err(reason) => {
                    findings.push(finding(
                        ReasonCode::RulesInvalidRuleExpression,
                        format!("Rule condition does not parse: {reason}"),
                        next_action::FIX_RULE_EXPRESSION,
                        &when_path,
                    ));
                    scan_identifiers(when)
                }
            };
            for name in referenced.difference(declared_inputs) {
                findings.push(
                    Finding::new(
                        ReasonCode::RulesViolationUndeclaredInputReference,
                        format!("Rule '{rule_id}' references undeclared input '{name}'."),
                        next_action::DECLARE_REFERENCED_INPUT,
                    )
                    .at(when_path.as_str())
                    .target(name.as_str()),
                );
            }
        }
    }

    match text(rule, "then") {
        None => findings.push(finding(
            ReasonCode::RulesInvalidRuleExpression,
            "Rule outcome must be defined.".into(),
            next_action::FIX_RULE_EXPRESSION,
            &then_path,
        )),
        Some(then) => {
            if !allowed_outputs.is_empty() && !allowed_outputs.iter().any(|o| o == then) {
                findings.push(finding(
                    ReasonCode::RulesInvalidOutputNotAllowed,
                    format!("Rule outcome '{then}' is not one of the allowed outputs."),
                    next_action::SELECT_ALLOWED_OUTPUT,
                    &then_path,
                ));
            }
            if then.contains('=') || then.contains("++") || then.contains("--") {
                findings.push(finding(
                    ReasonCode::RulesViolationMutatesInputs,
                    "Rules must not mutate input values.".into(),
                    next_action::REMOVE_INPUT_MUTATION,
                    &then_path,
                ));
            }
        }
    }
}

fn declared_input_names(session: &Session) -> BTreeSet<String> {
    session
        .artifact(Stage::Inputs)
        .and_then(|inputs| inputs.get("inputs"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("input_name").and_then(Value::as_str))
                .map(|name| name.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Identifier scan used when a condition does not parse.
fn scan_identifiers(expression: &str) -> BTreeSet<String> {
    expression
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| {
            !EXPRESSION_KEYWORDS
                .iter()
                .any(|k| k.eq_ignore_ascii_case(token))
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ddrgate_core::StageState;
    use serde_json::json;

    fn session() -> Session {
        Session::new("s", "m", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
            .with_submission(
                Stage::Inputs,
                json!({
                    "inputs": [{
                        "input_name": "user_age",
                        "input_type": "number",
                        "input_source": "user_profile",
                        "trust_level": "trusted",
                        "required": true,
                        "missing_input_behavior": "reject"
                    }],
                    "no_undeclared_inputs_confirmed": true
                }),
                StageState::Ready,
            )
            .with_submission(
                Stage::Outputs,
                json!({
                    "output_schema": {"type": "string"},
                    "allowed_outputs": ["ALLOW", "REFUSE"],
                    "refusal_output": "REFUSE",
                    "output_authority_level": "system"
                }),
                StageState::Ready,
            )
    }

    fn rules_with(rule: Value) -> Value {
        json!({"rules": [rule], "coverage_confirmed": true, "termination_confirmed": true})
    }

    fn adult_rule() -> Value {
        json!({"rule_id": "r1", "when": r#"{"all":[{"var":"user_age","op":">=","value":18}]}"#, "then": "ALLOW"})
    }

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn valid_rules_pass() {
        assert!(validate_rules(&rules_with(adult_rule()), &session()).is_empty());
    }

    #[test]
    fn literal_true_condition_passes() {
        let rule = json!({"rule_id": "always_refuse", "when": "true", "then": "REFUSE"});
        assert!(validate_rules(&rules_with(rule), &session()).is_empty());
    }

    #[test]
    fn null_and_empty_rules() {
        assert_eq!(
            codes(&validate_rules(&Value::Null, &session())),
            vec!["META_RULES_MISSING_rules"]
        );
        let artifact = json!({"rules": [], "coverage_confirmed": true, "termination_confirmed": true});
        assert_eq!(
            codes(&validate_rules(&artifact, &session())),
            vec!["META_RULES_MISSING_rules"]
        );
    }

    #[test]
    fn empty_when_and_then() {
        let rule = json!({"rule_id": "r1", "when": " ", "then": ""});
        let findings = validate_rules(&rules_with(rule), &session());
        assert_eq!(
            codes(&findings),
            vec![
                "META_RULES_INVALID_rule_expression",
                "META_RULES_INVALID_rule_expression"
            ]
        );
        assert_eq!(findings[0].action_target.as_deref(), Some("r1"));
        assert_eq!(findings[1].field_path.as_deref(), Some("rules[0].then"));
    }

    #[test]
    fn nondeterminism_is_case_sensitive() {
        let rule = json!({"rule_id": "r1", "when": "Math.random() > 0.5", "then": "ALLOW"});
        let findings = validate_rules(&rules_with(rule), &session());
        assert!(codes(&findings).contains(&"META_RULES_VIOLATION_nondeterministic_operator"));

        let upper = json!({"rule_id": "r1", "when": r#"{"var":"user_age","op":"==","value":"RANDOM"}"#, "then": "ALLOW"});
        assert!(validate_rules(&rules_with(upper), &session()).is_empty());
    }

    #[test]
    fn hidden_state_reference() {
        let rule = json!({"rule_id": "r1", "when": r#"{"var":"session.user_age","op":">","value":1}"#, "then": "ALLOW"});
        let findings = validate_rules(&rules_with(rule), &session());
        assert_eq!(
            codes(&findings),
            vec![
                "META_RULES_VIOLATION_hidden_state_dependency",
                "META_RULES_INVALID_rule_expression",
                "META_RULES_VIOLATION_undeclared_input_reference"
            ]
        );
        assert_eq!(findings[2].action_target.as_deref(), Some("session"));
    }

    #[test]
    fn negation_and_membership_are_not_part_of_the_language() {
        for when in [
            r#"{"not":{"var":"user_age","op":"==","value":17}}"#,
            r#"{"var":"user_age","op":"in","value":[18,19]}"#,
        ] {
            let rule = json!({"rule_id": "r1", "when": when, "then": "ALLOW"});
            let findings = validate_rules(&rules_with(rule), &session());
            assert_eq!(codes(&findings), vec!["META_RULES_INVALID_rule_expression"], "{when}");
            assert_eq!(findings[0].field_path.as_deref(), Some("rules[0].when"));
        }
    }

    #[test]
    fn each_undeclared_input_is_reported() {
        let rule = json!({
            "rule_id": "r1",
            "when": r#"{"all":[{"var":"income","op":">","value":1},{"var":"country","op":"==","value":"US"},{"var":"income","op":"<","value":9}]}"#,
            "then": "ALLOW"
        });
        let findings = validate_rules(&rules_with(rule), &session());
        assert_eq!(findings.len(), 2);
        let targets: Vec<_> = findings.iter().map(|f| f.action_target.clone().unwrap()).collect();
        assert_eq!(targets, vec!["country", "income"]);
        assert!(findings.iter().all(|f| f.invariant.as_str() == "ONLY_DECLARED_INPUTS"));
    }

    #[test]
    fn unparseable_condition_still_scans_identifiers() {
        let rule = json!({"rule_id": "r1", "when": "user_age >= 18 and income > 10", "then": "ALLOW"});
        let findings = validate_rules(&rules_with(rule), &session());
        assert_eq!(
            codes(&findings),
            vec![
                "META_RULES_INVALID_rule_expression",
                "META_RULES_VIOLATION_undeclared_input_reference"
            ]
        );
        assert_eq!(findings[1].action_target.as_deref(), Some("income"));
    }

    #[test]
    fn outcome_must_be_allowed_and_pure() {
        let rule = json!({"rule_id": "r1", "when": "true", "then": "user_age = 0"});
        assert_eq!(
            codes(&validate_rules(&rules_with(rule), &session())),
            vec![
                "META_RULES_INVALID_output_not_allowed",
                "META_RULES_VIOLATION_mutates_inputs"
            ]
        );
    }

    #[test]
    fn output_check_skipped_without_outputs_stage() {
        let bare = Session::new("s", "m", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let rule = json!({"rule_id": "r1", "when": "true", "then": "MAYBE"});
        assert!(validate_rules(&rules_with(rule), &bare).is_empty());
    }

    #[test]
    fn confirmations_required() {
        let artifact = json!({"rules": [adult_rule()]});
        assert_eq!(
            codes(&validate_rules(&artifact, &session())),
            vec![
                "META_RULES_VIOLATION_non_terminating_path",
                "META_RULES_INCOMPLETE_coverage_not_proven"
            ]
        );
    }
}
