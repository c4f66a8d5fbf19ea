//! Frozen inputs for the harness scenarios.
//!
//! No randomness and no clock reads: every scenario run sees exactly these
//! values, so the contracts they produce hash identically run after run.

use chrono::{DateTime, TimeZone, Utc};
use ddrgate_core::{SimulationCase, Stage};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const META_CONTRACT_ID: &str = "meta.ddr";
pub const CONTRACT_VERSION: &str = "1.0.0";

/// The fixed instant every harness operation runs at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn framing() -> Value {
    json!({
        "decision_id": "age_gate_decision",
        "decision_purpose": "Determine whether a user is allowed access based on their age. This decision must be operational and enforceable.",
        "execution_trigger": "on_user_signup",
        "explicit_authority": ["grant_access", "deny_access"],
        "explicit_non_authority": ["pricing", "content_moderation"],
        "refusal_conditions": ["user_age is missing", "user_age < 18"],
        "contract_version": CONTRACT_VERSION
    })
}

pub fn inputs() -> Value {
    json!({
        "inputs": [
            {
                "input_name": "user_age",
                "input_type": "number",
                "input_source": "user_profile",
                "trust_level": "verified",
                "required": true,
                "missing_input_behavior": "REFUSE"
            },
            {
                "input_name": "country_code",
                "input_type": "string",
                "input_source": "geo_lookup",
                "trust_level": "derived",
                "required": false,
                "missing_input_behavior": "REFUSE"
            }
        ],
        "no_undeclared_inputs_confirmed": true
    })
}

pub fn outputs() -> Value {
    json!({
        "output_schema": {"type": "string", "enum": ["ALLOW", "REFUSE"]},
        "allowed_outputs": ["ALLOW", "REFUSE"],
        "terminal_states": ["ALLOW", "REFUSE"],
        "refusal_output": "REFUSE",
        "output_authority_level": "system"
    })
}

pub fn policies() -> Value {
    json!({
        "policies": [
            {
                "policy_id": "age_restriction_policy",
                "statement": "Users under 18 years of age must be refused access.",
                "timing": "pre_rule",
                "precedence": 1
            },
            {
                "policy_id": "data_completeness_policy",
                "statement": "Missing required inputs must result in refusal.",
                "timing": "pre_rule",
                "precedence": 2
            }
        ]
    })
}

/// Adults are allowed; everyone else falls through to the refusal output.
pub fn rules() -> Value {
    json!({
        "rules": [
            {
                "rule_id": "adult_access_rule",
                "when": r#"{"all":[{"var":"user_age","op":">=","value":18}]}"#,
                "then": "ALLOW"
            }
        ],
        "coverage_confirmed": true,
        "termination_confirmed": true
    })
}

/// A rule set with no path to a non-refusal output.
pub fn refusal_only_rules() -> Value {
    json!({
        "rules": [
            {"rule_id": "always_refuse", "when": "true", "then": "REFUSE"}
        ],
        "coverage_confirmed": true,
        "termination_confirmed": true
    })
}

/// Content stages in submission order, with the given RULES artifact.
pub fn stages_with_rules(rules: Value) -> Vec<(Stage, Value)> {
    vec![
        (Stage::Framing, framing()),
        (Stage::Inputs, inputs()),
        (Stage::Outputs, outputs()),
        (Stage::Policies, policies()),
        (Stage::Rules, rules),
    ]
}

fn age_case(case_id: &str, age: i64, expected: &str) -> SimulationCase {
    let inputs: BTreeMap<String, Value> = [("user_age".to_string(), json!(age))].into();
    SimulationCase::expecting(case_id, inputs, expected)
}

pub fn happy_path_cases() -> Vec<SimulationCase> {
    vec![
        age_case("adult_21_allowed", 21, "ALLOW"),
        age_case("adult_18_allowed", 18, "ALLOW"),
        age_case("minor_17_refused", 17, "REFUSE"),
        age_case("minor_10_refused", 10, "REFUSE"),
    ]
}

/// Valid cases only; no refusal case is asserted.
pub fn refusal_path_cases_incomplete() -> Vec<SimulationCase> {
    vec![
        age_case("adult_21_allowed", 21, "ALLOW"),
        age_case("adult_25_allowed", 25, "ALLOW"),
    ]
}

pub fn refusal_path_cases_corrected() -> Vec<SimulationCase> {
    vec![
        age_case("adult_21_allowed", 21, "ALLOW"),
        age_case("minor_16_refused", 16, "REFUSE"),
    ]
}

pub fn refusal_only_cases() -> Vec<SimulationCase> {
    vec![
        age_case("refusal_case_1", 25, "REFUSE"),
        age_case("refusal_case_2", 99, "REFUSE"),
    ]
}
