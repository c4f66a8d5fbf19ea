//! POLICIES: bounded constraints that shape, but never produce, a decision.
//!
//! Phrasing checks are case-insensitive substring heuristics, so `refuse`
//! also covers `refused` and `then` also fires inside `authenticate`.

use super::{contains_any_keyword, non_empty_list, record, string_items, text};
use ddrgate_core::{Finding, ReasonCode, Session, Stage, next_action};
use serde_json::Value;
use std::collections::BTreeMap;

/// A statement must contain at least one of these to count as bounded.
const RESTRICTIVE_KEYWORDS: &[&str] = &[
    "must", "shall", "never", "only", "not", "cannot", "prohibit", "forbid", "deny", "refuse",
    "restrict", "require", "limit",
];

/// A statement containing any of these is trying to decide the outcome itself.
const OUTCOME_KEYWORDS: &[&str] = &["then", "return", "approve", "assign"];

/// Assignment-like phrases matched on the whole statement.
const OUTCOME_PHRASES: &[&str] = &["output =", "outcome ="];

pub fn validate_policies(artifact: &Value, session: &Session) -> Vec<Finding> {
    let Some(policies) = record(artifact) else {
        return vec![Finding::new(
            ReasonCode::PoliciesMissingPolicies,
            "POLICIES artifact is missing.",
            next_action::DECLARE_POLICIES,
        )];
    };

    let Some(declared) = non_empty_list(policies, "policies") else {
        return vec![
            Finding::new(
                ReasonCode::PoliciesMissingPolicies,
                "At least one policy must be declared.",
                next_action::DECLARE_POLICIES,
            )
            .on_field("policies"),
        ];
    };

    let excluded = session
        .artifact(Stage::Framing)
        .and_then(Value::as_object)
        .map(|framing| string_items(framing, "explicit_non_authority"))
        .unwrap_or_default();

    let mut findings = Vec::new();
    let mut by_precedence: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (index, entry) in declared.iter().enumerate() {
        let path = |field: &str| format!("policies[{index}].{field}");
        let empty = serde_json::Map::new();
        let policy = entry.as_object().unwrap_or(&empty);
        let policy_id = text(policy, "policy_id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("policies[{index}]"));

        match text(policy, "statement") {
            None => findings.push(
                Finding::new(
                    ReasonCode::PoliciesMissingPolicyStatement,
                    "Policy statement is required.",
                    next_action::SET_POLICY_STATEMENT,
                )
                .at(path("statement"))
                .target(policy_id.clone()),
            ),
            Some(statement) => {
                if !is_restrictive(statement) {
                    findings.push(
                        Finding::new(
                            ReasonCode::PoliciesInvalidPolicyUnbounded,
                            "Policy must be phrased as a bounded restriction.",
                            next_action::BOUND_POLICY_STATEMENT,
                        )
                        .at(path("statement"))
                        .target(policy_id.clone()),
                    );
                }
                if generates_outcome(statement) {
                    findings.push(
                        Finding::new(
                            ReasonCode::PoliciesViolationPolicyGeneratesOutcome,
                            "Policies constrain decisions; producing an outcome belongs to RULES.",
                            next_action::REMOVE_POLICY_OUTCOME,
                        )
                        .at(path("statement"))
                        .target(policy_id.clone()),
                    );
                }
                if let Some(capability) = excluded
                    .iter()
                    .find(|capability| mentions_capability(statement, capability))
                {
                    findings.push(
                        Finding::new(
                            ReasonCode::PoliciesViolationExceedsAuthorityEnvelope,
                            format!(
                                "Policy reaches into '{capability}', which FRAMING excludes from this decision's authority."
                            ),
                            next_action::BOUND_POLICY_STATEMENT,
                        )
                        .at(path("statement"))
                        .target(policy_id.clone()),
                    );
                }
            }
        }

        match policy.get("precedence").and_then(Value::as_f64) {
            None => findings.push(
                Finding::new(
                    ReasonCode::PoliciesMissingPrecedence,
                    "Policy precedence must be a number.",
                    next_action::SET_POLICY_PRECEDENCE,
                )
                .at(path("precedence"))
                .target(policy_id),
            ),
            Some(precedence) => by_precedence
                .entry(precedence.to_string())
                .or_default()
                .push(policy_id),
        }
    }

    for (precedence, ids) in by_precedence {
        if ids.len() > 1 {
            findings.push(
                Finding::new(
                    ReasonCode::PoliciesConflictPolicyConflict,
                    format!("Policies share precedence {precedence}; ordering is ambiguous."),
                    next_action::RESOLVE_POLICY_CONFLICT,
                )
                .at("policies")
                .target(ids.join(", ")),
            );
        }
    }

    findings
}

fn is_restrictive(statement: &str) -> bool {
    contains_any_keyword(statement, RESTRICTIVE_KEYWORDS)
}

fn generates_outcome(statement: &str) -> bool {
    contains_any_keyword(statement, OUTCOME_KEYWORDS)
        || contains_any_keyword(statement, OUTCOME_PHRASES)
}

fn mentions_capability(statement: &str, capability: &str) -> bool {
    let lower = statement.to_lowercase();
    let capability = capability.to_lowercase();
    lower.contains(&capability) || lower.contains(&capability.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ddrgate_core::StageState;
    use serde_json::json;

    fn session() -> Session {
        Session::new("s", "m", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    fn policy(id: &str, statement: &str, precedence: Value) -> Value {
        json!({"policy_id": id, "statement": statement, "timing": "pre_rule", "precedence": precedence})
    }

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn bounded_policy_passes() {
        let artifact = json!({"policies": [policy(
            "p1",
            "Access must not be granted if risk score exceeds threshold.",
            json!(1),
        )]});
        assert!(validate_policies(&artifact, &session()).is_empty());
    }

    #[test]
    fn harness_policies_pass() {
        let artifact = json!({"policies": [
            policy("age_restriction_policy", "Users under 18 years of age must be refused access.", json!(1)),
            policy("data_completeness_policy", "Missing required inputs must result in refusal.", json!(2)),
        ]});
        assert!(validate_policies(&artifact, &session()).is_empty());
    }

    #[test]
    fn unbounded_statement() {
        let artifact = json!({"policies": [policy("p1", "Ensure fairness at all times.", json!(1))]});
        assert_eq!(
            codes(&validate_policies(&artifact, &session())),
            vec!["META_POLICIES_INVALID_policy_unbounded"]
        );
    }

    #[test]
    fn outcome_generating_statement() {
        let artifact = json!({"policies": [policy("p1", "If age < 18 then deny access.", json!(1))]});
        assert_eq!(
            codes(&validate_policies(&artifact, &session())),
            vec!["META_POLICIES_VIOLATION_policy_generates_outcome"]
        );
    }

    #[test]
    fn missing_precedence() {
        let artifact = json!({"policies": [{"policy_id": "p1", "statement": "Access must be limited."}]});
        assert_eq!(
            codes(&validate_policies(&artifact, &session())),
            vec!["META_POLICIES_MISSING_precedence"]
        );
    }

    #[test]
    fn shared_precedence_is_a_conflict() {
        let artifact = json!({"policies": [
            policy("p1", "Access must be limited.", json!(1)),
            policy("p2", "Minors must be refused.", json!(1.0)),
        ]});
        let findings = validate_policies(&artifact, &session());
        assert_eq!(codes(&findings), vec!["META_POLICIES_CONFLICT_policy_conflict"]);
        assert_eq!(findings[0].action_target.as_deref(), Some("p1, p2"));
    }

    #[test]
    fn empty_statement_and_missing_precedence() {
        let artifact = json!({"policies": [{"policy_id": "p1", "statement": ""}]});
        let findings = validate_policies(&artifact, &session());
        assert!(findings.len() >= 2);
        assert_eq!(
            codes(&findings),
            vec![
                "META_POLICIES_MISSING_policy_statement",
                "META_POLICIES_MISSING_precedence"
            ]
        );
    }

    #[test]
    fn null_artifact() {
        assert_eq!(
            codes(&validate_policies(&Value::Null, &session())),
            vec!["META_POLICIES_MISSING_policies"]
        );
        assert_eq!(
            codes(&validate_policies(&json!({"policies": []}), &session())),
            vec!["META_POLICIES_MISSING_policies"]
        );
    }

    #[test]
    fn policy_may_not_reach_excluded_authority() {
        let session = session().with_submission(
            Stage::Framing,
            json!({"explicit_non_authority": ["content_moderation"]}),
            StageState::Ready,
        );
        let artifact = json!({"policies": [policy(
            "p1",
            "Content moderation must only flag adult material.",
            json!(1),
        )]});
        assert_eq!(
            codes(&validate_policies(&artifact, &session)),
            vec!["META_POLICIES_VIOLATION_exceeds_authority_envelope"]
        );
    }

    #[test]
    fn keywords_match_anywhere_in_the_statement() {
        assert!(generates_outcome("The rule returns ALLOW."));
        assert!(generates_outcome("Set output = ALLOW when adult."));
        assert!(is_restrictive("Requests are restricted to adults."));
        assert!(is_restrictive("NEVER share raw scores."));
    }

    #[test]
    fn outcome_keyword_inside_a_longer_word_still_counts() {
        let artifact = json!({"policies": [policy("p1", "Users must authenticate first.", json!(1))]});
        let findings = validate_policies(&artifact, &session());
        assert_eq!(
            codes(&findings),
            vec!["META_POLICIES_VIOLATION_policy_generates_outcome"]
        );
        assert_eq!(findings[0].action_target.as_deref(), Some("p1"));
    }

    #[test]
    fn restrictive_keyword_inside_a_longer_word_bounds_the_policy() {
        let artifact =
            json!({"policies": [policy("p1", "Access is unrestricted for staff.", json!(1))]});
        assert!(validate_policies(&artifact, &session()).is_empty());
    }
}
