//! FRAMING: what is being decided, by whom, and when it must refuse.

use super::{matches_pattern, record, string_items, text};
use ddrgate_core::{Finding, ReasonCode, next_action};
use serde_json::Value;
use std::collections::BTreeSet;

/// Verbs that make a purpose statement operational.
const OPERATIONAL_KEYWORDS: &[&str] = &[
    "decide",
    "determine",
    "allow",
    "deny",
    "select",
    "route",
    "approve",
    "reject",
    "return",
    "calculate",
];

const DECISION_ID_PATTERN: &str = r"^[a-zA-Z0-9._-]+$";
const VERSION_PATTERN: &str = r"^\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.-]+)?$";

pub fn validate_framing(artifact: &Value) -> Vec<Finding> {
    let Some(framing) = record(artifact) else {
        return vec![Finding::new(
            ReasonCode::FramingMissingDecisionId,
            "FRAMING artifact is missing.",
            next_action::SET_DECISION_ID,
        )];
    };

    let mut findings = Vec::new();

    match text(framing, "contract_version") {
        None => findings.push(
            Finding::new(
                ReasonCode::VersioningMissingContractVersion,
                "Contract version must be declared.",
                next_action::SET_CONTRACT_VERSION,
            )
            .on_field("contract_version"),
        ),
        Some(version) if !matches_pattern(VERSION_PATTERN, version) => findings.push(
            Finding::new(
                ReasonCode::VersioningInvalidVersionFormat,
                format!("Contract version '{version}' is not MAJOR.MINOR.PATCH."),
                next_action::FIX_CONTRACT_VERSION,
            )
            .on_field("contract_version"),
        ),
        Some(_) => {}
    }

    match text(framing, "decision_id") {
        None => findings.push(
            Finding::new(
                ReasonCode::FramingMissingDecisionId,
                "Decision identifier is required.",
                next_action::SET_DECISION_ID,
            )
            .on_field("decision_id"),
        ),
        Some(id) if !matches_pattern(DECISION_ID_PATTERN, id) => findings.push(
            Finding::new(
                ReasonCode::FramingInvalidDecisionIdFormat,
                "Decision identifier may only contain letters, digits, '.', '_' and '-'.",
                next_action::FIX_DECISION_ID,
            )
            .on_field("decision_id"),
        ),
        Some(_) => {}
    }

    match text(framing, "decision_purpose") {
        None => findings.push(
            Finding::new(
                ReasonCode::FramingMissingOperationalPurpose,
                "Operational purpose must be defined.",
                next_action::DEFINE_OPERATIONAL_PURPOSE,
            )
            .on_field("decision_purpose"),
        ),
        Some(purpose) if !is_operational(purpose) => findings.push(
            Finding::new(
                ReasonCode::FramingInvalidPurposeNonOperational,
                "Purpose must describe an actionable decision outcome.",
                next_action::MAKE_PURPOSE_OPERATIONAL,
            )
            .on_field("decision_purpose"),
        ),
        Some(_) => {}
    }

    if text(framing, "execution_trigger").is_none() {
        findings.push(
            Finding::new(
                ReasonCode::FramingMissingExecutionTrigger,
                "Execution trigger must be declared.",
                next_action::DEFINE_EXECUTION_TRIGGER,
            )
            .on_field("execution_trigger"),
        );
    }

    let authority = string_items(framing, "explicit_authority");
    let non_authority = string_items(framing, "explicit_non_authority");

    if authority.is_empty() {
        findings.push(
            Finding::new(
                ReasonCode::FramingMissingExplicitAuthority,
                "Explicit authority must list at least one capability.",
                next_action::DECLARE_AUTHORITY,
            )
            .on_field("explicit_authority"),
        );
    }
    if non_authority.is_empty() {
        findings.push(
            Finding::new(
                ReasonCode::FramingMissingExplicitNonAuthority,
                "Explicit non-authority must list at least one excluded capability.",
                next_action::DECLARE_NON_AUTHORITY,
            )
            .on_field("explicit_non_authority"),
        );
    }

    let granted: BTreeSet<&str> = authority.iter().map(String::as_str).collect();
    let overlap: Vec<&str> = non_authority
        .iter()
        .map(String::as_str)
        .filter(|item| granted.contains(item))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !overlap.is_empty() {
        findings.push(
            Finding::new(
                ReasonCode::FramingConflictAuthorityVsNonAuthority,
                "The same capability is both granted and excluded.",
                next_action::RESOLVE_AUTHORITY_CONFLICT,
            )
            .at("explicit_authority")
            .target(overlap.join(", ")),
        );
    }

    if string_items(framing, "refusal_conditions").is_empty() {
        findings.push(
            Finding::new(
                ReasonCode::FramingMissingRefusalConditions,
                "At least one refusal condition must be declared.",
                next_action::DEFINE_REFUSAL_CONDITIONS,
            )
            .on_field("refusal_conditions"),
        );
    }

    findings
}

fn is_operational(purpose: &str) -> bool {
    super::contains_any_keyword(purpose, OPERATIONAL_KEYWORDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddrgate_core::Severity;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "decision_id": "age_gate",
            "decision_purpose": "Determine whether a user may access the service.",
            "execution_trigger": "on_signup",
            "explicit_authority": ["grant_access"],
            "explicit_non_authority": ["pricing"],
            "refusal_conditions": ["user_age is missing"],
            "contract_version": "1.0.0"
        })
    }

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    fn with(field: &str, value: Value) -> Value {
        let mut artifact = valid();
        artifact[field] = value;
        artifact
    }

    #[test]
    fn valid_framing_passes() {
        assert!(validate_framing(&valid()).is_empty());
    }

    #[test]
    fn null_artifact_yields_single_finding_without_path() {
        let findings = validate_framing(&Value::Null);
        assert_eq!(codes(&findings), vec!["META_FRAMING_MISSING_decision_id"]);
        assert_eq!(findings[0].field_path, None);
    }

    #[test]
    fn missing_contract_version() {
        let findings = validate_framing(&with("contract_version", json!("  ")));
        assert_eq!(codes(&findings), vec!["META_VERSIONING_MISSING_contract_version"]);
        assert_eq!(findings[0].next_action, "SET_CONTRACT_VERSION");
    }

    #[test]
    fn loose_version_only_warns() {
        let findings = validate_framing(&with("contract_version", json!("v1")));
        assert_eq!(codes(&findings), vec!["META_VERSIONING_INVALID_version_format"]);
        assert_eq!(findings[0].severity, Severity::Warn);
    }

    #[test]
    fn decision_id_format() {
        let findings = validate_framing(&with("decision_id", json!("age gate!")));
        assert_eq!(codes(&findings), vec!["META_FRAMING_INVALID_decision_id_format"]);
        let findings = validate_framing(&with("decision_id", json!("")));
        assert_eq!(codes(&findings), vec!["META_FRAMING_MISSING_decision_id"]);
    }

    #[test]
    fn purpose_must_be_operational() {
        let findings = validate_framing(&with("decision_purpose", json!("Improve the user experience.")));
        assert_eq!(codes(&findings), vec!["META_FRAMING_INVALID_purpose_non_operational"]);
        let findings = validate_framing(&with("decision_purpose", json!("We DECIDE eligibility.")));
        assert!(findings.is_empty());
    }

    #[test]
    fn empty_authority_lists() {
        let mut artifact = valid();
        artifact["explicit_authority"] = json!([]);
        artifact["explicit_non_authority"] = json!(null);
        let findings = validate_framing(&artifact);
        assert_eq!(
            codes(&findings),
            vec![
                "META_FRAMING_MISSING_explicit_authority",
                "META_FRAMING_MISSING_explicit_non_authority"
            ]
        );
    }

    #[test]
    fn overlapping_authority_is_a_conflict() {
        let mut artifact = valid();
        artifact["explicit_authority"] = json!(["grant_access", "pricing"]);
        artifact["explicit_non_authority"] = json!(["pricing", "grant_access", "billing"]);
        let findings = validate_framing(&artifact);
        assert_eq!(codes(&findings), vec!["META_FRAMING_CONFLICT_authority_vs_non_authority"]);
        assert_eq!(findings[0].action_target.as_deref(), Some("grant_access, pricing"));
    }

    #[test]
    fn validation_is_exhaustive() {
        let findings = validate_framing(&json!({}));
        assert_eq!(
            codes(&findings),
            vec![
                "META_VERSIONING_MISSING_contract_version",
                "META_FRAMING_MISSING_decision_id",
                "META_FRAMING_MISSING_operational_purpose",
                "META_FRAMING_MISSING_execution_trigger",
                "META_FRAMING_MISSING_explicit_authority",
                "META_FRAMING_MISSING_explicit_non_authority",
                "META_FRAMING_MISSING_refusal_conditions",
            ]
        );
    }
}
