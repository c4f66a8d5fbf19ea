//! Findings: the structured governance results every validator emits.
//!
//! A finding names a [`ReasonCode`], carries that code's severity and
//! governing invariant, and tells the caller exactly what to do next.

use crate::reason_code::ReasonCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How hard a finding stops progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Progress is halted until the submission is fixed.
    Block,
    /// Unrecoverable for the current state; start over or reset.
    Reject,
    /// Informational; never holds a stage back.
    Warn,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Block => "BLOCK",
            Severity::Reject => "REJECT",
            Severity::Warn => "WARN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The governance invariant a finding enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Invariant {
    AllBehaviorDeclared,
    AuthorityNeverFlowsUpward,
    NoAmbiguityPersists,
    RefusalIsMandatory,
    OutputsAreFinite,
    OnlyDeclaredInputs,
    DeterminismRequired,
    AllPathsTerminate,
    ReproducibilityRequired,
}

impl Invariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Invariant::AllBehaviorDeclared => "ALL_BEHAVIOR_DECLARED",
            Invariant::AuthorityNeverFlowsUpward => "AUTHORITY_NEVER_FLOWS_UPWARD",
            Invariant::NoAmbiguityPersists => "NO_AMBIGUITY_PERSISTS",
            Invariant::RefusalIsMandatory => "REFUSAL_IS_MANDATORY",
            Invariant::OutputsAreFinite => "OUTPUTS_ARE_FINITE",
            Invariant::OnlyDeclaredInputs => "ONLY_DECLARED_INPUTS",
            Invariant::DeterminismRequired => "DETERMINISM_REQUIRED",
            Invariant::AllPathsTerminate => "ALL_PATHS_TERMINATE",
            Invariant::ReproducibilityRequired => "REPRODUCIBILITY_REQUIRED",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frozen next-action identifiers attached to findings.
pub mod next_action {
    pub const CREATE_NEW_SESSION: &str = "CREATE_NEW_SESSION";
    pub const RUN_SIMULATION: &str = "RUN_SIMULATION";
    pub const RESET_TO_LAST_VALID_STAGE: &str = "RESET_TO_LAST_VALID_STAGE";
    pub const COMPLETE_PRIOR_STAGES: &str = "COMPLETE_PRIOR_STAGES";
    pub const RETURN_TO_BLOCKED_STAGE: &str = "RETURN_TO_BLOCKED_STAGE";
    pub const CONFIRM_FINAL_ACCEPTANCE: &str = "CONFIRM_FINAL_ACCEPTANCE";
    pub const FIX_CONTRACT_CANONICALIZATION: &str = "FIX_CONTRACT_CANONICALIZATION";

    pub const SET_CONTRACT_VERSION: &str = "SET_CONTRACT_VERSION";
    pub const FIX_CONTRACT_VERSION: &str = "FIX_CONTRACT_VERSION";
    pub const SET_DECISION_ID: &str = "SET_DECISION_ID";
    pub const FIX_DECISION_ID: &str = "FIX_DECISION_ID";
    pub const DEFINE_OPERATIONAL_PURPOSE: &str = "DEFINE_OPERATIONAL_PURPOSE";
    pub const MAKE_PURPOSE_OPERATIONAL: &str = "MAKE_PURPOSE_OPERATIONAL";
    pub const DEFINE_EXECUTION_TRIGGER: &str = "DEFINE_EXECUTION_TRIGGER";
    pub const DECLARE_AUTHORITY: &str = "DECLARE_AUTHORITY";
    pub const DECLARE_NON_AUTHORITY: &str = "DECLARE_NON_AUTHORITY";
    pub const RESOLVE_AUTHORITY_CONFLICT: &str = "RESOLVE_AUTHORITY_CONFLICT";
    pub const DEFINE_REFUSAL_CONDITIONS: &str = "DEFINE_REFUSAL_CONDITIONS";

    pub const DECLARE_INPUTS: &str = "DECLARE_INPUTS";
    pub const SET_INPUT_NAME: &str = "SET_INPUT_NAME";
    pub const SET_INPUT_TYPE: &str = "SET_INPUT_TYPE";
    pub const SET_INPUT_SOURCE: &str = "SET_INPUT_SOURCE";
    pub const SET_TRUST_LEVEL: &str = "SET_TRUST_LEVEL";
    pub const SET_REQUIRED_FLAG: &str = "SET_REQUIRED_FLAG";
    pub const SET_MISSING_INPUT_BEHAVIOR: &str = "SET_MISSING_INPUT_BEHAVIOR";
    pub const CONFIRM_NO_UNDECLARED_INPUTS: &str = "CONFIRM_NO_UNDECLARED_INPUTS";
    pub const RENAME_DUPLICATE_INPUT: &str = "RENAME_DUPLICATE_INPUT";

    pub const DEFINE_OUTPUT_SCHEMA: &str = "DEFINE_OUTPUT_SCHEMA";
    pub const DEFINE_ALLOWED_OUTPUTS: &str = "DEFINE_ALLOWED_OUTPUTS";
    pub const DEDUP_ALLOWED_OUTPUTS: &str = "DEDUP_ALLOWED_OUTPUTS";
    pub const SET_REFUSAL_OUTPUT: &str = "SET_REFUSAL_OUTPUT";
    pub const CHOOSE_ALLOWED_REFUSAL_OUTPUT: &str = "CHOOSE_ALLOWED_REFUSAL_OUTPUT";
    pub const SET_OUTPUT_AUTHORITY_LEVEL: &str = "SET_OUTPUT_AUTHORITY_LEVEL";

    pub const DECLARE_POLICIES: &str = "DECLARE_POLICIES";
    pub const SET_POLICY_STATEMENT: &str = "SET_POLICY_STATEMENT";
    pub const BOUND_POLICY_STATEMENT: &str = "BOUND_POLICY_STATEMENT";
    pub const REMOVE_POLICY_OUTCOME: &str = "REMOVE_POLICY_OUTCOME";
    pub const SET_POLICY_PRECEDENCE: &str = "SET_POLICY_PRECEDENCE";
    pub const RESOLVE_POLICY_CONFLICT: &str = "RESOLVE_POLICY_CONFLICT";

    pub const ADD_RULE: &str = "ADD_RULE";
    pub const FIX_RULE_EXPRESSION: &str = "FIX_RULE_EXPRESSION";
    pub const REMOVE_NONDETERMINISM: &str = "REMOVE_NONDETERMINISM";
    pub const DECLARE_STATE_AS_INPUT: &str = "DECLARE_STATE_AS_INPUT";
    pub const DECLARE_REFERENCED_INPUT: &str = "DECLARE_REFERENCED_INPUT";
    pub const SELECT_ALLOWED_OUTPUT: &str = "SELECT_ALLOWED_OUTPUT";
    pub const REMOVE_INPUT_MUTATION: &str = "REMOVE_INPUT_MUTATION";
    pub const ADD_TERMINATION_RULE: &str = "ADD_TERMINATION_RULE";
    pub const ADD_COVERAGE_RULES: &str = "ADD_COVERAGE_RULES";

    pub const ADD_VALID_CASE: &str = "ADD_VALID_CASE";
    pub const ADD_REFUSAL_CASE: &str = "ADD_REFUSAL_CASE";
    pub const FIX_CASE_INPUTS: &str = "FIX_CASE_INPUTS";
    pub const FIX_RULES_OR_EXPECTATION: &str = "FIX_RULES_OR_EXPECTATION";
}

/// A single structured validation or governance result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub code: ReasonCode,
    pub severity: Severity,
    pub invariant: Invariant,
    pub field_path: Option<String>,
    pub message: String,
    pub next_action: String,
    pub action_target: Option<String>,
}

impl Finding {
    /// Build a finding, taking severity and invariant from the code's catalogue entry.
    pub fn new(code: ReasonCode, message: impl Into<String>, next_action: &str) -> Self {
        Self {
            code,
            severity: code.severity(),
            invariant: code.invariant(),
            field_path: None,
            message: message.into(),
            next_action: next_action.to_string(),
            action_target: None,
        }
    }

    pub fn at(mut self, field_path: impl Into<String>) -> Self {
        self.field_path = Some(field_path.into());
        self
    }

    pub fn target(mut self, action_target: impl Into<String>) -> Self {
        self.action_target = Some(action_target.into());
        self
    }

    pub fn with_target(self, action_target: Option<&str>) -> Self {
        match action_target {
            Some(target) => self.target(target),
            None => self,
        }
    }

    /// Shorthand for a finding whose path and target are the same field.
    pub fn on_field(self, field: &str) -> Self {
        self.at(field).target(field)
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.severity, Severity::Block | Severity::Reject)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(path) = &self.field_path {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

/// True when any finding halts progress.
pub fn has_blocking(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_blocking)
}

// ── Guard findings shared by the facade ──────────────────────────────────

/// The session already reached a terminal status.
pub fn session_already_finalized() -> Finding {
    Finding::new(
        ReasonCode::GlobalViolationSessionAlreadyFinalized,
        "Session is terminal and cannot be modified.",
        next_action::CREATE_NEW_SESSION,
    )
}

/// The final stage only accepts simulation runs.
pub fn simulation_stage_not_submittable() -> Finding {
    Finding::new(
        ReasonCode::GlobalViolationSimulationStageNotSubmittable,
        "SIMULATION_FINALIZATION cannot be submitted directly; run a simulation instead.",
        next_action::RUN_SIMULATION,
    )
}

/// The requested stage move does not match where the session is.
pub fn inconsistent_stage_state(message: impl Into<String>) -> Finding {
    Finding::new(
        ReasonCode::GlobalInconsistentStageState,
        message,
        next_action::RESET_TO_LAST_VALID_STAGE,
    )
}

/// A prior stage has not reached READY.
pub fn stage_not_ready(stage: crate::Stage) -> Finding {
    Finding::new(
        ReasonCode::SimulationIncompleteStagesNotReady,
        format!("Stage {stage} must be READY before proceeding."),
        next_action::COMPLETE_PRIOR_STAGES,
    )
    .at(format!("stage_states.{stage}"))
    .target(stage.as_str())
}

pub fn missing_acceptance_confirmation() -> Finding {
    Finding::new(
        ReasonCode::FinalizationMissingAcceptanceConfirmation,
        "Final acceptance must be explicitly confirmed.",
        next_action::CONFIRM_FINAL_ACCEPTANCE,
    )
    .on_field("acceptance_confirmation")
}

pub fn simulation_not_passed() -> Finding {
    Finding::new(
        ReasonCode::FinalizationIncompleteSimulationNotPassed,
        "Simulation must pass before the contract can be finalized.",
        next_action::RETURN_TO_BLOCKED_STAGE,
    )
    .at("stage_states.SIMULATION_FINALIZATION")
    .target(crate::Stage::SimulationFinalization.as_str())
}

pub fn contract_hash_missing(detail: impl fmt::Display) -> Finding {
    Finding::new(
        ReasonCode::FinalizationViolationContractHashMissing,
        format!("Contract hash could not be produced: {detail}"),
        next_action::FIX_CONTRACT_CANONICALIZATION,
    )
}

pub fn contract_not_canonical(detail: impl fmt::Display) -> Finding {
    Finding::new(
        ReasonCode::FinalizationInvalidContractNotCanonical,
        format!("Contract record cannot be canonicalized: {detail}"),
        next_action::FIX_CONTRACT_CANONICALIZATION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stage;

    #[test]
    fn finding_takes_severity_and_invariant_from_code() {
        let f = Finding::new(
            ReasonCode::FramingMissingDecisionId,
            "Decision identifier is required.",
            next_action::SET_DECISION_ID,
        )
        .on_field("decision_id");
        assert_eq!(f.severity, Severity::Block);
        assert_eq!(f.invariant, Invariant::AllBehaviorDeclared);
        assert_eq!(f.field_path.as_deref(), Some("decision_id"));
        assert_eq!(f.action_target.as_deref(), Some("decision_id"));
    }

    #[test]
    fn finding_serializes_with_string_code() {
        let f = session_already_finalized();
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["code"], "META_GLOBAL_VIOLATION_session_already_finalized");
        assert_eq!(json["severity"], "REJECT");
        assert_eq!(json["invariant"], "REPRODUCIBILITY_REQUIRED");
        assert_eq!(json["next_action"], "CREATE_NEW_SESSION");
        assert!(json["field_path"].is_null());
    }

    #[test]
    fn stage_not_ready_points_at_stage() {
        let f = stage_not_ready(Stage::Outputs);
        assert_eq!(f.severity, Severity::Block);
        assert_eq!(f.field_path.as_deref(), Some("stage_states.OUTPUTS"));
        assert_eq!(f.action_target.as_deref(), Some("OUTPUTS"));
    }

    #[test]
    fn warn_findings_are_not_blocking() {
        let warn = Finding::new(
            ReasonCode::VersioningInvalidVersionFormat,
            "Version is not semantic.",
            next_action::FIX_CONTRACT_VERSION,
        );
        assert_eq!(warn.severity, Severity::Warn);
        assert!(!has_blocking(&[warn]));
        assert!(has_blocking(&[missing_acceptance_confirmation()]));
    }

    #[test]
    fn display_includes_path() {
        let text = missing_acceptance_confirmation().to_string();
        assert!(text.starts_with("[BLOCK] META_FINALIZATION_MISSING_acceptance_confirmation"));
        assert!(text.contains("(at acceptance_confirmation)"));
    }
}
