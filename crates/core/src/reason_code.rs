//! The frozen reason-code catalogue.
//!
//! Every governance failure mode has exactly one stable identifier of the
//! form `META_<DOMAIN>_<CLASS>_<detail>`. The identifier strings are part of
//! the public contract and must never change once published. Each entry also
//! fixes the severity and invariant its findings carry.

use crate::finding::{Invariant, Severity};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! reason_codes {
    ($( $variant:ident => $code:literal, $severity:ident, $invariant:ident; )+) => {
        /// A stable governance reason code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ReasonCode {
            $( $variant, )+
        }

        impl ReasonCode {
            /// The complete catalogue, in declaration order.
            pub const ALL: &'static [ReasonCode] = &[ $( ReasonCode::$variant, )+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( ReasonCode::$variant => $code, )+
                }
            }

            pub fn severity(self) -> Severity {
                match self {
                    $( ReasonCode::$variant => Severity::$severity, )+
                }
            }

            pub fn invariant(self) -> Invariant {
                match self {
                    $( ReasonCode::$variant => Invariant::$invariant, )+
                }
            }
        }
    };
}

reason_codes! {
    // GLOBAL
    GlobalInvalidPayloadSchema => "META_GLOBAL_INVALID_payload_schema", Reject, AllBehaviorDeclared;
    GlobalUnsupportedFeatureFlag => "META_GLOBAL_UNSUPPORTED_feature_flag", Reject, AllBehaviorDeclared;
    GlobalViolationAuthorityLeak => "META_GLOBAL_VIOLATION_authority_leak", Reject, AuthorityNeverFlowsUpward;
    GlobalInconsistentStageState => "META_GLOBAL_INCONSISTENT_stage_state", Reject, ReproducibilityRequired;
    GlobalViolationSessionAlreadyFinalized => "META_GLOBAL_VIOLATION_session_already_finalized", Reject, ReproducibilityRequired;
    GlobalViolationSimulationStageNotSubmittable => "META_GLOBAL_VIOLATION_simulation_stage_not_submittable", Reject, DeterminismRequired;

    // FRAMING
    FramingMissingDecisionId => "META_FRAMING_MISSING_decision_id", Block, AllBehaviorDeclared;
    FramingInvalidDecisionIdFormat => "META_FRAMING_INVALID_decision_id_format", Block, ReproducibilityRequired;
    FramingMissingOperationalPurpose => "META_FRAMING_MISSING_operational_purpose", Block, NoAmbiguityPersists;
    FramingInvalidPurposeNonOperational => "META_FRAMING_INVALID_purpose_non_operational", Block, NoAmbiguityPersists;
    FramingMissingExecutionTrigger => "META_FRAMING_MISSING_execution_trigger", Block, AllBehaviorDeclared;
    FramingMissingExplicitAuthority => "META_FRAMING_MISSING_explicit_authority", Block, AuthorityNeverFlowsUpward;
    FramingMissingExplicitNonAuthority => "META_FRAMING_MISSING_explicit_non_authority", Block, AuthorityNeverFlowsUpward;
    FramingMissingRefusalConditions => "META_FRAMING_MISSING_refusal_conditions", Block, RefusalIsMandatory;
    FramingConflictAuthorityVsNonAuthority => "META_FRAMING_CONFLICT_authority_vs_non_authority", Block, NoAmbiguityPersists;

    // VERSIONING
    VersioningMissingContractVersion => "META_VERSIONING_MISSING_contract_version", Block, ReproducibilityRequired;
    VersioningInvalidVersionFormat => "META_VERSIONING_INVALID_version_format", Warn, ReproducibilityRequired;
    VersioningInvalidSupersedesReference => "META_VERSIONING_INVALID_supersedes_reference", Block, ReproducibilityRequired;
    VersioningInconsistentEffectiveDate => "META_VERSIONING_INCONSISTENT_effective_date", Warn, ReproducibilityRequired;

    // INPUTS
    InputsMissingInputs => "META_INPUTS_MISSING_inputs", Block, AllBehaviorDeclared;
    InputsMissingInputName => "META_INPUTS_MISSING_input_name", Block, AllBehaviorDeclared;
    InputsInvalidInputNameFormat => "META_INPUTS_INVALID_input_name_format", Block, ReproducibilityRequired;
    InputsMissingInputType => "META_INPUTS_MISSING_input_type", Block, AllBehaviorDeclared;
    InputsInvalidInputType => "META_INPUTS_INVALID_input_type", Block, AllBehaviorDeclared;
    InputsMissingInputSource => "META_INPUTS_MISSING_input_source", Block, AllBehaviorDeclared;
    InputsMissingTrustLevel => "META_INPUTS_MISSING_trust_level", Block, AllBehaviorDeclared;
    InputsInvalidTrustLevel => "META_INPUTS_INVALID_trust_level", Block, AllBehaviorDeclared;
    InputsMissingRequiredFlag => "META_INPUTS_MISSING_required_flag", Block, AllBehaviorDeclared;
    InputsMissingMissingInputBehavior => "META_INPUTS_MISSING_missing_input_behavior", Block, RefusalIsMandatory;
    InputsInvalidMissingInputBehavior => "META_INPUTS_INVALID_missing_input_behavior", Block, RefusalIsMandatory;
    InputsViolationImplicitInputDetected => "META_INPUTS_VIOLATION_implicit_input_detected", Block, OnlyDeclaredInputs;
    InputsConflictDuplicateInputName => "META_INPUTS_CONFLICT_duplicate_input_name", Block, NoAmbiguityPersists;

    // OUTPUTS
    OutputsMissingOutputSchema => "META_OUTPUTS_MISSING_output_schema", Block, OutputsAreFinite;
    OutputsInvalidOutputSchema => "META_OUTPUTS_INVALID_output_schema", Block, OutputsAreFinite;
    OutputsMissingAllowedOutputs => "META_OUTPUTS_MISSING_allowed_outputs", Block, OutputsAreFinite;
    OutputsInvalidAllowedOutputsEmpty => "META_OUTPUTS_INVALID_allowed_outputs_empty", Block, OutputsAreFinite;
    OutputsConflictDuplicateOutputValue => "META_OUTPUTS_CONFLICT_duplicate_output_value", Block, OutputsAreFinite;
    OutputsMissingRefusalOutput => "META_OUTPUTS_MISSING_refusal_output", Block, RefusalIsMandatory;
    OutputsInvalidRefusalOutputNotAllowed => "META_OUTPUTS_INVALID_refusal_output_not_allowed", Block, RefusalIsMandatory;
    OutputsMissingAuthorityLevel => "META_OUTPUTS_MISSING_authority_level", Block, AuthorityNeverFlowsUpward;
    OutputsInvalidAuthorityLevel => "META_OUTPUTS_INVALID_authority_level", Block, AuthorityNeverFlowsUpward;

    // POLICIES
    PoliciesMissingPolicies => "META_POLICIES_MISSING_policies", Block, AllBehaviorDeclared;
    PoliciesMissingPolicyStatement => "META_POLICIES_MISSING_policy_statement", Block, AllBehaviorDeclared;
    PoliciesInvalidPolicyUnbounded => "META_POLICIES_INVALID_policy_unbounded", Block, NoAmbiguityPersists;
    PoliciesViolationPolicyGeneratesOutcome => "META_POLICIES_VIOLATION_policy_generates_outcome", Block, AuthorityNeverFlowsUpward;
    PoliciesConflictPolicyConflict => "META_POLICIES_CONFLICT_policy_conflict", Block, NoAmbiguityPersists;
    PoliciesMissingPrecedence => "META_POLICIES_MISSING_precedence", Block, NoAmbiguityPersists;
    PoliciesInvalidPrecedenceCycle => "META_POLICIES_INVALID_precedence_cycle", Block, NoAmbiguityPersists;
    PoliciesViolationExceedsAuthorityEnvelope => "META_POLICIES_VIOLATION_exceeds_authority_envelope", Block, AuthorityNeverFlowsUpward;

    // RULES
    RulesMissingRules => "META_RULES_MISSING_rules", Block, AllBehaviorDeclared;
    RulesInvalidRuleExpression => "META_RULES_INVALID_rule_expression", Block, AllBehaviorDeclared;
    RulesViolationNondeterministicOperator => "META_RULES_VIOLATION_nondeterministic_operator", Block, DeterminismRequired;
    RulesViolationHiddenStateDependency => "META_RULES_VIOLATION_hidden_state_dependency", Block, DeterminismRequired;
    RulesViolationUndeclaredInputReference => "META_RULES_VIOLATION_undeclared_input_reference", Block, OnlyDeclaredInputs;
    RulesInvalidOutputNotAllowed => "META_RULES_INVALID_output_not_allowed", Block, OutputsAreFinite;
    RulesViolationNonTerminatingPath => "META_RULES_VIOLATION_non_terminating_path", Block, AllPathsTerminate;
    RulesIncompleteCoverageNotProven => "META_RULES_INCOMPLETE_coverage_not_proven", Block, AllPathsTerminate;
    RulesViolationMutatesInputs => "META_RULES_VIOLATION_mutates_inputs", Block, DeterminismRequired;

    // SIMULATION
    SimulationMissingValidCase => "META_SIMULATION_MISSING_valid_case", Block, AllBehaviorDeclared;
    SimulationMissingRefusalCase => "META_SIMULATION_MISSING_refusal_case", Block, RefusalIsMandatory;
    SimulationInvalidInputValues => "META_SIMULATION_INVALID_input_values", Block, OnlyDeclaredInputs;
    SimulationInvalidOutputMismatch => "META_SIMULATION_INVALID_output_mismatch", Block, DeterminismRequired;
    SimulationViolationNonReproducibleTrace => "META_SIMULATION_VIOLATION_non_reproducible_trace", Block, ReproducibilityRequired;
    SimulationInconsistentPolicyTrace => "META_SIMULATION_INCONSISTENT_policy_trace", Block, ReproducibilityRequired;
    SimulationIncompleteStagesNotReady => "META_SIMULATION_INCOMPLETE_stages_not_ready", Block, AllBehaviorDeclared;

    // FINALIZATION
    FinalizationMissingAcceptanceConfirmation => "META_FINALIZATION_MISSING_acceptance_confirmation", Block, AllBehaviorDeclared;
    FinalizationViolationContractHashMissing => "META_FINALIZATION_VIOLATION_contract_hash_missing", Reject, ReproducibilityRequired;
    FinalizationInvalidContractNotCanonical => "META_FINALIZATION_INVALID_contract_not_canonical", Block, ReproducibilityRequired;
    FinalizationRejectedInvariantsNotSatisfied => "META_FINALIZATION_REJECTED_invariants_not_satisfied", Reject, AllBehaviorDeclared;
    FinalizationIncompleteSimulationNotPassed => "META_FINALIZATION_INCOMPLETE_simulation_not_passed", Block, DeterminismRequired;
}

impl ReasonCode {
    /// The domain segment, e.g. `FRAMING` for `META_FRAMING_MISSING_decision_id`.
    pub fn domain(self) -> &'static str {
        self.as_str()
            .strip_prefix("META_")
            .and_then(|rest| rest.split('_').next())
            .unwrap_or("")
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReasonCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("Unknown reason code: {s}"))
    }
}

impl Serialize for ReasonCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReasonCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
