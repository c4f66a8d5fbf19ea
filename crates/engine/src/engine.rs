//! The decision engine facade.
//!
//! Four operations drive a session from FRAMING to a finalized contract.
//! Each takes a session snapshot and returns a result carrying the next
//! snapshot; the input session is never modified. Governance failures are
//! reported as findings on the result, never as errors.

use crate::finalization::{GenerationError, REQUIRED_STAGES, generate_contract};
use crate::simulation::run_cases;
use crate::transitions::{can_submit_to_stage, is_valid_transition, next_stage};
use crate::validators::{determine_stage_state, validate_stage};
use chrono::{DateTime, Utc};
use ddrgate_core::finding::{
    contract_hash_missing, contract_not_canonical, inconsistent_stage_state,
    missing_acceptance_confirmation, session_already_finalized,
    simulation_not_passed, simulation_stage_not_submittable, stage_not_ready,
};
use ddrgate_core::{
    Decision, EvaluationResult, FinalizeDecision, FinalizeResult, Finding, Session,
    SimulationCase, SimulationResult, Stage, StageState, TerminalStatus, TransitionResult,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Version stamped on contracts when neither the caller nor FRAMING names one.
pub const DEFAULT_CONTRACT_VERSION: &str = "1.0.0";

/// Stateless facade over validation, simulation and finalization.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    default_version: String,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT_VERSION)
    }
}

impl DecisionEngine {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
        }
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Validate and store an artifact for `stage`. Never moves the stage pointer.
    pub fn evaluate_stage(
        &self,
        session: &Session,
        stage: Stage,
        artifact: Value,
        now: DateTime<Utc>,
    ) -> EvaluationResult {
        let guard = if session.is_terminal() {
            Some(session_already_finalized())
        } else if !stage.is_submittable() {
            Some(simulation_stage_not_submittable())
        } else if !can_submit_to_stage(session, stage) {
            Some(inconsistent_stage_state(format!(
                "Cannot submit to stage {stage} before reaching it."
            )))
        } else {
            None
        };

        if let Some(finding) = guard {
            warn!(
                session = %session.intake_session_id,
                stage = %stage,
                code = %finding.code,
                "Stage submission rejected"
            );
            return EvaluationResult {
                decision: Decision::Reject,
                status: session.status(),
                stage,
                stage_state: session.stage_state(stage),
                findings: vec![finding],
                updated_session: session.clone(),
                can_proceed: false,
                next_stage: None,
                server_time: now,
            };
        }

        let findings = validate_stage(stage, &artifact, session);
        let stage_state = determine_stage_state(&findings);
        let updated_session = session.with_submission(stage, artifact, stage_state);
        let ready = stage_state == StageState::Ready;

        debug!(
            session = %session.intake_session_id,
            stage = %stage,
            state = %stage_state,
            findings = findings.len(),
            revision = updated_session.revision,
            "Stage evaluated"
        );

        EvaluationResult {
            decision: if findings.is_empty() {
                Decision::Allow
            } else {
                Decision::Block
            },
            status: updated_session.status(),
            stage,
            stage_state,
            findings,
            can_proceed: ready,
            next_stage: if ready { next_stage(stage) } else { None },
            updated_session,
            server_time: now,
        }
    }

    /// Advance the stage pointer from `from` to `to`.
    pub fn request_transition(
        &self,
        session: &Session,
        from: Stage,
        to: Stage,
        now: DateTime<Utc>,
    ) -> TransitionResult {
        let refusal = if session.is_terminal() {
            Some((Decision::Reject, session_already_finalized()))
        } else if session.stage != from {
            Some((
                Decision::Reject,
                inconsistent_stage_state(format!(
                    "Current stage is {}, not {from}.",
                    session.stage
                )),
            ))
        } else if !is_valid_transition(from, to) {
            Some((
                Decision::Reject,
                inconsistent_stage_state(format!("Invalid transition from {from} to {to}.")),
            ))
        } else if session.stage_state(from) != StageState::Ready {
            Some((Decision::Block, stage_not_ready(from)))
        } else {
            None
        };

        if let Some((decision, finding)) = refusal {
            if decision == Decision::Reject {
                warn!(session = %session.intake_session_id, %from, %to, code = %finding.code, "Transition rejected");
            } else {
                debug!(session = %session.intake_session_id, %from, %to, "Transition blocked");
            }
            return TransitionResult {
                decision,
                findings: vec![finding],
                updated_session: session.clone(),
                server_time: now,
            };
        }

        info!(session = %session.intake_session_id, %from, %to, "Stage advanced");
        TransitionResult {
            decision: Decision::Allow,
            findings: Vec::new(),
            updated_session: session.with_stage(to),
            server_time: now,
        }
    }

    /// Run simulation cases and record the outcome on SIMULATION_FINALIZATION.
    ///
    /// Sessions whose prior stages are not all READY are returned unchanged.
    pub fn run_simulation(
        &self,
        session: &Session,
        cases: &[SimulationCase],
        now: DateTime<Utc>,
    ) -> SimulationResult {
        if session.is_terminal() {
            warn!(session = %session.intake_session_id, "Simulation rejected on terminal session");
            return SimulationResult {
                decision: Decision::Reject,
                findings: vec![session_already_finalized()],
                case_results: Vec::new(),
                updated_session: session.clone(),
                server_time: now,
            };
        }

        let not_ready = unready_stages(session);
        if !not_ready.is_empty() {
            debug!(
                session = %session.intake_session_id,
                not_ready = not_ready.len(),
                "Simulation blocked by prior stages"
            );
            return SimulationResult {
                decision: Decision::Block,
                findings: not_ready.into_iter().map(stage_not_ready).collect(),
                case_results: Vec::new(),
                updated_session: session.clone(),
                server_time: now,
            };
        }

        let run = run_cases(session, cases);
        let mut updated_session = session.with_stage_state(Stage::SimulationFinalization, run.stage_state);
        updated_session.stage = Stage::SimulationFinalization;

        info!(
            session = %session.intake_session_id,
            cases = cases.len(),
            state = %run.stage_state,
            findings = run.findings.len(),
            "Simulation completed"
        );

        SimulationResult {
            decision: if run.stage_state == StageState::Ready {
                Decision::Allow
            } else {
                Decision::Block
            },
            findings: run.findings,
            case_results: run.case_results,
            updated_session,
            server_time: now,
        }
    }

    /// Produce the immutable contract and close the session.
    ///
    /// The version is `requested_version`, else FRAMING's `contract_version`,
    /// else the engine default.
    pub fn finalize(
        &self,
        session: &Session,
        acceptance_confirmed: bool,
        requested_version: Option<&str>,
        now: DateTime<Utc>,
    ) -> FinalizeResult {
        if session.is_terminal() {
            warn!(session = %session.intake_session_id, "Finalize rejected on terminal session");
            return refused(session, FinalizeDecision::Reject, vec![session_already_finalized()], now);
        }

        if !acceptance_confirmed {
            debug!(session = %session.intake_session_id, "Finalize blocked: acceptance not confirmed");
            return refused(
                session,
                FinalizeDecision::Block,
                vec![missing_acceptance_confirmation()],
                now,
            );
        }

        let mut findings: Vec<Finding> = unready_stages(session)
            .into_iter()
            .map(stage_not_ready)
            .collect();
        if session.stage_state(Stage::SimulationFinalization) != StageState::Ready {
            findings.push(simulation_not_passed());
        }
        if !findings.is_empty() {
            debug!(
                session = %session.intake_session_id,
                findings = findings.len(),
                "Finalize blocked"
            );
            return refused(session, FinalizeDecision::Block, findings, now);
        }

        let version = self.resolve_version(session, requested_version);
        match generate_contract(session, &version, now) {
            Ok(artifact) => {
                info!(
                    session = %session.intake_session_id,
                    contract = %artifact.contract_id,
                    hash = %artifact.hash,
                    "Contract finalized"
                );
                FinalizeResult {
                    decision: FinalizeDecision::Accepted,
                    findings: Vec::new(),
                    contract_artifact: Some(artifact),
                    updated_session: session.with_terminal_status(TerminalStatus::Accepted),
                    server_time: now,
                }
            }
            Err(GenerationError::NotCanonical(e)) => {
                debug!(session = %session.intake_session_id, error = %e, "Contract not canonical");
                refused(session, FinalizeDecision::Block, vec![contract_not_canonical(e)], now)
            }
            Err(e) => {
                // Missing artifacts and hash failures both mean no trustworthy hash exists.
                let finding = contract_hash_missing(&e);
                warn!(session = %session.intake_session_id, error = %e, "Finalize rejected");
                FinalizeResult {
                    decision: FinalizeDecision::Reject,
                    findings: vec![finding],
                    contract_artifact: None,
                    updated_session: session.with_terminal_status(TerminalStatus::Rejected),
                    server_time: now,
                }
            }
        }
    }

    fn resolve_version(&self, session: &Session, requested: Option<&str>) -> String {
        let framing_version = session
            .artifact(Stage::Framing)
            .and_then(|framing| framing.get("contract_version"))
            .and_then(Value::as_str);

        [requested, framing_version]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
            .unwrap_or(self.default_version.as_str())
            .to_string()
    }
}

/// Content stages that are not READY, in stage order.
fn unready_stages(session: &Session) -> Vec<Stage> {
    REQUIRED_STAGES
        .into_iter()
        .filter(|stage| session.stage_state(*stage) != StageState::Ready)
        .collect()
}

fn refused(
    session: &Session,
    decision: FinalizeDecision,
    findings: Vec<Finding>,
    now: DateTime<Utc>,
) -> FinalizeResult {
    FinalizeResult {
        decision,
        findings,
        contract_artifact: None,
        updated_session: session.clone(),
        server_time: now,
    }
}
