use super::fixtures::{self, CONTRACT_VERSION, META_CONTRACT_ID};
use super::{HarnessError, Scenario, ScenarioReport};
use ddrgate_core::{
    Decision, FinalizeDecision, Finding, ReasonCode, Session, Stage, StageState,
};
use ddrgate_engine::{
    DecisionEngine, canonicalize_value, to_download_bytes, verify_contract_hash,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::info;

fn ensure(
    scenario: Scenario,
    condition: bool,
    message: impl FnOnce() -> String,
) -> Result<(), HarnessError> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::Expectation {
            scenario,
            message: message(),
        })
    }
}

fn codes(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| f.code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn has_code(findings: &[Finding], code: ReasonCode) -> bool {
    findings.iter().any(|f| f.code == code)
}

fn canonical_bytes(value: &Value) -> Result<Vec<u8>, HarnessError> {
    Ok(canonicalize_value(value)?.into_bytes())
}

/// Submit every stage in order and transition past each one.
fn submit_all(
    scenario: Scenario,
    engine: &DecisionEngine,
    mut session: Session,
    stages: Vec<(Stage, Value)>,
) -> Result<Session, HarnessError> {
    let now = fixtures::now();
    for (stage, artifact) in stages {
        let evaluated = engine.evaluate_stage(&session, stage, artifact, now);
        ensure(scenario, evaluated.decision != Decision::Reject, || {
            format!("{stage} rejected: {}", codes(&evaluated.findings))
        })?;
        info!(
            scenario = %scenario,
            stage = %stage,
            decision = evaluated.decision.as_str(),
            state = %evaluated.stage_state,
            "Stage submitted"
        );
        session = evaluated.updated_session;

        if let Some(next) = stage.next() {
            let moved = engine.request_transition(&session, stage, next, now);
            ensure(scenario, moved.decision == Decision::Allow, || {
                format!(
                    "transition {stage} -> {next} blocked: {}",
                    codes(&moved.findings)
                )
            })?;
            session = moved.updated_session;
        }
    }
    Ok(session)
}

fn new_session(scenario: Scenario) -> Session {
    Session::new(scenario.session_id(), META_CONTRACT_ID, fixtures::now())
}

pub(super) fn happy_path(engine: &DecisionEngine) -> Result<ScenarioReport, HarnessError> {
    let scenario = Scenario::HappyPath;
    let now = fixtures::now();

    let session = submit_all(
        scenario,
        engine,
        new_session(scenario),
        fixtures::stages_with_rules(fixtures::rules()),
    )?;

    let simulation = engine.run_simulation(&session, &fixtures::happy_path_cases(), now);
    ensure(scenario, simulation.decision == Decision::Allow, || {
        format!("simulation not allowed: {}", codes(&simulation.findings))
    })?;
    ensure(
        scenario,
        simulation
            .case_results
            .iter()
            .all(|r| r.assertion_passed == Some(true)),
        || "every asserted case must pass".into(),
    )?;

    let finalized = engine.finalize(
        &simulation.updated_session,
        true,
        Some(CONTRACT_VERSION),
        now,
    );
    ensure(
        scenario,
        finalized.decision == FinalizeDecision::Accepted,
        || {
            format!(
                "finalization {}: {}",
                finalized.decision.as_str(),
                codes(&finalized.findings)
            )
        },
    )?;
    let contract = finalized
        .contract_artifact
        .ok_or_else(|| HarnessError::Expectation {
            scenario,
            message: "accepted finalization produced no contract".into(),
        })?;
    ensure(
        scenario,
        verify_contract_hash(&contract.canonical_json, &contract.hash).valid,
        || "contract hash does not verify".into(),
    )?;

    let session = finalized.updated_session;
    let stages_ready: Vec<Stage> = session
        .stage_states
        .iter()
        .filter(|(_, state)| **state == StageState::Ready)
        .map(|(stage, _)| *stage)
        .collect();
    let download = to_download_bytes(&contract)?;

    let mut outputs = BTreeMap::new();
    outputs.insert(
        "contract.json".to_string(),
        canonical_bytes(&contract.canonical_json)?,
    );
    outputs.insert("contract.hash".to_string(), contract.hash.clone().into_bytes());
    outputs.insert(
        "trace.json".to_string(),
        canonical_bytes(&json!({
            "case_results": simulation.case_results,
            "findings": simulation.findings,
        }))?,
    );
    outputs.insert(
        "metadata.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "timestamp": now,
            "session_id": session.intake_session_id,
            "contract_id": contract.contract_id,
            "contract_hash": contract.hash,
            "terminal_status": session.terminal_status,
            "stages_ready": stages_ready,
        }))?,
    );
    outputs.insert(download.filename, download.bytes);

    info!(scenario = %scenario, contract_id = %contract.contract_id, hash = %contract.hash, "Contract accepted");
    Ok(ScenarioReport {
        scenario,
        contract_id: Some(contract.contract_id),
        contract_hash: Some(contract.hash),
        outputs,
    })
}

pub(super) fn refusal_path(engine: &DecisionEngine) -> Result<ScenarioReport, HarnessError> {
    let scenario = Scenario::RefusalPath;
    let now = fixtures::now();

    let session = submit_all(
        scenario,
        engine,
        new_session(scenario),
        fixtures::stages_with_rules(fixtures::rules()),
    )?;

    let blocked = engine.run_simulation(&session, &fixtures::refusal_path_cases_incomplete(), now);
    ensure(
        scenario,
        has_code(&blocked.findings, ReasonCode::SimulationMissingRefusalCase),
        || {
            format!(
                "expected {} finding, got: {}",
                ReasonCode::SimulationMissingRefusalCase.as_str(),
                codes(&blocked.findings)
            )
        },
    )?;
    ensure(
        scenario,
        blocked
            .updated_session
            .stage_state(Stage::SimulationFinalization)
            != StageState::Ready,
        || "SIMULATION_FINALIZATION must not be READY after a blocked simulation".into(),
    )?;

    let corrected =
        engine.run_simulation(&session, &fixtures::refusal_path_cases_corrected(), now);
    ensure(scenario, corrected.decision == Decision::Allow, || {
        format!("corrected simulation not allowed: {}", codes(&corrected.findings))
    })?;

    let finalized = engine.finalize(
        &corrected.updated_session,
        true,
        Some(CONTRACT_VERSION),
        now,
    );
    let contract = finalized
        .contract_artifact
        .filter(|_| finalized.decision == FinalizeDecision::Accepted)
        .ok_or_else(|| HarnessError::Expectation {
            scenario,
            message: format!(
                "finalization {}: {}",
                finalized.decision.as_str(),
                codes(&finalized.findings)
            ),
        })?;

    let mut outputs = BTreeMap::new();
    outputs.insert(
        "findings.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "blocked_simulation": {
                "decision": blocked.decision,
                "findings": blocked.findings,
            },
            "corrected_simulation": {
                "decision": corrected.decision,
                "findings": corrected.findings,
                "case_results": corrected.case_results,
            },
        }))?,
    );
    outputs.insert(
        "metadata.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "timestamp": now,
            "governance_enforced": true,
            "blocked_reason": ReasonCode::SimulationMissingRefusalCase.as_str(),
            "final_status": finalized.updated_session.terminal_status,
            "contract_id": contract.contract_id,
            "contract_hash": contract.hash,
        }))?,
    );

    Ok(ScenarioReport {
        scenario,
        contract_id: Some(contract.contract_id),
        contract_hash: Some(contract.hash),
        outputs,
    })
}

pub(super) fn blocked_path(engine: &DecisionEngine) -> Result<ScenarioReport, HarnessError> {
    let scenario = Scenario::BlockedPath;
    let now = fixtures::now();
    let session = new_session(scenario);

    let mut invalid = fixtures::framing();
    invalid["decision_purpose"] = json!("");
    let rejected = engine.evaluate_stage(&session, Stage::Framing, invalid, now);
    ensure(scenario, !rejected.findings.is_empty(), || {
        "invalid FRAMING produced no findings".into()
    })?;
    ensure(scenario, rejected.stage_state == StageState::Blocked, || {
        format!("expected FRAMING BLOCKED, got {}", rejected.stage_state)
    })?;
    let session = rejected.updated_session.clone();

    let refused = engine.request_transition(&session, Stage::Framing, Stage::Inputs, now);
    ensure(scenario, refused.decision != Decision::Allow, || {
        "transition allowed while FRAMING is BLOCKED".into()
    })?;

    let corrected = engine.evaluate_stage(&session, Stage::Framing, fixtures::framing(), now);
    ensure(scenario, corrected.stage_state == StageState::Ready, || {
        format!("expected FRAMING READY, got {}", corrected.stage_state)
    })?;

    let moved = engine.request_transition(
        &corrected.updated_session,
        Stage::Framing,
        Stage::Inputs,
        now,
    );
    ensure(scenario, moved.decision == Decision::Allow, || {
        format!("transition after correction blocked: {}", codes(&moved.findings))
    })?;
    let final_stage = moved.updated_session.stage;

    let blocked_reason = rejected
        .findings
        .first()
        .map(|f| f.code.as_str())
        .unwrap_or("unknown");

    let mut outputs = BTreeMap::new();
    outputs.insert(
        "findings.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "blocked_submission": {
                "decision": rejected.decision,
                "findings": rejected.findings,
                "stage_state": rejected.stage_state,
            },
            "blocked_transition": {
                "decision": refused.decision,
                "findings": refused.findings,
            },
            "corrected_submission": {
                "decision": corrected.decision,
                "findings": corrected.findings,
                "stage_state": corrected.stage_state,
            },
            "successful_transition": {
                "decision": moved.decision,
                "new_stage": final_stage,
            },
        }))?,
    );
    outputs.insert(
        "metadata.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "timestamp": now,
            "stage_gating_enforced": true,
            "blocked_reason": blocked_reason,
            "final_stage": final_stage,
        }))?,
    );

    Ok(ScenarioReport {
        scenario,
        contract_id: None,
        contract_hash: None,
        outputs,
    })
}

pub(super) fn refusal_only(engine: &DecisionEngine) -> Result<ScenarioReport, HarnessError> {
    let scenario = Scenario::RefusalOnly;
    let now = fixtures::now();

    let session = submit_all(
        scenario,
        engine,
        new_session(scenario),
        fixtures::stages_with_rules(fixtures::refusal_only_rules()),
    )?;

    let simulation = engine.run_simulation(&session, &fixtures::refusal_only_cases(), now);
    ensure(
        scenario,
        has_code(&simulation.findings, ReasonCode::SimulationMissingValidCase),
        || {
            format!(
                "expected {} finding, got: {}",
                ReasonCode::SimulationMissingValidCase.as_str(),
                codes(&simulation.findings)
            )
        },
    )?;
    for result in &simulation.case_results {
        ensure(scenario, result.trace.refusal, || {
            format!("case {} must refuse", result.case_id)
        })?;
    }

    let finalized = engine.finalize(
        &simulation.updated_session,
        true,
        Some(CONTRACT_VERSION),
        now,
    );
    ensure(
        scenario,
        finalized.decision != FinalizeDecision::Accepted,
        || "a refusal-only system must never be accepted".into(),
    )?;
    ensure(scenario, finalized.contract_artifact.is_none(), || {
        "no contract artifact may be produced".into()
    })?;

    let mut outputs = BTreeMap::new();
    outputs.insert(
        "trace.json".to_string(),
        canonical_bytes(&json!({
            "case_results": simulation.case_results,
            "findings": simulation.findings,
        }))?,
    );
    outputs.insert(
        "metadata.json".to_string(),
        canonical_bytes(&json!({
            "scenario": scenario.as_str(),
            "timestamp": now,
            "session_id": session.intake_session_id,
            "terminal_status": finalized.updated_session.terminal_status,
            "simulation_decision": simulation.decision,
            "finalization_decision": finalized.decision,
            "contract_produced": false,
            "blocked_reason": ReasonCode::SimulationMissingValidCase.as_str(),
        }))?,
    );

    Ok(ScenarioReport {
        scenario,
        contract_id: None,
        contract_hash: None,
        outputs,
    })
}
