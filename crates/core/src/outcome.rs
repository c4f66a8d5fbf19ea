//! Result records returned by the engine facade.
//!
//! Every facade call returns one of these; governance failures are data,
//! never errors.

use crate::finding::Finding;
use crate::session::{Session, SessionStatus};
use crate::simulation::{ContractArtifact, SimulationCaseResult};
use crate::stage::{Stage, StageState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decision for evaluate / transition / simulate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Block,
    Reject,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Block => "BLOCK",
            Decision::Reject => "REJECT",
        }
    }
}

/// Decision for finalize calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalizeDecision {
    Accepted,
    Block,
    Reject,
}

impl FinalizeDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalizeDecision::Accepted => "ACCEPTED",
            FinalizeDecision::Block => "BLOCK",
            FinalizeDecision::Reject => "REJECT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub decision: Decision,
    pub status: SessionStatus,
    pub stage: Stage,
    pub stage_state: StageState,
    pub findings: Vec<Finding>,
    pub updated_session: Session,
    pub can_proceed: bool,
    pub next_stage: Option<Stage>,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResult {
    pub decision: Decision,
    pub findings: Vec<Finding>,
    pub updated_session: Session,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub decision: Decision,
    pub findings: Vec<Finding>,
    pub case_results: Vec<SimulationCaseResult>,
    pub updated_session: Session,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResult {
    pub decision: FinalizeDecision,
    pub findings: Vec<Finding>,
    pub contract_artifact: Option<ContractArtifact>,
    pub updated_session: Session,
    pub server_time: DateTime<Utc>,
}
