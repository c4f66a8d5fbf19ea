//! The intake session: an immutable snapshot of one contract-authoring run.
//!
//! Sessions are never mutated in place. Every engine operation takes a
//! session by reference and hands back a new one with a bumped revision.

use crate::stage::{Stage, StageState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Final outcome of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    Accepted,
    Rejected,
}

/// Overall status derived from a session snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Blocked,
    Accepted,
    Rejected,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Blocked => "BLOCKED",
            SessionStatus::Accepted => "ACCEPTED",
            SessionStatus::Rejected => "REJECTED",
        })
    }
}

/// One intake session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub intake_session_id: String,
    pub meta_contract_id: String,
    /// Current stage pointer.
    pub stage: Stage,
    pub stage_states: BTreeMap<Stage, StageState>,
    /// Latest submitted artifact per stage, stored verbatim.
    pub artifacts: BTreeMap<Stage, Option<Value>>,
    /// Strictly increases with every accepted change.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub terminal_status: Option<TerminalStatus>,
}

impl Session {
    /// A fresh session at FRAMING, every stage INCOMPLETE, revision 0.
    pub fn new(
        intake_session_id: impl Into<String>,
        meta_contract_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            intake_session_id: intake_session_id.into(),
            meta_contract_id: meta_contract_id.into(),
            stage: Stage::Framing,
            stage_states: Stage::ALL
                .into_iter()
                .map(|stage| (stage, StageState::Incomplete))
                .collect(),
            artifacts: Stage::ALL.into_iter().map(|stage| (stage, None)).collect(),
            revision: 0,
            created_at,
            expires_at: None,
            terminal_status: None,
        }
    }

    /// State of a stage; stages absent from the map count as INCOMPLETE.
    pub fn stage_state(&self, stage: Stage) -> StageState {
        self.stage_states.get(&stage).copied().unwrap_or_default()
    }

    /// The artifact last submitted to a stage, if any.
    pub fn artifact(&self, stage: Stage) -> Option<&Value> {
        self.artifacts.get(&stage).and_then(Option::as_ref)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_status.is_some()
    }

    /// Only non-terminal sessions accept changes.
    pub fn is_mutable(&self) -> bool {
        !self.is_terminal()
    }

    /// Terminal status wins; otherwise any BLOCKED stage makes the session BLOCKED.
    pub fn status(&self) -> SessionStatus {
        match self.terminal_status {
            Some(TerminalStatus::Accepted) => SessionStatus::Accepted,
            Some(TerminalStatus::Rejected) => SessionStatus::Rejected,
            None if self
                .stage_states
                .values()
                .any(|state| *state == StageState::Blocked) =>
            {
                SessionStatus::Blocked
            }
            None => SessionStatus::InProgress,
        }
    }

    // ── Copy-on-write updates ─────────────────────────────────────────────

    /// New snapshot with the artifact stored, the stage state set and the revision bumped.
    pub fn with_submission(&self, stage: Stage, artifact: Value, state: StageState) -> Self {
        let mut next = self.clone();
        next.artifacts.insert(stage, Some(artifact));
        next.stage_states.insert(stage, state);
        next.revision += 1;
        next
    }

    pub fn with_stage(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.stage = stage;
        next.revision += 1;
        next
    }

    pub fn with_stage_state(&self, stage: Stage, state: StageState) -> Self {
        let mut next = self.clone();
        next.stage_states.insert(stage, state);
        next.revision += 1;
        next
    }

    pub fn with_terminal_status(&self, status: TerminalStatus) -> Self {
        let mut next = self.clone();
        next.terminal_status = Some(status);
        next.revision += 1;
        next
    }
}
