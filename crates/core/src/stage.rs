//! The six intake stages and their per-stage readiness state.
//!
//! Stages form a strict linear order. A session walks them one at a time,
//! and only the final stage (`SIMULATION_FINALIZATION`) is driven by the
//! simulation runner rather than by direct artifact submission.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six ordered intake stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Framing,
    Inputs,
    Outputs,
    Policies,
    Rules,
    SimulationFinalization,
}

impl Stage {
    /// Every stage, in progression order.
    pub const ALL: [Stage; 6] = [
        Stage::Framing,
        Stage::Inputs,
        Stage::Outputs,
        Stage::Policies,
        Stage::Rules,
        Stage::SimulationFinalization,
    ];

    /// Zero-based position in the progression order.
    pub fn position(self) -> usize {
        match self {
            Stage::Framing => 0,
            Stage::Inputs => 1,
            Stage::Outputs => 2,
            Stage::Policies => 3,
            Stage::Rules => 4,
            Stage::SimulationFinalization => 5,
        }
    }

    /// The stage immediately after this one, if any.
    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.position() + 1).copied()
    }

    /// Whether the stage accepts direct artifact submission.
    pub fn is_submittable(self) -> bool {
        self != Stage::SimulationFinalization
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Framing => "FRAMING",
            Stage::Inputs => "INPUTS",
            Stage::Outputs => "OUTPUTS",
            Stage::Policies => "POLICIES",
            Stage::Rules => "RULES",
            Stage::SimulationFinalization => "SIMULATION_FINALIZATION",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown stage: {s}"))
    }
}

/// Readiness state of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageState {
    #[default]
    Incomplete,
    UnderReview,
    Blocked,
    Ready,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            StageState::Incomplete => "INCOMPLETE",
            StageState::UnderReview => "UNDER_REVIEW",
            StageState::Blocked => "BLOCKED",
            StageState::Ready => "READY",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
