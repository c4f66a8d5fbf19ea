//! # ddrgate Core
//!
//! Domain types for the ddrgate decision contract engine: the six-stage
//! intake model, session snapshots, the frozen reason-code catalogue,
//! findings, stage artifacts, simulation records and facade results.
//!
//! This crate has **no engine logic**. It defines the vocabulary the
//! engine, registry and gateway crates speak.

pub mod artifacts;
pub mod error;
pub mod finding;
pub mod outcome;
pub mod reason_code;
pub mod session;
pub mod simulation;
pub mod stage;

// Re-export key types at crate root for ergonomics
pub use artifacts::InputType;
pub use error::{CanonicalError, Error, Result};
pub use finding::{Finding, Invariant, Severity, next_action};
pub use outcome::{
    Decision, EvaluationResult, FinalizeDecision, FinalizeResult, SimulationResult,
    TransitionResult,
};
pub use reason_code::ReasonCode;
pub use session::{Session, SessionStatus, TerminalStatus};
pub use simulation::{ContractArtifact, SimulationCase, SimulationCaseResult, Trace};
pub use stage::{Stage, StageState};
