//! Decision Engine: stage-gated authoring of deterministic decision contracts.
//!
//! A session moves through six stages. Each content stage is validated on
//! submission, simulation proves the rules behave as declared, and
//! finalization freezes everything into a hash-addressed contract.
//!
//! # Architecture
//!
//! ```text
//! FRAMING ─▶ INPUTS ─▶ OUTPUTS ─▶ POLICIES ─▶ RULES ─▶ SIMULATION_FINALIZATION
//!    │          │         │           │          │               │
//!    └──────────┴── validators ───────┴──────────┘       simulation + finalize
//!                        │                                        │
//!                  ┌─────┴─────┐                          ┌───────┴────────┐
//!                  │ Findings  │                          │ sha256 contract │
//!                  │ READY     │                          │ canonical JSON  │
//!                  │ BLOCKED   │                          └────────────────┘
//!                  └───────────┘
//! ```
//!
//! # Example rule
//!
//! ```json
//! {
//!   "rule_id": "adult_access_rule",
//!   "when": "{\"all\":[{\"var\":\"user_age\",\"op\":\">=\",\"value\":18}]}",
//!   "then": "ALLOW"
//! }
//! ```
//!
//! Every operation is a pure function of its arguments: the caller supplies
//! the session snapshot and the clock reading, and persists the returned
//! snapshot.

mod engine;
pub mod expression;
pub mod finalization;
pub mod simulation;
pub mod transitions;
pub mod validators;

pub use engine::{DEFAULT_CONTRACT_VERSION, DecisionEngine};
pub use expression::{Comparison, Condition, Op, parse_condition};
pub use finalization::{
    CONTENT_TYPE, CanonicalInput, ContractDownload, FILE_EXTENSION, GenerationError,
    HashVerification, canonicalize, canonicalize_value, compute_hash, generate_contract,
    to_download_bytes, verify_contract_hash,
};
pub use simulation::{SimulationRun, run_cases};
