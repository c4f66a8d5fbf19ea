//! Simulation: run declared cases through the candidate contract.
//!
//! Rules are evaluated in declared order and the first match wins. Cases with
//! invalid inputs fail closed to the refusal output without evaluating rules.

pub mod assertions;
mod runner;

pub use runner::{SimulationRun, run_cases};
