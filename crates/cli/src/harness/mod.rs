//! Scenario harness: end-to-end runs of the engine against frozen fixtures.
//!
//! Each scenario drives the four facade operations (evaluate, transition,
//! simulate, finalize) at a fixed timestamp and asserts the expected
//! decisions and reason codes. Every scenario is run twice and the two
//! runs must produce byte-identical outputs; those outputs are then
//! checked against (or recorded as) golden files.

pub mod fixtures;
mod golden;
mod scenarios;

pub use golden::{GoldenStatus, GoldenStore};

use ddrgate_core::CanonicalError;
use ddrgate_engine::DecisionEngine;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Scenario {
    /// Complete successful flow ending in an accepted contract
    HappyPath,
    /// Simulation without a refusal case is blocked, then corrected
    RefusalPath,
    /// Invalid FRAMING blocks the transition until corrected
    BlockedPath,
    /// A system that only refuses can never be finalized
    RefusalOnly,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::HappyPath,
        Scenario::RefusalPath,
        Scenario::BlockedPath,
        Scenario::RefusalOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::HappyPath => "happy-path",
            Scenario::RefusalPath => "refusal-path",
            Scenario::BlockedPath => "blocked-path",
            Scenario::RefusalOnly => "refusal-only",
        }
    }

    /// Session id used for the scenario's intake session.
    pub fn session_id(self) -> String {
        format!("harness-{}", self.as_str())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{scenario}: {message}")]
    Expectation { scenario: Scenario, message: String },

    #[error("{scenario}: output {file} differs between identical runs")]
    NonDeterministic { scenario: Scenario, file: String },

    #[error("golden file {} does not match this run", path.display())]
    GoldenMismatch { path: PathBuf },

    #[error("golden file I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// Outputs of a single scenario pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub contract_id: Option<String>,
    pub contract_hash: Option<String>,
    /// Golden file name to canonical bytes.
    pub outputs: BTreeMap<String, Vec<u8>>,
}

/// A verified scenario: deterministic across two passes and in line with the golden files.
#[derive(Debug, Clone)]
pub struct HarnessRun {
    pub report: ScenarioReport,
    pub golden: BTreeMap<String, GoldenStatus>,
}

/// Run one pass of `scenario`.
pub fn run_scenario(
    scenario: Scenario,
    engine: &DecisionEngine,
) -> Result<ScenarioReport, HarnessError> {
    match scenario {
        Scenario::HappyPath => scenarios::happy_path(engine),
        Scenario::RefusalPath => scenarios::refusal_path(engine),
        Scenario::BlockedPath => scenarios::blocked_path(engine),
        Scenario::RefusalOnly => scenarios::refusal_only(engine),
    }
}

/// Run `scenario` twice, require identical outputs, then sync golden files.
pub fn run(scenario: Scenario, store: &GoldenStore) -> Result<HarnessRun, HarnessError> {
    let engine = DecisionEngine::new(fixtures::CONTRACT_VERSION);

    let first = run_scenario(scenario, &engine)?;
    let second = run_scenario(scenario, &engine)?;
    assert_identical(&first, &second)?;
    info!(scenario = %scenario, outputs = first.outputs.len(), "Determinism verified");

    let golden = store.sync(scenario, &first.outputs)?;
    Ok(HarnessRun {
        report: first,
        golden,
    })
}

fn assert_identical(first: &ScenarioReport, second: &ScenarioReport) -> Result<(), HarnessError> {
    let names = first.outputs.keys().chain(second.outputs.keys());
    for name in names {
        if first.outputs.get(name) != second.outputs.get(name) {
            return Err(HarnessError::NonDeterministic {
                scenario: first.scenario,
                file: name.clone(),
            });
        }
    }
    if first.contract_hash != second.contract_hash {
        return Err(HarnessError::NonDeterministic {
            scenario: first.scenario,
            file: "contract hash".into(),
        });
    }
    Ok(())
}
