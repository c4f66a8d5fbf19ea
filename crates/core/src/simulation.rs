//! Simulation cases, their results, and the finalized contract artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single test case run against a candidate contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationCase {
    pub case_id: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    /// `None` marks an exploratory case with no assertion.
    #[serde(default)]
    pub expected_output: Option<String>,
}

impl SimulationCase {
    pub fn expecting(
        case_id: impl Into<String>,
        inputs: BTreeMap<String, Value>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            inputs,
            expected_output: Some(expected_output.into()),
        }
    }

    pub fn exploratory(case_id: impl Into<String>, inputs: BTreeMap<String, Value>) -> Self {
        Self {
            case_id: case_id.into(),
            inputs,
            expected_output: None,
        }
    }
}

/// Evaluation trace for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub contract_version: String,
    /// Policy ids in precedence order.
    pub policy_checks: Vec<String>,
    /// Rule ids on the path that produced the output.
    pub rule_path: Vec<String>,
    pub refusal: bool,
    /// The first rule whose condition held; `None` when no rule fired.
    #[serde(default)]
    pub matched_rule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationCaseResult {
    pub case_id: String,
    pub output: String,
    pub trace: Trace,
    /// `None` for exploratory cases.
    pub assertion_passed: Option<bool>,
}

/// The immutable, hash-addressed record produced by finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    /// `<decision_id>@<version>`.
    pub contract_id: String,
    pub version: String,
    /// `sha256:` followed by 64 lowercase hex characters.
    pub hash: String,
    /// The canonicalized record, as parsed JSON.
    pub canonical_json: Value,
}
