//! Per-stage validators.
//!
//! Each validator is a pure function from a raw artifact (and, for POLICIES and RULES,
//! the session's other artifacts) to a list of findings. Validation is
//! exhaustive: every rule is checked and every violation reported. The one
//! exception is an absent or non-record artifact, which yields a single
//! generic "missing" finding.

mod framing;
mod inputs;
mod outputs;
mod policies;
mod rules;

pub use framing::validate_framing;
pub use inputs::validate_inputs;
pub use outputs::validate_outputs;
pub use policies::validate_policies;
pub use rules::validate_rules;

use ddrgate_core::finding::has_blocking;
use ddrgate_core::{Finding, Session, Stage, StageState};
use regex_lite::Regex;
use serde_json::{Map, Value};

/// Dispatch to the validator for `stage`.
///
/// SIMULATION_FINALIZATION is driven by the simulation runner and has no
/// direct validator.
pub fn validate_stage(stage: Stage, artifact: &Value, session: &Session) -> Vec<Finding> {
    match stage {
        Stage::Framing => validate_framing(artifact),
        Stage::Inputs => validate_inputs(artifact),
        Stage::Outputs => validate_outputs(artifact),
        Stage::Policies => validate_policies(artifact, session),
        Stage::Rules => validate_rules(artifact, session),
        Stage::SimulationFinalization => Vec::new(),
    }
}

/// BLOCKED if any finding halts progress, else READY.
pub fn determine_stage_state(findings: &[Finding]) -> StageState {
    if has_blocking(findings) {
        StageState::Blocked
    } else {
        StageState::Ready
    }
}

// ── Lenient field access ─────────────────────────────────────────────────

/// The artifact as a JSON object, if it is one.
pub(crate) fn record(artifact: &Value) -> Option<&Map<String, Value>> {
    artifact.as_object()
}

/// A string field with surrounding whitespace trimmed; blank counts as absent.
pub(crate) fn text<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A non-empty array field.
pub(crate) fn non_empty_list<'a>(
    record: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Vec<Value>> {
    record
        .get(key)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
}

/// The string members of an array field, trimmed, blanks dropped.
pub(crate) fn string_items(record: &Map<String, Value>, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Only a literal JSON `true` counts as confirmation.
pub(crate) fn confirmed(record: &Map<String, Value>, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool) == Some(true)
}

pub(crate) fn matches_pattern(pattern: &str, text: &str) -> bool {
    Regex::new(pattern).is_ok_and(|re| re.is_match(text))
}

/// Case-insensitive containment of any keyword.
pub(crate) fn contains_any_keyword(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}
