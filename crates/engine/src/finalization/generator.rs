//! Contract generation: assemble, canonicalize, hash, self-verify.

use super::canonical::{canonicalize_value, compute_hash};
use chrono::{DateTime, SecondsFormat, Utc};
use ddrgate_core::{CanonicalError, ContractArtifact, Session, Stage};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stages whose artifacts make up the contract record.
pub const REQUIRED_STAGES: [Stage; 5] = [
    Stage::Framing,
    Stage::Inputs,
    Stage::Outputs,
    Stage::Policies,
    Stage::Rules,
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("missing artifacts for {}", join_stages(.missing))]
    MissingArtifacts { missing: Vec<Stage> },

    #[error(transparent)]
    NotCanonical(#[from] CanonicalError),

    #[error("hash mismatch on re-verification: expected {expected}, computed {computed}")]
    HashFailed { expected: String, computed: String },
}

fn join_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Produce the hash-addressed contract for `session` at `version`.
///
/// Pure: the same session, version and timestamp always yield the same hash.
pub fn generate_contract(
    session: &Session,
    version: &str,
    generated_at: DateTime<Utc>,
) -> Result<ContractArtifact, GenerationError> {
    let missing: Vec<Stage> = REQUIRED_STAGES
        .into_iter()
        .filter(|stage| session.artifact(*stage).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(GenerationError::MissingArtifacts { missing });
    }

    let decision_id = session
        .artifact(Stage::Framing)
        .and_then(|framing| framing.get("decision_id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GenerationError::MissingArtifacts {
            missing: vec![Stage::Framing],
        })?
        .to_string();

    let mut record = Map::new();
    record.insert("meta_contract_id".into(), session.meta_contract_id.clone().into());
    record.insert("contract_version".into(), version.into());
    record.insert("decision_id".into(), decision_id.clone().into());
    for stage in REQUIRED_STAGES {
        let artifact = session.artifact(stage).cloned().unwrap_or(Value::Null);
        record.insert(stage.as_str().to_lowercase(), artifact);
    }
    record.insert(
        "generated_at".into(),
        generated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .into(),
    );

    let canonical_text = canonicalize_value(&Value::Object(record))?;
    let hash = compute_hash(&canonical_text);

    let canonical_json: Value = serde_json::from_str(&canonical_text)
        .map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    let recomputed = compute_hash(&canonicalize_value(&canonical_json)?);
    if recomputed != hash {
        return Err(GenerationError::HashFailed {
            expected: hash,
            computed: recomputed,
        });
    }

    Ok(ContractArtifact {
        contract_id: format!("{decision_id}@{version}"),
        version: version.to_string(),
        hash,
        canonical_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ddrgate_core::StageState;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn complete_session() -> Session {
        let mut session = Session::new("s1", "meta.ddr", now());
        session = session.with_submission(
            Stage::Framing,
            json!({"decision_id": "age_gate", "contract_version": "1.0.0"}),
            StageState::Ready,
        );
        for stage in [Stage::Inputs, Stage::Outputs, Stage::Policies, Stage::Rules] {
            session = session.with_submission(stage, json!({"stage": stage.as_str()}), StageState::Ready);
        }
        session
    }

    #[test]
    fn generates_identified_contract() {
        let artifact = generate_contract(&complete_session(), "2.0.0", now()).unwrap();
        assert_eq!(artifact.contract_id, "age_gate@2.0.0");
        assert_eq!(artifact.version, "2.0.0");
        assert!(artifact.hash.starts_with("sha256:"));
        assert_eq!(artifact.canonical_json["contract_version"], "2.0.0");
        assert_eq!(artifact.canonical_json["generated_at"], "2026-01-01T00:00:00.000Z");
        assert_eq!(artifact.canonical_json["meta_contract_id"], "meta.ddr");
        assert!(artifact.canonical_json.get("simulation_finalization").is_none());
        assert_eq!(artifact.canonical_json["rules"], json!({"stage": "RULES"}));
    }

    #[test]
    fn generation_is_reproducible() {
        let session = complete_session();
        let first = generate_contract(&session, "1.0.0", now()).unwrap();
        let second = generate_contract(&session, "1.0.0", now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_depends_on_version_and_time() {
        let session = complete_session();
        let base = generate_contract(&session, "1.0.0", now()).unwrap();
        let bumped = generate_contract(&session, "1.0.1", now()).unwrap();
        let later = generate_contract(&session, "1.0.0", now() + chrono::Duration::seconds(1)).unwrap();
        assert_ne!(base.hash, bumped.hash);
        assert_ne!(base.hash, later.hash);
    }

    #[test]
    fn missing_artifacts_are_listed() {
        let session = Session::new("s1", "meta.ddr", now()).with_submission(
            Stage::Framing,
            json!({"decision_id": "age_gate"}),
            StageState::Ready,
        );
        let err = generate_contract(&session, "1.0.0", now()).unwrap_err();
        assert_eq!(
            err,
            GenerationError::MissingArtifacts {
                missing: vec![Stage::Inputs, Stage::Outputs, Stage::Policies, Stage::Rules]
            }
        );
        assert!(err.to_string().contains("INPUTS, OUTPUTS"));
    }

    #[test]
    fn blank_decision_id_counts_as_missing_framing() {
        let session = complete_session().with_submission(
            Stage::Framing,
            json!({"decision_id": "  "}),
            StageState::Ready,
        );
        assert!(matches!(
            generate_contract(&session, "1.0.0", now()),
            Err(GenerationError::MissingArtifacts { .. })
        ));
    }

    #[test]
    fn deeply_nested_artifact_is_not_canonical() {
        let mut nested = json!(0);
        for _ in 0..100 {
            nested = json!([nested]);
        }
        let session = complete_session().with_submission(Stage::Rules, nested, StageState::Ready);
        assert!(matches!(
            generate_contract(&session, "1.0.0", now()),
            Err(GenerationError::NotCanonical(CanonicalError::TooDeep { .. }))
        ));
    }
}
