//! Independent verification of a contract hash.

use super::canonical::{canonicalize_value, compute_hash, is_well_formed_hash};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the caller claims was hashed.
#[derive(Debug, Clone, Copy)]
pub enum CanonicalInput<'a> {
    /// A parsed record; re-canonicalized before hashing.
    Record(&'a Value),
    /// Canonical text; hashed byte for byte.
    Text(&'a str),
}

impl<'a> From<&'a Value> for CanonicalInput<'a> {
    /// JSON strings are treated as canonical text, everything else as a record.
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(text) => CanonicalInput::Text(text.as_str()),
            other => CanonicalInput::Record(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashVerification {
    pub valid: bool,
    pub expected_hash: String,
    pub provided_hash: String,
    #[serde(rename = "match")]
    pub matches: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Recompute the hash of `canonical` and compare it with `claimed` (case-insensitive).
pub fn verify_contract_hash<'a>(
    canonical: impl Into<CanonicalInput<'a>>,
    claimed: &str,
) -> HashVerification {
    let provided_hash = claimed.trim().to_string();
    let text = match canonical.into() {
        CanonicalInput::Text(text) => Ok(text.to_string()),
        CanonicalInput::Record(record) => canonicalize_value(record),
    };

    let expected_hash = match text {
        Ok(text) => compute_hash(&text),
        Err(e) => {
            return HashVerification {
                valid: false,
                expected_hash: String::new(),
                provided_hash,
                matches: false,
                reason: Some(format!("record cannot be canonicalized: {e}")),
            };
        }
    };

    let well_formed = is_well_formed_hash(&provided_hash);
    let matches = well_formed && expected_hash.eq_ignore_ascii_case(&provided_hash);
    let reason = if !well_formed {
        Some("hash must be sha256: followed by 64 hex characters".to_string())
    } else if !matches {
        Some("hash does not match the canonical record".to_string())
    } else {
        None
    };

    HashVerification {
        valid: matches,
        expected_hash,
        provided_hash,
        matches,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_and_text_verify_alike() {
        let record = json!({"b": [2, 1], "a": "x"});
        let text = canonicalize_value(&record).unwrap();
        let hash = compute_hash(&text);

        let by_record = verify_contract_hash(&record, &hash);
        assert!(by_record.valid && by_record.matches);
        assert_eq!(by_record.reason, None);

        let by_text = verify_contract_hash(CanonicalInput::Text(&text), &hash);
        assert!(by_text.valid);

        let as_json_string = Value::String(text.clone());
        assert!(verify_contract_hash(&as_json_string, &hash).valid);
    }

    #[test]
    fn comparison_ignores_hex_case() {
        let record = json!({"a": 1});
        let hash = compute_hash(&canonicalize_value(&record).unwrap());
        let shouted = format!("sha256:{}", hash["sha256:".len()..].to_uppercase());
        assert!(verify_contract_hash(&record, &shouted).matches);
    }

    #[test]
    fn tampered_record_does_not_match() {
        let hash = compute_hash(&canonicalize_value(&json!({"a": 1})).unwrap());
        let report = verify_contract_hash(&json!({"a": 2}), &hash);
        assert!(!report.valid);
        assert!(!report.matches);
        assert_eq!(report.provided_hash, hash);
        assert_ne!(report.expected_hash, hash);
        assert!(report.reason.is_some());
    }

    #[test]
    fn text_is_not_recanonicalized() {
        let record = json!({"a": 1});
        let hash = compute_hash(&canonicalize_value(&record).unwrap());
        let pretty = serde_json::to_string_pretty(&record).unwrap();
        assert!(!verify_contract_hash(CanonicalInput::Text(&pretty), &hash).matches);
    }

    #[test]
    fn malformed_claim_is_invalid() {
        let report = verify_contract_hash(&json!({}), "sha1:abc");
        assert!(!report.valid);
        assert!(report.reason.unwrap().contains("64 hex"));
    }

    #[test]
    fn report_serializes_match_field() {
        let report = verify_contract_hash(&json!({}), "sha1:abc");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["match"], false);
    }
}
