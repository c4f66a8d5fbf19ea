//! Canonical JSON and content hashing.
//!
//! Canonical form: object keys sorted lexicographically at every depth,
//! array order preserved, no insignificant whitespace, one trailing `\n`.
//! The same record always canonicalizes to the same bytes, and therefore
//! to the same `sha256:` hash.

use ddrgate_core::CanonicalError;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hash algorithm prefix carried by every contract hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Records nested deeper than this are refused.
pub const MAX_DEPTH: usize = 64;

/// Canonicalize any serializable record.
pub fn canonicalize<T: Serialize + ?Sized>(record: &T) -> Result<String, CanonicalError> {
    let value =
        serde_json::to_value(record).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    canonicalize_value(&value)
}

/// Canonicalize an already-built JSON value.
pub fn canonicalize_value(value: &Value) -> Result<String, CanonicalError> {
    let sorted = sort_keys(value, 0)?;
    let mut text =
        serde_json::to_string(&sorted).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

/// `sha256:` followed by the lowercase hex digest of the UTF-8 bytes of `text`.
pub fn compute_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{HASH_PREFIX}{}", hex::encode(digest))
}

/// Whether `hash` has the `sha256:<64 hex>` shape (hex case-insensitive).
pub fn is_well_formed_hash(hash: &str) -> bool {
    hash.get(..HASH_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HASH_PREFIX))
        && hash[HASH_PREFIX.len()..].len() == 64
        && hash[HASH_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
}

fn sort_keys(value: &Value, depth: usize) -> Result<Value, CanonicalError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, child) in entries {
                sorted.insert(key.clone(), sort_keys(child, depth + 1)?);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sort_keys(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        scalar => scalar.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn keys_sorted_at_every_depth() {
        let text = canonicalize_value(&json!({"b": 1, "a": {"z": true, "m": null}})).unwrap();
        assert_eq!(text, "{\"a\":{\"m\":null,\"z\":true},\"b\":1}\n");
    }

    #[test]
    fn arrays_keep_their_order() {
        let text = canonicalize_value(&json!({"list": [3, 1, 2]})).unwrap();
        assert_eq!(text, "{\"list\":[3,1,2]}\n");
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut first = HashMap::new();
        first.insert("alpha", 1);
        first.insert("beta", 2);
        first.insert("gamma", 3);
        let second: Vec<_> = vec![("gamma", 3), ("alpha", 1), ("beta", 2)];
        let second: HashMap<_, _> = second.into_iter().collect();
        assert_eq!(canonicalize(&first).unwrap(), canonicalize(&second).unwrap());
    }

    #[test]
    fn hash_has_prefix_and_64_hex() {
        let hash = compute_hash(&canonicalize_value(&json!({"a": 1})).unwrap());
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 64);
        assert!(is_well_formed_hash(&hash));
        assert!(is_well_formed_hash(&hash.to_uppercase().replace("SHA256:", "sha256:")));
        assert!(!is_well_formed_hash("sha256:abc"));
        assert!(!is_well_formed_hash("md5:0123"));
    }

    #[test]
    fn known_digest() {
        // sha256 of the empty string
        assert_eq!(
            compute_hash(""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn excessive_nesting_is_not_canonical() {
        let mut value = json!(0);
        for _ in 0..=MAX_DEPTH + 1 {
            value = json!([value]);
        }
        assert_eq!(
            canonicalize_value(&value),
            Err(CanonicalError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn non_string_map_keys_fail_to_serialize() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(canonicalize(&map), Err(CanonicalError::Serialize(_))));
    }
}
