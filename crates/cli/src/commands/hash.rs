//! `ddrgate hash`: Canonicalize a JSON file and print its contract hash.

use ddrgate_engine::{canonicalize_value, compute_hash};
use serde_json::Value;
use std::path::Path;

pub async fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let hash = hash_file(file)?;
    println!("{hash}");
    Ok(())
}

pub fn hash_file(file: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let record: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("{} is not valid JSON: {e}", file.display()))?;
    Ok(compute_hash(&canonicalize_value(&record)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_does_not_change_the_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, r#"{"b": 2, "a": {"y": 1, "x": 0}}"#).unwrap();
        std::fs::write(&b, "{\n  \"a\": {\"x\": 0, \"y\": 1},\n  \"b\": 2\n}\n").unwrap();

        let hash = hash_file(&a).unwrap();
        assert_eq!(hash, hash_file(&b).unwrap());
        assert!(hash.starts_with("sha256:"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(hash_file(&path).is_err());
    }
}
