//! `ddrgate verify`: Check a contract file against a claimed hash.

use ddrgate_engine::{CanonicalInput, HashVerification, verify_contract_hash};
use serde_json::Value;
use std::path::Path;

/// With `exact`, the file bytes are hashed as-is; otherwise the file is
/// parsed and re-canonicalized first.
pub async fn run(file: &Path, hash: &str, exact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let report = verify_file(file, hash, exact)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.valid {
        return Err(report
            .reason
            .unwrap_or_else(|| "hash verification failed".into())
            .into());
    }
    Ok(())
}

pub fn verify_file(
    file: &Path,
    hash: &str,
    exact: bool,
) -> Result<HashVerification, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    if exact {
        return Ok(verify_contract_hash(CanonicalInput::Text(&contents), hash));
    }
    let record: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("{} is not valid JSON: {e}", file.display()))?;
    Ok(verify_contract_hash(CanonicalInput::Record(&record), hash))
}
