//! Downloadable form of a finalized contract.

use super::canonical::canonicalize_value;
use ddrgate_core::{CanonicalError, ContractArtifact};

pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const FILE_EXTENSION: &str = ".meta-ddr.json";

/// Canonical bytes plus the headers a client needs to save them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// The exact bytes that were hashed, ready to be written to disk or a response body.
pub fn to_download_bytes(artifact: &ContractArtifact) -> Result<ContractDownload, CanonicalError> {
    let text = canonicalize_value(&artifact.canonical_json)?;
    Ok(ContractDownload {
        filename: format!("{}{FILE_EXTENSION}", sanitize(&artifact.contract_id)),
        content_type: CONTENT_TYPE,
        bytes: text.into_bytes(),
    })
}

fn sanitize(contract_id: &str) -> String {
    contract_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
