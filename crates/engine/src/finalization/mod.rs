//! Finalization: canonical form, hashing, contract generation, download and verification.

pub mod canonical;
mod download;
mod generator;
mod verify;

pub use canonical::{canonicalize, canonicalize_value, compute_hash};
pub use download::{CONTENT_TYPE, ContractDownload, FILE_EXTENSION, to_download_bytes};
pub use generator::{GenerationError, REQUIRED_STAGES, generate_contract};
pub use verify::{CanonicalInput, HashVerification, verify_contract_hash};
