//! Error types for the ddrgate domain.
//!
//! Governance outcomes are never errors; they travel as findings inside the
//! result records. These types cover the plumbing around them.

use thiserror::Error;

/// The top-level error type for ddrgate operations outside the facade.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a record could not be reduced to canonical JSON.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanonicalError {
    #[error("record could not be serialized: {0}")]
    Serialize(String),

    #[error("record nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_error_displays_through_top_level() {
        let err = Error::from(CanonicalError::TooDeep { limit: 64 });
        assert!(err.to_string().contains("64"));
        assert!(err.to_string().starts_with("Canonicalization error"));
    }
}
