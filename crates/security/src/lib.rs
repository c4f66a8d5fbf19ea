//! Security module for ddrgate: authentication, rate limiting, and audit logging.
//!
//! Provides:
//! - **Authentication**: Bearer tokens mapped to principals with scopes
//! - **Rate limiting**: Token buckets per principal and endpoint
//! - **Audit logging**: Append-only request log keyed by request id
//!
//! None of this influences engine outcomes; it only decides whether a
//! request reaches the engine at all.

pub mod audit;
pub mod auth;
pub mod rate_limit;

pub use audit::{
    AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, DEFAULT_MAX_ENTRIES, TracingSink,
};
pub use auth::{ANONYMOUS, AuthError, Principal, Scope, TokenAuthenticator};
pub use rate_limit::RateLimiter;
