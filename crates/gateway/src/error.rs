//! Gateway error type and its HTTP mapping.
//!
//! Engine governance outcomes (BLOCK / REJECT) are not errors here; they
//! travel as `200 OK` result bodies. These are transport-level refusals.

use crate::AuditNote;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ddrgate_registry::RegistryError;
use ddrgate_security::{AuditEvent, AuthError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("rate limit exceeded for {endpoint}")]
    RateLimited { endpoint: String },

    #[error("contract not found: {0}")]
    ContractNotFound(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(AuthError::MissingScope { .. }) => StatusCode::FORBIDDEN,
            GatewayError::Auth(AuthError::UnknownScope(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ContractNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Registry(RegistryError::AlreadyRegistered(_)) => StatusCode::CONFLICT,
            GatewayError::Registry(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::Auth(AuthError::MissingScope { .. }) => "FORBIDDEN",
            GatewayError::Auth(AuthError::UnknownScope(_)) => "BAD_REQUEST",
            GatewayError::Auth(_) => "UNAUTHORIZED",
            GatewayError::RateLimited { .. } => "RATE_LIMITED",
            GatewayError::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            GatewayError::Registry(RegistryError::AlreadyRegistered(_)) => {
                "CONTRACT_ALREADY_REGISTERED"
            }
            GatewayError::Registry(_) => "LINEAGE_VALIDATION_FAILED",
        }
    }

    fn audit_note(&self) -> Option<AuditNote> {
        let event = match self {
            GatewayError::Auth(AuthError::MissingScope { scope, .. }) => AuditEvent::ScopeDenied {
                scope: scope.to_string(),
            },
            GatewayError::Auth(AuthError::MissingToken | AuthError::UnknownToken) => {
                AuditEvent::AuthFailure
            }
            GatewayError::RateLimited { endpoint } => AuditEvent::RateLimited {
                endpoint: endpoint.clone(),
            },
            GatewayError::Registry(RegistryError::AlreadyRegistered(_)) => return None,
            GatewayError::Registry(e) => AuditEvent::LineageRejected {
                reason: e.to_string(),
            },
            _ => return None,
        };
        Some(AuditNote {
            event,
            target: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let note = self.audit_note();
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(note) = note {
            response.extensions_mut().insert(note);
        }
        response
    }
}
