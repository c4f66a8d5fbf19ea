//! Bearer-token authentication and scope checks.
//!
//! Tokens are held only as SHA-256 digests. With no tokens configured the
//! authenticator is open and every caller is the `anonymous` principal
//! holding all scopes.

use ddrgate_config::AuthConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const ANONYMOUS: &str = "anonymous";

/// Permission attached to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Stage evaluation and transitions
    Validate,
    Simulate,
    Finalize,
    /// Registry lookups
    Read,
    /// Hash verification
    Verify,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::Validate,
        Scope::Simulate,
        Scope::Finalize,
        Scope::Read,
        Scope::Verify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Validate => "validate",
            Scope::Simulate => "simulate",
            Scope::Finalize => "finalize",
            Scope::Read => "read",
            Scope::Verify => "verify",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AuthError::UnknownScope(s.to_string()))
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub scopes: BTreeSet<Scope>,
}

impl Principal {
    pub fn new(name: impl Into<String>, scopes: impl IntoIterator<Item = Scope>) -> Self {
        Self {
            name: name.into(),
            scopes: scopes.into_iter().collect(),
        }
    }

    /// The caller in open (no tokens configured) mode.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS, Scope::ALL)
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("unknown bearer token")]
    UnknownToken,

    #[error("principal '{principal}' lacks scope '{scope}'")]
    MissingScope { principal: String, scope: Scope },

    #[error("unknown scope '{0}'")]
    UnknownScope(String),
}

/// Resolves `Authorization` headers to principals.
pub struct TokenAuthenticator {
    principals: HashMap<String, Principal>,
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("token_count", &self.principals.len())
            .finish()
    }
}

impl TokenAuthenticator {
    /// An authenticator that accepts everyone as `anonymous`.
    pub fn open() -> Self {
        Self {
            principals: HashMap::new(),
        }
    }

    /// Build from configuration. Unknown scope names are dropped with a warning.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut authenticator = Self::open();
        for entry in &config.tokens {
            let scopes = entry.scopes.iter().filter_map(|raw| match raw.parse::<Scope>() {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!(principal = %entry.principal, error = %e, "Ignoring scope");
                    None
                }
            });
            authenticator.add_token(&entry.token, Principal::new(&entry.principal, scopes));
        }
        authenticator
    }

    pub fn add_token(&mut self, token: &str, principal: Principal) {
        self.principals.insert(digest(token), principal);
    }

    /// True when no tokens are configured.
    pub fn is_open(&self) -> bool {
        self.principals.is_empty()
    }

    /// Resolve the value of an `Authorization` header.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        if self.is_open() {
            return Ok(Principal::anonymous());
        }

        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.principals
            .get(&digest(token))
            .cloned()
            .ok_or(AuthError::UnknownToken)
    }

    /// Check that `principal` may use an endpoint requiring `scope`.
    pub fn authorize(&self, principal: &Principal, scope: Scope) -> Result<(), AuthError> {
        if principal.has_scope(scope) {
            Ok(())
        } else {
            Err(AuthError::MissingScope {
                principal: principal.name.clone(),
                scope,
            })
        }
    }
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
