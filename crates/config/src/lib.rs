//! Configuration loading, validation, and management for ddrgate.
//!
//! Loads configuration from `~/.ddrgate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scopes a bearer token may carry.
pub const KNOWN_SCOPES: &[&str] = &["validate", "simulate", "finalize", "read", "verify"];

/// The root configuration structure.
///
/// Maps directly to `~/.ddrgate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine defaults
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-principal, per-endpoint token buckets
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Bearer tokens accepted by the gateway
    #[serde(default)]
    pub auth: AuthConfig,

    /// Golden-file harness settings
    #[serde(default)]
    pub harness: HarnessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Contract version used when neither the request nor FRAMING names one.
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Meta-contract stamped on new sessions.
    #[serde(default = "default_meta_contract_id")]
    pub meta_contract_id: String,
}

fn default_version() -> String {
    "1.0.0".into()
}
fn default_meta_contract_id() -> String {
    "meta.ddr.intake.v0_1".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_version: default_version(),
            meta_contract_id: default_meta_contract_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Audit entries kept in memory; older entries are dropped
    #[serde(default = "default_audit_max_entries")]
    pub audit_max_entries: usize,
}

fn default_port() -> u16 {
    42700
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:42700".into()]
}
fn default_audit_max_entries() -> usize {
    10_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
            allowed_origins: default_allowed_origins(),
            audit_max_entries: default_audit_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket size: requests allowed in a burst.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Tokens restored per second.
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,
}

fn default_capacity() -> u32 {
    60
}
fn default_refill_per_sec() -> f64 {
    1.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_per_sec: default_refill_per_sec(),
        }
    }
}

/// Gateway authentication. An empty token list leaves the API open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub principal: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("token", &"[REDACTED]")
            .field("principal", &self.principal)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory holding golden canonical JSON and hash files
    #[serde(default = "default_golden_dir")]
    pub golden_dir: PathBuf,
}

fn default_golden_dir() -> PathBuf {
    PathBuf::from("golden")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            golden_dir: default_golden_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ddrgate/config.toml).
    ///
    /// Environment variables override the file:
    /// - `DDRGATE_HOST`
    /// - `DDRGATE_PORT`
    /// - `DDRGATE_DEFAULT_VERSION`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DDRGATE_HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = lookup("DDRGATE_PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("DDRGATE_PORT is not a valid port: {port}"))
            })?;
        }

        if let Some(version) = lookup("DDRGATE_DEFAULT_VERSION") {
            self.engine.default_version = version;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ddrgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.default_version.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.default_version must not be empty".into(),
            ));
        }

        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.capacity must be at least 1".into(),
            ));
        }

        if self.rate_limit.refill_per_sec.is_nan() || self.rate_limit.refill_per_sec <= 0.0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.refill_per_sec must be > 0".into(),
            ));
        }

        if self.gateway.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_body_bytes must be > 0".into(),
            ));
        }

        for entry in &self.auth.tokens {
            if entry.token.is_empty() || entry.principal.is_empty() {
                return Err(ConfigError::ValidationError(
                    "auth.tokens entries need a token and a principal".into(),
                ));
            }
            if let Some(unknown) = entry
                .scopes
                .iter()
                .find(|scope| !KNOWN_SCOPES.contains(&scope.as_str()))
            {
                return Err(ConfigError::ValidationError(format!(
                    "unknown scope '{unknown}' for principal '{}'",
                    entry.principal
                )));
            }
        }

        Ok(())
    }

    /// Whether the gateway should require bearer tokens.
    pub fn auth_enabled(&self) -> bool {
        !self.auth.tokens.is_empty()
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
