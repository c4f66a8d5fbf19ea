//! Audit logging: append-only record of every gateway request.
//!
//! Entries are keyed by request id so a single request can be traced from
//! authentication through the engine decision. The in-memory log is capped;
//! once full, the oldest entries are dropped. Sinks see every entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    /// Principal name, or `anonymous`.
    pub actor: String,
    /// Endpoint path or contract hash the event concerns.
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable gateway events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A request reached an engine operation
    ApiRequest { endpoint: String },
    /// Missing or unknown bearer token
    AuthFailure,
    /// Authenticated principal lacks the endpoint's scope
    ScopeDenied { scope: String },
    /// Token bucket exhausted
    RateLimited { endpoint: String },
    /// A contract was finalized and registered
    ContractRegistered { hash: String },
    /// Finalize lineage metadata failed registry validation
    LineageRejected { reason: String },
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Trait for audit log sinks (where events are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Entries kept in memory unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory, append-only audit log that also forwards to its sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
    max_entries: usize,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// Create a new audit logger with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Keep at most `max_entries` in memory.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Record an audit event for `request_id`.
    pub fn log(
        &self,
        request_id: &str,
        event: AuditEvent,
        actor: &str,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        self.append(AuditEntry {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            event,
            actor: actor.into(),
            target: target.into(),
            outcome,
            details,
        });
    }

    /// Append a fully built entry, dropping the oldest ones past the cap.
    pub fn append(&self, entry: AuditEntry) {
        for sink in &self.sinks {
            sink.record(&entry);
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
    }

    /// Get all recorded entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every entry recorded for one request.
    pub fn entries_for_request(&self, request_id: &str) -> Vec<AuditEntry> {
        self.filtered(|e| e.request_id == request_id)
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.filtered(|e| &e.outcome == outcome)
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn filtered(&self, keep: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            request_id = %entry.request_id,
            event = ?entry.event,
            actor = %entry.actor,
            target = %entry.target,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn request(endpoint: &str) -> AuditEvent {
        AuditEvent::ApiRequest {
            endpoint: endpoint.into(),
        }
    }

    #[test]
    fn log_and_retrieve_entries() {
        let logger = AuditLogger::new();
        logger.log("req-1", request("/api/v1/evaluate"), "author", "/api/v1/evaluate", AuditOutcome::Success, None);
        logger.log(
            "req-2",
            AuditEvent::AuthFailure,
            "anonymous",
            "/api/v1/finalize",
            AuditOutcome::Denied,
            Some("unknown token".into()),
        );

        assert_eq!(logger.count(), 2);
        let entries = logger.entries();
        assert_eq!(entries[0].request_id, "req-1");
        assert_eq!(entries[1].actor, "anonymous");
    }

    #[test]
    fn entries_are_keyed_by_request() {
        let logger = AuditLogger::new();
        logger.log("req-1", request("/api/v1/finalize"), "ci", "/api/v1/finalize", AuditOutcome::Success, None);
        logger.log(
            "req-1",
            AuditEvent::ContractRegistered { hash: "sha256:ab".into() },
            "ci",
            "sha256:ab",
            AuditOutcome::Success,
            None,
        );
        logger.log("req-2", request("/api/v1/verify"), "ci", "/api/v1/verify", AuditOutcome::Success, None);

        let first = logger.entries_for_request("req-1");
        assert_eq!(first.len(), 2);
        assert!(matches!(first[1].event, AuditEvent::ContractRegistered { .. }));
    }

    #[test]
    fn filter_by_outcome() {
        let logger = AuditLogger::new();
        logger.log("a", request("/x"), "u1", "/x", AuditOutcome::Success, None);
        logger.log(
            "b",
            AuditEvent::RateLimited { endpoint: "/x".into() },
            "u2",
            "/x",
            AuditOutcome::Denied,
            None,
        );

        let denied = logger.entries_by_outcome(&AuditOutcome::Denied);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].actor, "u2");
    }

    #[test]
    fn audit_entry_serialization() {
        let entry = AuditEntry {
            request_id: "req-9".into(),
            timestamp: Utc::now(),
            event: AuditEvent::ScopeDenied { scope: "finalize".into() },
            actor: "reader".into(),
            target: "/api/v1/finalize".into(),
            outcome: AuditOutcome::Denied,
            details: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "scope_denied");
        let back: AuditEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_id, "req-9");
        assert_eq!(back.outcome, AuditOutcome::Denied);
    }

    #[test]
    fn custom_sink_receives_events() {
        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.request_id.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = TestSink { received: received.clone() };
        let logger = AuditLogger::with_sinks(vec![Box::new(sink), Box::new(TracingSink)]);

        logger.log("req-7", request("/health"), "anonymous", "/health", AuditOutcome::Success, None);

        let sink_entries = received.lock().unwrap();
        assert_eq!(*sink_entries, vec!["req-7".to_string()]);
    }

    #[test]
    fn oldest_entries_are_dropped_past_the_cap() {
        let received = Arc::new(Mutex::new(Vec::new()));

        struct CountingSink(Arc<Mutex<Vec<String>>>);

        impl AuditSink for CountingSink {
            fn record(&self, entry: &AuditEntry) {
                self.0.lock().unwrap().push(entry.request_id.clone());
            }
        }

        let logger = AuditLogger::with_sinks(vec![Box::new(CountingSink(received.clone()))])
            .with_max_entries(3);
        for i in 0..5 {
            logger.log(&format!("req-{i}"), request("/x"), "u", "/x", AuditOutcome::Success, None);
        }

        assert_eq!(logger.count(), 3);
        let ids: Vec<_> = logger.entries().into_iter().map(|e| e.request_id).collect();
        assert_eq!(ids, vec!["req-2", "req-3", "req-4"]);
        assert!(logger.entries_for_request("req-0").is_empty());
        assert_eq!(received.lock().unwrap().len(), 5);
    }

    #[test]
    fn default_cap() {
        let debug_str = format!("{:?}", AuditLogger::new());
        assert!(debug_str.contains(&format!("max_entries: {DEFAULT_MAX_ENTRIES}")));
    }

    #[test]
    fn debug_format() {
        let logger = AuditLogger::default();
        let debug_str = format!("{logger:?}");
        assert!(debug_str.contains("entry_count: 0"));
    }
}
