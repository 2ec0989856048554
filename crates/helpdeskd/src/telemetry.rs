//! Request telemetry recording.
//!
//! One record per terminal outcome: timing, hashed identity, outcome class.
//! Identities are salted with a process-lifetime random value and hashed
//! before they reach any log line; raw issue text is never recorded.

use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Terminal classification of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Answer served, freshly orchestrated.
    Answered,
    /// Answer served straight from the cache.
    CacheHit,
    /// Model asked one clarifying question instead of answering.
    Clarification,
    /// Denied by the rate limiter.
    RateLimited,
    /// Payload failed structural validation.
    InvalidInput,
    /// No parseable structured payload in the model's final text.
    ExtractionFailed,
    /// Parsed payload failed the answer contract.
    SchemaFailed,
    /// Model transport failed or the tool-call budget ran out.
    OrchestrationFailed,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Answered => "answered",
            RequestOutcome::CacheHit => "cache_hit",
            RequestOutcome::Clarification => "clarification",
            RequestOutcome::RateLimited => "rate_limited",
            RequestOutcome::InvalidInput => "invalid_input",
            RequestOutcome::ExtractionFailed => "extraction_failed",
            RequestOutcome::SchemaFailed => "schema_failed",
            RequestOutcome::OrchestrationFailed => "orchestration_failed",
        }
    }
}

/// Counter snapshot exposed on the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub total: u64,
    pub by_outcome: BTreeMap<String, u64>,
}

/// Process-wide telemetry recorder.
pub struct Recorder {
    salt: [u8; 16],
    counters: Mutex<BTreeMap<&'static str, u64>>,
}

impl Recorder {
    pub fn new() -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            salt,
            counters: Mutex::new(BTreeMap::new()),
        }
    }

    /// Short salted hash of a request identity, safe to log.
    pub fn hash_identity(&self, identity: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt);
        hasher.update(identity.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..6])
    }

    /// Record one terminal outcome. Exactly one call per request.
    pub fn record(&self, identity: &str, outcome: RequestOutcome, elapsed: Duration) {
        let hashed = self.hash_identity(identity);
        info!(
            target: "helpdeskd::telemetry",
            identity = %hashed,
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            at = %Utc::now().to_rfc3339(),
            "request finished"
        );
        let mut counters = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counters.entry(outcome.as_str()).or_insert(0) += 1;
    }

    /// Current counters for the health endpoint.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let counters = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        TelemetrySnapshot {
            total: counters.values().sum(),
            by_outcome: counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
