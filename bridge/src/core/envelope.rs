//! Immutable envelope around one dispatched host event

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Snapshot of one host event: name, string-coerced arguments, a
/// wall-clock timestamp and a monotonic creation instant. Processing time
/// is computed on demand, never stored.
#[derive(Clone, Debug)]
pub struct EventEnvelope {
    name: String,
    args: Vec<String>,
    timestamp: DateTime<Utc>,
    created: Instant,
}

impl EventEnvelope {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            timestamp: Utc::now(),
            created: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Wall-clock time at which the event was wrapped.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Elapsed time since the envelope was created.
    pub fn processing_time(&self) -> Duration {
        self.created.elapsed()
    }
}
