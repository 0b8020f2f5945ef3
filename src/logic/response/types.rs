//! Response Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a response action does when it fires. Transports are thin
/// fire-and-forget side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseActionKind {
    /// Write the anomaly to the system log
    LogOnly,
    /// Invoke the registered anomaly-event callback
    EmitEvent,
    /// POST a JSON payload to an external endpoint
    HttpPost {
        url: String,
        /// Custom payload; defaults to the anomaly summary when empty
        payload: Option<String>,
    },
}

impl ResponseActionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResponseActionKind::LogOnly => "log_only",
            ResponseActionKind::EmitEvent => "emit_event",
            ResponseActionKind::HttpPost { .. } => "http_post",
        }
    }
}

/// A registered response to a verified anomaly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAction {
    pub kind: ResponseActionKind,
    pub name: String,
    pub description: String,
    /// Higher fires first
    pub priority: i32,
    /// Minimum spacing between firings of this action
    pub cooldown_ms: i64,
    /// When this action last fired
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl ResponseAction {
    pub fn new(kind: ResponseActionKind, name: &str, description: &str, priority: i32) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            priority,
            cooldown_ms: 0,
            last_triggered: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Whether the cooldown window since the last firing has elapsed
    pub fn ready_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(last) => (now - last).num_milliseconds() >= self.cooldown_ms,
            None => true,
        }
    }
}

/// Rolling per-anomaly-type detection state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyTracker {
    pub anomaly_type: String,
    /// Highest score seen so far
    pub peak_score: f32,
    pub first_detected: DateTime<Utc>,
    pub last_detected: DateTime<Utc>,
    pub consecutive_detections: u32,
    pub verified: bool,
    pub responded: bool,
}

impl AnomalyTracker {
    pub fn new(anomaly_type: &str, score: f32, now: DateTime<Utc>) -> Self {
        Self {
            anomaly_type: anomaly_type.to_string(),
            peak_score: score,
            first_detected: now,
            last_detected: now,
            consecutive_detections: 1,
            verified: false,
            responded: false,
        }
    }
}
