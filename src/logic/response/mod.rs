//! Verification & Response Gate
//!
//! Multi-signal verification of detected anomalies with per-action cooldowns.
//! Each anomaly type gets a rolling tracker; once a tracker verifies, the
//! registered response actions for that type fire once in priority order.
//! The gate's only core output is the anomaly-event callback, which the
//! cognitive core subscribes to.
//!
//! Clocks here are event time: all windows are measured against observation
//! timestamps, so replayed footage verifies the same way live footage does.

pub mod types;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::constants::TRACKER_IDLE_TIMEOUT_SECS;
use crate::logic::features::timestamp_to_datetime;
use crate::logic::observation::FrameAnalysisResult;

pub use types::{AnomalyTracker, ResponseAction, ResponseActionKind};

/// Anomaly types without their own action list fall back to this bucket
const FALLBACK_BUCKET: &str = "GeneralAnomaly";

/// Verification windows and thresholds
const VERIFY_IMMEDIATE_SCORE: f32 = 0.85;
const VERIFY_REPEAT_SCORE: f32 = 0.7;
const VERIFY_REPEAT_COUNT: u32 = 2;
const VERIFY_PERSISTENT_COUNT: u32 = 3;
const VERIFY_PERSISTENCE_SECS: i64 = 30;

pub type EventCallback = Box<dyn Fn(&FrameAnalysisResult) + Send + Sync>;

pub struct ResponseGate {
    device_id: String,
    actions: Mutex<HashMap<String, Vec<ResponseAction>>>,
    trackers: Mutex<HashMap<String, AnomalyTracker>>,
    event_callback: Mutex<Option<EventCallback>>,
}

impl ResponseGate {
    pub fn new(device_id: &str) -> Self {
        let gate = Self {
            device_id: device_id.to_string(),
            actions: Mutex::new(HashMap::new()),
            trackers: Mutex::new(HashMap::new()),
            event_callback: Mutex::new(None),
        };

        // Default registrations: log plus event for the known anomaly types
        for anomaly_type in ["UnknownVisitor", "AbnormalActivity", FALLBACK_BUCKET] {
            gate.add_response_action(
                anomaly_type,
                ResponseAction::new(
                    ResponseActionKind::LogOnly,
                    "LogAnomaly",
                    "Log anomaly detection to system log",
                    0,
                ),
            );
            gate.add_response_action(
                anomaly_type,
                ResponseAction::new(
                    ResponseActionKind::EmitEvent,
                    "AnomalyEvent",
                    "Raise anomaly event for the host",
                    10,
                ),
            );
        }

        gate
    }

    pub fn set_event_callback(&self, callback: EventCallback) {
        *self.event_callback.lock() = Some(callback);
    }

    /// Add or replace an action for an anomaly type, keeping the list sorted
    /// by priority (highest first)
    pub fn add_response_action(&self, anomaly_type: &str, action: ResponseAction) {
        let mut actions = self.actions.lock();
        let list = actions.entry(anomaly_type.to_string()).or_default();

        match list.iter_mut().find(|a| a.name == action.name) {
            Some(existing) => *existing = action,
            None => list.push(action),
        }
        list.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn remove_response_action(&self, anomaly_type: &str, action_name: &str) {
        if let Some(list) = self.actions.lock().get_mut(anomaly_type) {
            list.retain(|a| a.name != action_name);
        }
    }

    /// Feed one anomalous observation through verification. Returns true when
    /// this call verified the anomaly and fired its responses.
    pub fn process_anomaly(&self, result: &FrameAnalysisResult) -> bool {
        if !result.is_anomaly {
            return false;
        }

        let now = timestamp_to_datetime(result.timestamp_us);
        self.prune_trackers(now);

        let should_respond = {
            let mut trackers = self.trackers.lock();
            let tracker = trackers
                .entry(result.anomaly_type.clone())
                .and_modify(|t| {
                    t.consecutive_detections += 1;
                    t.last_detected = now;
                    if result.anomaly_score > t.peak_score {
                        t.peak_score = result.anomaly_score;
                    }
                })
                .or_insert_with(|| {
                    AnomalyTracker::new(&result.anomaly_type, result.anomaly_score, now)
                });

            Self::verify(result.anomaly_score, tracker);

            if tracker.verified && !tracker.responded {
                tracker.responded = true;
                true
            } else {
                false
            }
        };

        if should_respond {
            self.trigger_responses(result, now);
        }
        should_respond
    }

    /// Verification rule chain, first match wins. Once verified a tracker
    /// stays verified regardless of later scores.
    fn verify(score: f32, tracker: &mut AnomalyTracker) {
        if tracker.verified {
            return;
        }

        if score > VERIFY_IMMEDIATE_SCORE {
            tracker.verified = true;
        } else if score > VERIFY_REPEAT_SCORE
            && tracker.consecutive_detections >= VERIFY_REPEAT_COUNT
        {
            tracker.verified = true;
        } else if tracker.consecutive_detections >= VERIFY_PERSISTENT_COUNT {
            tracker.verified = true;
        } else {
            let persisted_secs =
                (tracker.last_detected - tracker.first_detected).num_seconds();
            if persisted_secs > VERIFY_PERSISTENCE_SECS {
                tracker.verified = true;
            }
        }
    }

    /// Fire all registered actions for the anomaly type in priority order,
    /// skipping any still inside their cooldown window
    fn trigger_responses(&self, result: &FrameAnalysisResult, now: DateTime<Utc>) {
        let mut actions = self.actions.lock();

        let key = if actions.contains_key(&result.anomaly_type) {
            result.anomaly_type.as_str()
        } else {
            FALLBACK_BUCKET
        };
        let list = match actions.get_mut(key) {
            Some(list) => list,
            None => {
                log::warn!(
                    "No response actions defined for anomaly type {}",
                    result.anomaly_type
                );
                return;
            }
        };

        for action in list.iter_mut() {
            if !action.ready_at(now) {
                continue;
            }
            if self.execute_action(action, result) {
                action.last_triggered = Some(now);
            }
        }
    }

    fn execute_action(&self, action: &ResponseAction, result: &FrameAnalysisResult) -> bool {
        match &action.kind {
            ResponseActionKind::LogOnly => {
                log::info!(
                    "Anomaly detected on {}: {} - {} (score: {:.2})",
                    self.device_id,
                    result.anomaly_type,
                    result.anomaly_description,
                    result.anomaly_score
                );
                true
            }

            ResponseActionKind::EmitEvent => {
                let callback = self.event_callback.lock();
                match callback.as_ref() {
                    Some(callback) => {
                        callback(result);
                        true
                    }
                    None => {
                        log::warn!("Anomaly event callback not set on {}", self.device_id);
                        false
                    }
                }
            }

            ResponseActionKind::HttpPost { url, payload } => {
                if url.is_empty() {
                    return false;
                }
                let body = payload.clone().unwrap_or_else(|| {
                    serde_json::json!({
                        "anomalyType": result.anomaly_type,
                        "description": result.anomaly_description,
                        "score": result.anomaly_score,
                        "deviceId": self.device_id,
                        "timestamp": result.timestamp_us,
                    })
                    .to_string()
                });
                let url = url.clone();

                // Fire-and-forget; delivery problems only get logged
                std::thread::spawn(move || {
                    let sent = ureq::post(&url)
                        .timeout(std::time::Duration::from_secs(10))
                        .set("Content-Type", "application/json")
                        .send_string(&body);
                    if let Err(e) = sent {
                        log::error!("Notification POST to {} failed: {}", url, e);
                    }
                });
                true
            }
        }
    }

    /// Drop trackers with no detections inside the idle window
    fn prune_trackers(&self, now: DateTime<Utc>) {
        self.trackers.lock().retain(|_, tracker| {
            (now - tracker.last_detected).num_seconds() <= TRACKER_IDLE_TIMEOUT_SECS
        });
    }

    /// Tracker snapshot for one anomaly type
    pub fn tracker(&self, anomaly_type: &str) -> Option<AnomalyTracker> {
        self.trackers.lock().get(anomaly_type).cloned()
    }
}
