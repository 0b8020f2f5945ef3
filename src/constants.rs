//! Central Configuration Constants
//!
//! Single source of truth for tuning defaults shared across subsystems.

/// Default anomaly threshold applied to new devices
pub const DEFAULT_ANOMALY_THRESHOLD: f32 = 0.7;

/// Samples accumulated per hour slot before the hourly model is retrained
pub const BASELINE_TRAIN_BATCH: usize = 100;

/// Bounded recent-feature history kept per detector
pub const RECENT_HISTORY_CAP: usize = 1000;

/// Hour slots per camera (one Gaussian model per local hour of day)
pub const HOUR_SLOTS: usize = 24;

/// Assumed frame dimensions when normalizing pixel boxes
pub const DEFAULT_FRAME_WIDTH: f32 = 1920.0;
pub const DEFAULT_FRAME_HEIGHT: f32 = 1080.0;

/// Tracked subjects idle longer than this are dropped
pub const SUBJECT_IDLE_TIMEOUT_SECS: i64 = 600;

/// Incidents without updates longer than this are force-resolved
pub const INCIDENT_STALE_TIMEOUT_SECS: i64 = 1800;

/// Non-active plans older than this are dropped
pub const PLAN_RETENTION_HOURS: i64 = 24;

/// Anomaly trackers idle longer than this are pruned from the response gate
pub const TRACKER_IDLE_TIMEOUT_SECS: i64 = 120;

/// Knowledge items are garbage collected after this horizon
pub const KNOWLEDGE_RETENTION_US: i64 = 86_400_000_000;

/// Default knowledge validity window used by `KnowledgeItem::is_valid`
pub const KNOWLEDGE_VALIDITY_US: i64 = 60_000_000;

/// Finished reasoning steps and actions are kept this long
pub const COMPLETED_RETENTION_US: i64 = 3_600_000_000;

/// Bounded ring of recent cognitive state snapshots
pub const RECENT_STATE_CAP: usize = 100;

/// Interval between worker-side store cleanups
pub const CLEANUP_INTERVAL_US: i64 = 60_000_000;

/// Default interval between periodic reflection ticks
pub const DEFAULT_COGNITIVE_INTERVAL_MS: u64 = 30_000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Vision-Agent";
