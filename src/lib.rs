//! Vision Agent Core
//!
//! Autonomous security-reasoning core for multi-camera vision systems: turns
//! per-frame observations into tracked subjects, verified anomalies,
//! incidents and prioritized response actions, continuously learning what
//! "normal" looks like per camera and hour of day.
//!
//! The host is expected to provide frame acquisition and low-level detection
//! and feed one [`logic::observation::FrameAnalysisResult`] per frame into an
//! [`logic::system::AgentSystem`].

pub mod constants;
pub mod logic;

pub use logic::config::{ConfigService, DeviceConfig, GlobalSettings};
pub use logic::observation::{
    BoundingBox, DetectedObject, FrameAnalysisResult, MotionSummary,
};
pub use logic::system::AgentSystem;
