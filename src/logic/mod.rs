//! Core Logic
//!
//! Subsystems in dependency order: observation contracts, configuration,
//! feature encoding, per-camera analysis and anomaly models, the response
//! gate, cross-camera strategy, the cognitive core, and the integrated
//! system wiring.

pub mod observation;
pub mod config;
pub mod features;
pub mod analyzer;
pub mod anomaly;
pub mod response;
pub mod oracle;
pub mod strategy;
pub mod cognitive;
pub mod system;
