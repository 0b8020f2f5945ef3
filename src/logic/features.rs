//! Feature Vectors
//!
//! Fixed-layout numeric encoding of an observation for the statistical
//! anomaly models. The layout is versioned and carries a CRC32 hash so
//! persisted models from an older layout are rejected on load instead of
//! silently scoring against the wrong columns.
//!
//! Rules: adding, removing or reordering a feature requires bumping
//! `FEATURE_VERSION`.

use chrono::{DateTime, Datelike, Timelike, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::observation::FrameAnalysisResult;

// ============================================================================
// LAYOUT
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in the exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    "time_of_day",          // 0: seconds since midnight / 86400
    "day_of_week",          // 1: weekday (Sunday=0) / 7
    "motion_level",         // 2: overall motion level
    "person_count",         // 3: persons in frame
    "vehicle_count",        // 4: vehicles in frame
    "unknown_person_ratio", // 5: unknown persons / max(1, persons)
];

/// Total number of features. Must match FEATURE_LAYOUT.len().
pub const FEATURE_COUNT: usize = 6;

/// CRC32 hash over the versioned layout, used for compatibility checks
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Error when persisted feature data does not match the current layout
#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Validate that incoming data matches the current layout
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let current = layout_hash();
    if version != FEATURE_VERSION || hash != current {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current,
            actual_version: version,
            actual_hash: hash,
        });
    }
    Ok(())
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Versioned feature vector in FEATURE_LAYOUT order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Deterministic encoding of an observation. The hour slicing and the
    /// decode path both assume this exact layout.
    pub fn encode(result: &FrameAnalysisResult) -> Self {
        let time = timestamp_to_datetime(result.timestamp_us);
        let seconds_of_day = time.num_seconds_from_midnight() as f32;
        let day_of_week = time.weekday().num_days_from_sunday() as f32;

        let person_count = result.person_count();
        let unknown_ratio =
            result.unknown_person_count() as f32 / person_count.max(1) as f32;

        Self::from_values([
            seconds_of_day / 86_400.0,
            day_of_week / 7.0,
            result.motion.overall_motion_level,
            person_count as f32,
            result.vehicle_count() as f32,
            unknown_ratio,
        ])
    }

    /// Reverse of `encode` for the time/count fields
    pub fn decode(&self) -> DecodedFeatures {
        DecodedFeatures {
            seconds_of_day: (self.values[0] * 86_400.0).round() as i32,
            day_of_week: (self.values[1] * 7.0).round() as i32,
            motion_level: self.values[2],
            person_count: self.values[3].round() as i32,
            vehicle_count: self.values[4].round() as i32,
            unknown_person_ratio: self.values[5],
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_LAYOUT
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }

    pub fn is_compatible(&self) -> bool {
        validate_layout(self.version, self.layout_hash).is_ok()
    }
}

/// Human-meaningful view of an encoded vector
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFeatures {
    pub seconds_of_day: i32,
    pub day_of_week: i32,
    pub motion_level: f32,
    pub person_count: i32,
    pub vehicle_count: i32,
    pub unknown_person_ratio: f32,
}

/// Local hour of day for a microsecond timestamp
pub fn hour_of_day(timestamp_us: i64) -> usize {
    timestamp_to_datetime(timestamp_us).hour() as usize
}

pub fn timestamp_to_datetime(timestamp_us: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_micros(timestamp_us).unwrap_or_else(Utc::now)
}

/// Current time in microseconds since epoch
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

// ============================================================================
// TESTS
// ============================================================================
