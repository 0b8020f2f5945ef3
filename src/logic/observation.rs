//! Observation Model
//!
//! The per-frame contract produced by the external analyzer and consumed by
//! every downstream subsystem. Observations are created once per frame tick
//! and not mutated after the enrichment pass; consumers must tolerate an
//! empty object list and a zero motion level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Center point in pixel coordinates
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Center point normalized against the default frame dimensions.
    /// Proper normalization would need per-device frame sizes; the tracker
    /// only needs relative positions so the default resolution is assumed.
    pub fn normalized_center(&self) -> (f32, f32) {
        let (cx, cy) = self.center();
        (cx / DEFAULT_FRAME_WIDTH, cy / DEFAULT_FRAME_HEIGHT)
    }
}

/// A single detected object with its metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Object type tag ("person", "vehicle", ...)
    pub type_id: String,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    /// Bounding box in pixel coordinates
    pub bounding_box: BoundingBox,
    /// Free-form attributes (e.g. "recognitionStatus" -> "unknown")
    pub attributes: HashMap<String, String>,
    /// Detection timestamp in microseconds
    pub timestamp_us: i64,
    /// Tracking id stable across frames from the same entity
    pub track_id: String,
}

impl DetectedObject {
    pub fn is_person(&self) -> bool {
        self.type_id == "person"
    }

    pub fn is_vehicle(&self) -> bool {
        self.type_id == "vehicle"
    }

    /// Whether the object carries an "unknown" recognition status
    pub fn is_unknown(&self) -> bool {
        self.attributes
            .get("recognitionStatus")
            .map(|s| s == "unknown")
            .unwrap_or(false)
    }
}

/// Motion summary for a frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionSummary {
    /// Overall motion level (0.0-1.0)
    pub overall_motion_level: f32,
    /// Centers of significant motion regions, normalized coordinates
    pub motion_centers: Vec<(f32, f32)>,
    pub timestamp_us: i64,
}

/// Analysis results for a single frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    /// Frame timestamp in microseconds
    pub timestamp_us: i64,
    pub objects: Vec<DetectedObject>,
    pub motion: MotionSummary,
    /// Overall anomaly score (0.0-1.0). Detectors only ever raise this.
    pub anomaly_score: f32,
    /// Anomaly type tag, empty when none
    pub anomaly_type: String,
    /// Human-readable description
    pub anomaly_description: String,
    pub is_anomaly: bool,
}

impl FrameAnalysisResult {
    pub fn new(timestamp_us: i64) -> Self {
        Self {
            timestamp_us,
            ..Default::default()
        }
    }

    pub fn person_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_person()).count()
    }

    pub fn vehicle_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_vehicle()).count()
    }

    pub fn unknown_person_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.is_person() && o.is_unknown())
            .count()
    }

    /// Raise the anomaly score, never lower it
    pub fn raise_score(&mut self, score: f32) {
        if score > self.anomaly_score {
            self.anomaly_score = score;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_score_is_monotonic() {
        let mut result = FrameAnalysisResult::new(0);
        result.raise_score(0.6);
        result.raise_score(0.3);
        assert_eq!(result.anomaly_score, 0.6);
        result.raise_score(0.9);
        assert_eq!(result.anomaly_score, 0.9);
    }

    #[test]
    fn test_object_counts() {
        let mut result = FrameAnalysisResult::new(0);
        let mut person = DetectedObject {
            type_id: "person".into(),
            ..Default::default()
        };
        person
            .attributes
            .insert("recognitionStatus".into(), "unknown".into());
        result.objects.push(person);
        result.objects.push(DetectedObject {
            type_id: "vehicle".into(),
            ..Default::default()
        });

        assert_eq!(result.person_count(), 1);
        assert_eq!(result.vehicle_count(), 1);
        assert_eq!(result.unknown_person_count(), 1);
    }

    #[test]
    fn test_normalized_center() {
        let bb = BoundingBox::new(900.0, 500.0, 120.0, 80.0);
        let (nx, ny) = bb.normalized_center();
        assert!((nx - 0.5).abs() < 0.01);
        assert!((ny - 0.5).abs() < 0.01);
    }
}
