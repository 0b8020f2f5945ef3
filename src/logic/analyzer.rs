//! Frame Analyzer
//!
//! Enriches raw observations from the external detector before scoring:
//! heuristic scene-activity weighting, unknown-visitor persistence tracking
//! and rule-based anomaly labelling. Low-level detection itself is a black
//! box; this module only works with the observation record.

use std::collections::HashMap;

use chrono::Timelike;
use parking_lot::Mutex;

use super::config::DeviceConfig;
use super::features::timestamp_to_datetime;
use super::observation::FrameAnalysisResult;

/// Motion above this level alone counts as abnormal activity
const HIGH_MOTION_LEVEL: f32 = 0.2;

pub struct FrameAnalyzer {
    device_id: String,
    config: Mutex<DeviceConfig>,
    /// First-seen timestamps for unknown persons, keyed by track id
    unknown_tracks: Mutex<HashMap<String, i64>>,
}

impl FrameAnalyzer {
    pub fn new(device_id: &str, config: DeviceConfig) -> Self {
        Self {
            device_id: device_id.to_string(),
            config: Mutex::new(config),
            unknown_tracks: Mutex::new(HashMap::new()),
        }
    }

    pub fn configure(&self, config: DeviceConfig) {
        *self.config.lock() = config;
    }

    /// Motion threshold derived from the device sensitivity
    fn motion_threshold(config: &DeviceConfig) -> f32 {
        0.01 + (1.0 - config.anomaly_threshold) * 0.1
    }

    /// Enrich an observation in place. Sets the heuristic anomaly score and,
    /// when a rule fires, the anomaly type/description and flag.
    pub fn process(&self, result: &mut FrameAnalysisResult) {
        let config = self.config.lock().clone();

        let heuristic = self.heuristic_score(result, &config);
        result.raise_score(heuristic);

        let unknown_visitor = self.detect_unknown_visitors(result, &config);
        let abnormal_activity = self.detect_abnormal_activity(result, &config);

        if unknown_visitor || abnormal_activity || result.anomaly_score > config.anomaly_threshold
        {
            result.is_anomaly = true;
        }

        if unknown_visitor {
            result.anomaly_type = "UnknownVisitor".to_string();
            result.anomaly_description =
                "Unknown visitor detected for extended period".to_string();
        } else if abnormal_activity {
            result.anomaly_type = "AbnormalActivity".to_string();
            result.anomaly_description = "Unusual activity pattern detected".to_string();
        } else if result.is_anomaly && result.anomaly_type.is_empty() {
            result.anomaly_type = "GeneralAnomaly".to_string();
            result.anomaly_description = "General unusual activity detected".to_string();
        }
    }

    /// Simple additive activity heuristic, capped at 1.0
    fn heuristic_score(&self, result: &FrameAnalysisResult, config: &DeviceConfig) -> f32 {
        let mut score = 0.0f32;

        let motion = result.motion.overall_motion_level;
        if motion > Self::motion_threshold(config) {
            score += motion * 0.5;
        }

        let time = timestamp_to_datetime(result.timestamp_us);
        let seconds_of_day = time.num_seconds_from_midnight() as i32;
        let business_hours = config.is_business_hours(seconds_of_day);

        let person_count = result.person_count() as f32;
        let vehicle_count = result.vehicle_count() as f32;

        if business_hours {
            // During business hours only unknown persons are somewhat unusual
            score += result.unknown_person_count() as f32 * 0.05;
        } else {
            score += person_count * 0.15;
            score += vehicle_count * 0.1;

            // Any after-hours presence or motion is suspicious in itself
            if person_count > 0.0 || motion > 0.05 {
                score += 0.3 + motion;
            }
        }

        score.min(1.0)
    }

    /// Track unknown persons across frames; fires once their presence
    /// exceeds the configured dwell threshold.
    fn detect_unknown_visitors(
        &self,
        result: &mut FrameAnalysisResult,
        config: &DeviceConfig,
    ) -> bool {
        if !config.enable_unknown_visitor_detection {
            return false;
        }

        let now_us = result.timestamp_us;
        let mut tracks = self.unknown_tracks.lock();
        let mut detected = false;

        for obj in result.objects.iter_mut() {
            if !obj.is_person() || obj.track_id.is_empty() || !obj.is_unknown() {
                continue;
            }

            let first_seen = *tracks.entry(obj.track_id.clone()).or_insert(now_us);
            let duration_secs = (now_us - first_seen) / 1_000_000;

            if duration_secs > config.unknown_visitor_threshold_secs {
                detected = true;
                obj.attributes
                    .insert("durationSecs".to_string(), duration_secs.to_string());
            }
        }

        // Drop tracking for persons no longer in the frame
        tracks.retain(|track_id, _| result.objects.iter().any(|o| &o.track_id == track_id));

        if detected {
            log::debug!("Unknown visitor persisting on camera {}", self.device_id);
        }

        detected
    }

    /// Rule-based activity anomaly: sustained high motion
    fn detect_abnormal_activity(
        &self,
        result: &FrameAnalysisResult,
        config: &DeviceConfig,
    ) -> bool {
        if !config.enable_activity_analysis {
            return false;
        }

        result.motion.overall_motion_level > HIGH_MOTION_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::observation::DetectedObject;
    use chrono::{TimeZone, Utc};

    fn config() -> DeviceConfig {
        DeviceConfig::new("cam-1")
    }

    fn observation_at(hour: u32, sec: u32) -> FrameAnalysisResult {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 6, hour, 0, sec)
            .unwrap()
            .timestamp_micros();
        FrameAnalysisResult::new(ts)
    }

    fn unknown_person(track_id: &str) -> DetectedObject {
        let mut obj = DetectedObject {
            type_id: "person".into(),
            track_id: track_id.into(),
            confidence: 0.9,
            ..Default::default()
        };
        obj.attributes
            .insert("recognitionStatus".into(), "unknown".into());
        obj
    }

    #[test]
    fn test_quiet_business_hours_frame_is_normal() {
        let analyzer = FrameAnalyzer::new("cam-1", config());
        let mut result = observation_at(10, 0);
        result.motion.overall_motion_level = 0.01;

        analyzer.process(&mut result);
        assert!(!result.is_anomaly);
        assert!(result.anomaly_type.is_empty());
    }

    #[test]
    fn test_after_hours_presence_is_flagged() {
        let analyzer = FrameAnalyzer::new("cam-1", config());
        let mut result = observation_at(2, 0);
        result.motion.overall_motion_level = 0.3;
        result.objects.push(unknown_person("p1"));

        analyzer.process(&mut result);
        assert!(result.is_anomaly);
        assert!(result.anomaly_score > 0.7);
    }

    #[test]
    fn test_high_motion_labels_abnormal_activity() {
        let analyzer = FrameAnalyzer::new("cam-1", config());
        let mut result = observation_at(10, 0);
        result.motion.overall_motion_level = 0.5;

        analyzer.process(&mut result);
        assert!(result.is_anomaly);
        assert_eq!(result.anomaly_type, "AbnormalActivity");
    }

    #[test]
    fn test_unknown_visitor_fires_only_past_threshold() {
        // Scenario C: the anomaly appears on the frame crossing the
        // threshold, not before
        let mut cfg = config();
        cfg.unknown_visitor_threshold_secs = 10;
        let analyzer = FrameAnalyzer::new("cam-1", cfg);

        for sec in 0..=10u32 {
            let mut result = observation_at(10, sec);
            result.objects.push(unknown_person("p1"));
            analyzer.process(&mut result);
            assert_ne!(
                result.anomaly_type, "UnknownVisitor",
                "fired too early at {}s",
                sec
            );
        }

        let mut result = observation_at(10, 11);
        result.objects.push(unknown_person("p1"));
        analyzer.process(&mut result);
        assert!(result.is_anomaly);
        assert_eq!(result.anomaly_type, "UnknownVisitor");
        assert_eq!(
            result.objects[0].attributes.get("durationSecs"),
            Some(&"11".to_string())
        );
    }

    #[test]
    fn test_unknown_visitor_track_resets_when_absent() {
        let mut cfg = config();
        cfg.unknown_visitor_threshold_secs = 5;
        let analyzer = FrameAnalyzer::new("cam-1", cfg);

        let mut result = observation_at(10, 0);
        result.objects.push(unknown_person("p1"));
        analyzer.process(&mut result);

        // Person leaves the frame; tracking for the id is dropped
        let mut empty = observation_at(10, 3);
        analyzer.process(&mut empty);

        // Reappearing starts a fresh dwell window
        let mut result = observation_at(10, 8);
        result.objects.push(unknown_person("p1"));
        analyzer.process(&mut result);
        assert_ne!(result.anomaly_type, "UnknownVisitor");
    }

    #[test]
    fn test_unknown_visitor_detection_can_be_disabled() {
        let mut cfg = config();
        cfg.enable_unknown_visitor_detection = false;
        cfg.unknown_visitor_threshold_secs = 1;
        let analyzer = FrameAnalyzer::new("cam-1", cfg);

        for sec in [0, 10, 20] {
            let mut result = observation_at(10, sec);
            result.objects.push(unknown_person("p1"));
            analyzer.process(&mut result);
            assert_ne!(result.anomaly_type, "UnknownVisitor");
        }
    }
}
