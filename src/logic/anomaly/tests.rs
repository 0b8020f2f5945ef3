use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::AnomalyDetector;
use crate::constants::BASELINE_TRAIN_BATCH;
use crate::logic::config::{ConfigService, GlobalSettings};
use crate::logic::observation::{DetectedObject, FrameAnalysisResult};

fn test_service(dir: &std::path::Path) -> Arc<ConfigService> {
    let settings = GlobalSettings {
        data_storage_path: dir.to_path_buf(),
        ..Default::default()
    };
    ConfigService::new(settings)
}

fn observation(hour: u32, minute: u32, motion: f32, persons: usize) -> FrameAnalysisResult {
    let ts = Utc
        .with_ymd_and_hms(2024, 3, 6, hour, minute, 0)
        .unwrap()
        .timestamp_micros();
    let mut result = FrameAnalysisResult::new(ts);
    result.motion.overall_motion_level = motion;
    for i in 0..persons {
        let mut obj = DetectedObject {
            type_id: "person".into(),
            track_id: format!("p{}", i),
            timestamp_us: ts,
            ..Default::default()
        };
        obj.attributes
            .insert("recognitionStatus".into(), "unknown".into());
        result.objects.push(obj);
    }
    result
}

#[test]
fn test_untrained_hours_report_not_anomalous() {
    let dir = tempfile::tempdir().unwrap();
    let detector = AnomalyDetector::new("cam-1", test_service(dir.path()));

    for hour in 0..24 {
        let mut result = observation(hour, 0, 0.9, 8);
        assert!(!detector.detect_anomaly(&mut result));
        assert!(!result.is_anomaly);
    }
}

#[test]
fn test_quiet_baseline_scores_identical_vector_low() {
    // Scenario A: 100 hour-14 samples with motion around 0.02 and no people
    let dir = tempfile::tempdir().unwrap();
    let detector = AnomalyDetector::new("cam-1", test_service(dir.path()));

    for i in 0..BASELINE_TRAIN_BATCH {
        let jitter = (i % 5) as f32 * 0.002;
        detector.add_to_baseline(&observation(14, (i % 60) as u32, 0.02 + jitter, 0));
    }
    assert!(detector.is_trained(14));

    let mut result = observation(14, 30, 0.02, 0);
    let flagged = detector.detect_anomaly(&mut result);
    assert!(!flagged);
    assert!(result.anomaly_score < 0.7);
}

#[test]
fn test_crowd_at_night_encoding_scores_high() {
    // Scenario B: same hour-14 model, deviant vector
    let dir = tempfile::tempdir().unwrap();
    let detector = AnomalyDetector::new("cam-1", test_service(dir.path()));

    for i in 0..BASELINE_TRAIN_BATCH {
        let jitter = (i % 5) as f32 * 0.002;
        detector.add_to_baseline(&observation(14, (i % 60) as u32, 0.02 + jitter, 0));
    }

    let mut result = observation(14, 30, 0.4, 5);
    let flagged = detector.detect_anomaly(&mut result);
    assert!(flagged);
    assert!(result.is_anomaly);
    assert!(result.anomaly_score > 0.7);
    assert_eq!(result.anomaly_type, "StatisticalAnomaly");
}

#[test]
fn test_existing_anomaly_type_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let detector = AnomalyDetector::new("cam-1", test_service(dir.path()));

    for i in 0..BASELINE_TRAIN_BATCH {
        detector.add_to_baseline(&observation(14, (i % 60) as u32, 0.02, 0));
    }

    let mut result = observation(14, 30, 0.5, 6);
    result.anomaly_type = "UnknownVisitor".to_string();
    detector.detect_anomaly(&mut result);
    assert_eq!(result.anomaly_type, "UnknownVisitor");
}

#[test]
fn test_reset_baseline_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let detector = AnomalyDetector::new("cam-1", test_service(dir.path()));

    for i in 0..BASELINE_TRAIN_BATCH {
        detector.add_to_baseline(&observation(9, (i % 60) as u32, 0.02, 0));
    }
    assert!(detector.is_trained(9));

    detector.reset_baseline();
    detector.reset_baseline();
    assert!(!detector.is_trained(9));
    assert_eq!(detector.baseline_len(9), 0);

    let mut result = observation(9, 10, 0.9, 5);
    assert!(!detector.detect_anomaly(&mut result));
}

#[test]
fn test_models_persist_across_detector_instances() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(dir.path());

    {
        let detector = AnomalyDetector::new("cam-1", Arc::clone(&service));
        for i in 0..BASELINE_TRAIN_BATCH {
            detector.add_to_baseline(&observation(14, (i % 60) as u32, 0.02, 0));
        }
        assert!(detector.save_models());
    }

    let reloaded = AnomalyDetector::new("cam-1", service);
    assert!(reloaded.is_trained(14));
    assert!(!reloaded.is_trained(3));

    let mut result = observation(14, 30, 0.4, 5);
    assert!(reloaded.detect_anomaly(&mut result));
}

#[test]
fn test_set_threshold_clamps_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(dir.path());
    let detector = AnomalyDetector::new("cam-1", Arc::clone(&service));

    detector.set_threshold(1.7);
    assert_eq!(detector.threshold(), 1.0);
    assert_eq!(service.device("cam-1").anomaly_threshold, 1.0);

    detector.set_threshold(-0.2);
    assert_eq!(detector.threshold(), 0.0);
}

#[test]
fn test_learning_disabled_skips_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(dir.path());
    let mut config = service.device("cam-1");
    config.enable_learning = false;
    service.update_device(config.clone());

    let detector = AnomalyDetector::new("cam-1", service);
    detector.configure(config);

    for i in 0..BASELINE_TRAIN_BATCH {
        detector.add_to_baseline(&observation(14, (i % 60) as u32, 0.02, 0));
    }
    assert_eq!(detector.baseline_len(14), 0);
    assert!(!detector.is_trained(14));
}
