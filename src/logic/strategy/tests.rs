use chrono::{Duration, Utc};

use super::*;
use crate::logic::observation::{BoundingBox, DetectedObject, FrameAnalysisResult};

fn manager() -> StrategyManager {
    StrategyManager::new("test-system", None)
}

fn person(track_id: &str) -> DetectedObject {
    DetectedObject {
        type_id: "person".into(),
        track_id: track_id.into(),
        confidence: 0.9,
        bounding_box: BoundingBox::new(900.0, 500.0, 100.0, 100.0),
        ..Default::default()
    }
}

fn anomalous_observation(score: f32, anomaly_type: &str) -> FrameAnalysisResult {
    let mut result = FrameAnalysisResult::new(Utc::now().timestamp_micros());
    result.anomaly_score = score;
    result.anomaly_type = anomaly_type.into();
    result.anomaly_description = format!("{} detected", anomaly_type);
    result.is_anomaly = true;
    result
}

#[test]
fn test_subject_created_and_matched_by_track_id() {
    let mgr = manager();

    assert!(mgr.update_tracked_subject("cam-a", &person("p1")));
    assert!(mgr.update_tracked_subject("cam-a", &person("p1")));
    assert!(mgr.update_tracked_subject("cam-b", &person("p2")));

    let subjects = mgr.get_tracked_subjects();
    assert_eq!(subjects.len(), 2);

    let p1 = subjects.iter().find(|s| s.track_id == "p1").unwrap();
    assert_eq!(p1.position_history.len(), 2);
}

#[test]
fn test_new_track_id_is_a_new_subject() {
    // Tracking-id-only matching: an id change means a new subject
    let mgr = manager();
    mgr.update_tracked_subject("cam-a", &person("p1"));
    mgr.update_tracked_subject("cam-a", &person("p1-reborn"));
    assert_eq!(mgr.get_tracked_subjects().len(), 2);
}

#[test]
fn test_non_person_vehicle_objects_ignored() {
    let mgr = manager();
    let obj = DetectedObject {
        type_id: "animal".into(),
        track_id: "a1".into(),
        ..Default::default()
    };
    assert!(!mgr.update_tracked_subject("cam-a", &obj));
    assert!(mgr.get_tracked_subjects().is_empty());
}

#[test]
fn test_anomaly_opens_incident_and_plan() {
    let mgr = manager();
    mgr.process_analysis_result("cam-a", &anomalous_observation(0.9, "Intrusion"));

    let incidents = mgr.get_active_incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].incident_type, IncidentType::Intrusion);
    assert_eq!(incidents[0].severity, IncidentSeverity::Critical);
    assert_eq!(incidents[0].primary_camera_id, "cam-a");

    let plans = mgr.get_active_plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].incident_id, incidents[0].incident_id);
    assert!(!plans[0].actions.is_empty());
    assert_eq!(plans[0].monitoring_strategies.len(), 1);
}

#[test]
fn test_severity_buckets() {
    let mgr = manager();
    for (score, severity) in [
        (0.9, IncidentSeverity::Critical),
        (0.75, IncidentSeverity::High),
        (0.6, IncidentSeverity::Medium),
        (0.3, IncidentSeverity::Low),
    ] {
        mgr.process_analysis_result("cam-a", &anomalous_observation(score, "Loitering"));
        let incidents = mgr.get_active_incidents();
        assert!(
            incidents.iter().any(|i| i.severity == severity),
            "missing severity {:?} for score {}",
            severity,
            score
        );
    }
}

#[test]
fn test_plan_watches_primary_and_adjacent_cameras() {
    let mgr = manager();
    let mut cam_a = CameraInfo::new("cam-a");
    cam_a.adjacent_cameras.insert("cam-b".into());
    mgr.register_camera(cam_a);
    mgr.register_camera(CameraInfo::new("cam-b"));

    mgr.create_incident(
        IncidentType::Intrusion,
        IncidentSeverity::High,
        "cam-a",
        "perimeter breach",
    );

    let plans = mgr.get_active_plans();
    let strategy = &plans[0].monitoring_strategies[0];
    assert!(strategy.camera_ids.contains("cam-a"));
    assert!(strategy.camera_ids.contains("cam-b"));
    assert_eq!(strategy.monitoring_type, MonitoringType::Active);
    assert!(strategy.enable_prediction);
}

#[test]
fn test_fallback_plan_priorities_descend() {
    let mgr = manager();
    mgr.create_incident(
        IncidentType::Intrusion,
        IncidentSeverity::Low,
        "cam-a",
        "test",
    );

    let plans = mgr.get_active_plans();
    let priorities: Vec<i32> = plans[0].actions.iter().map(|a| a.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(priorities, sorted);
    assert_eq!(priorities[0], 10);
}

#[test]
fn test_resolving_incident_completes_plans() {
    let mgr = manager();
    let incident_id = mgr.create_incident(
        IncidentType::Loitering,
        IncidentSeverity::Medium,
        "cam-a",
        "test",
    );
    assert_eq!(mgr.get_active_plans().len(), 1);

    assert!(mgr.update_incident(&incident_id, IncidentStatus::Resolved, "operator"));
    assert!(mgr.get_active_incidents().is_empty());
    assert!(mgr.get_active_plans().is_empty());
}

#[test]
fn test_idle_subject_dropped_on_cleanup() {
    let mgr = manager();
    mgr.update_tracked_subject("cam-a", &person("p1"));
    assert_eq!(mgr.get_tracked_subjects().len(), 1);

    mgr.cleanup_old_data(Utc::now() + Duration::minutes(11));
    assert!(mgr.get_tracked_subjects().is_empty());
}

#[test]
fn test_stale_incident_auto_resolved() {
    let mgr = manager();
    mgr.create_incident(
        IncidentType::SuspiciousBehavior,
        IncidentSeverity::Low,
        "cam-a",
        "test",
    );

    mgr.cleanup_old_data(Utc::now() + Duration::minutes(31));
    assert!(mgr.get_active_incidents().is_empty());

    let incidents = mgr.incidents.lock();
    let incident = incidents.values().next().unwrap();
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert!(incident
        .response_log
        .iter()
        .any(|a| a.initiated_by == "system_timeout"));
}

#[test]
fn test_old_inactive_plans_dropped() {
    let mgr = manager();
    let incident_id = mgr.create_incident(
        IncidentType::Loitering,
        IncidentSeverity::Low,
        "cam-a",
        "test",
    );
    mgr.update_incident(&incident_id, IncidentStatus::FalseAlarm, "operator");

    // Completed plan older than a day is swept; a fresh one is not
    mgr.cleanup_old_data(Utc::now() + Duration::hours(25));
    assert!(mgr.plans.lock().is_empty());
}

#[test]
fn test_recommended_camera_preference_order() {
    let mgr = manager();
    assert!(mgr.get_recommended_camera().is_none());

    let mut inactive = CameraInfo::new("cam-idle");
    inactive.is_active = false;
    mgr.register_camera(inactive);
    mgr.register_camera(CameraInfo::new("cam-live"));
    assert_eq!(mgr.get_recommended_camera().as_deref(), Some("cam-live"));

    mgr.update_tracked_subject("cam-b", &person("p1"));
    assert_eq!(mgr.get_recommended_camera().as_deref(), Some("cam-b"));

    mgr.create_incident(
        IncidentType::Intrusion,
        IncidentSeverity::Critical,
        "cam-c",
        "breach",
    );
    assert_eq!(mgr.get_recommended_camera().as_deref(), Some("cam-c"));
}

#[test]
fn test_incident_association_boosts_threat_score() {
    let mgr = manager();
    mgr.update_tracked_subject("cam-a", &person("p1"));
    let incident_id = mgr.create_incident(
        IncidentType::Intrusion,
        IncidentSeverity::Critical,
        "cam-a",
        "breach",
    );
    assert!(mgr.link_subject_to_incident(&incident_id, "p1"));

    let subject = mgr
        .get_tracked_subjects()
        .into_iter()
        .find(|s| s.track_id == "p1")
        .unwrap();
    let boosted = mgr.calculate_threat_score(&subject);
    assert!((boosted - (subject.threat_score + 0.3)).abs() < 1e-6);
}

#[test]
fn test_predict_subject_position() {
    let mgr = manager();
    assert!(mgr.predict_subject_position("nobody", 5.0).is_none());

    mgr.update_tracked_subject("cam-a", &person("p1"));
    let predicted = mgr.predict_subject_position("p1", 5.0).unwrap();
    // Single sighting: prediction is the last known position
    assert_eq!(predicted.camera_id, "cam-a");
    assert!((predicted.normalized_position.0 - 0.49).abs() < 0.02);
}

#[test]
fn test_situation_report_fallback_lists_state() {
    let mgr = manager();
    mgr.update_tracked_subject("cam-a", &person("p1"));
    mgr.create_incident(
        IncidentType::Intrusion,
        IncidentSeverity::High,
        "cam-a",
        "perimeter breach",
    );

    let report = mgr.generate_situation_report();
    assert!(report.contains("Active incidents: 1"));
    assert!(report.contains("perimeter breach"));
    assert!(report.contains("p1"));
}

#[test]
fn test_configure_registers_cameras_from_json() {
    let mgr = manager();
    mgr.configure(&serde_json::json!({
        "cameras": [
            {
                "device_id": "cam-a",
                "name": "Entrance",
                "position": {"x": 0.0, "y": 0.0, "z": 0.0},
                "adjacent_cameras": ["cam-b"]
            },
            { "device_id": "cam-b" }
        ]
    }));

    assert_eq!(mgr.adjacent_cameras("cam-a"), vec!["cam-b".to_string()]);
    assert!(mgr.adjacent_cameras("cam-b").is_empty());
}
