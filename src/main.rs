//! Vision Agent Demo - Synthetic Feed Driver
//!
//! Replays a scripted observation sequence through the full agent pipeline
//! and prints the resulting status report. Stands in for the host analytics
//! shell during development.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use vision_agent_core::constants::{APP_NAME, APP_VERSION};
use vision_agent_core::logic::config::{ConfigService, GlobalSettings};
use vision_agent_core::{AgentSystem, BoundingBox, DetectedObject, FrameAnalysisResult};

fn unknown_person(track_id: &str, timestamp_us: i64) -> DetectedObject {
    let mut attributes = HashMap::new();
    attributes.insert("recognitionStatus".to_string(), "unknown".to_string());
    DetectedObject {
        type_id: "person".to_string(),
        confidence: 0.92,
        bounding_box: BoundingBox::new(880.0, 420.0, 120.0, 260.0),
        attributes,
        timestamp_us,
        track_id: track_id.to_string(),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{} (demo feed)...", APP_NAME, APP_VERSION);

    let storage = std::env::temp_dir().join("vision-agent-demo");
    let config = ConfigService::new(GlobalSettings {
        data_storage_path: storage,
        ..Default::default()
    });

    let system = AgentSystem::new("demo-site", Arc::clone(&config));

    system.configure_camera(
        "cam-entrance",
        &serde_json::json!({
            "anomalyThreshold": 0.7,
            "unknownVisitorThresholdSecs": 10,
            "position": {"x": 10.0, "y": 0.0, "z": 0.0},
            "name": "Entrance",
            "adjacent_cameras": ["cam-lobby"]
        }),
    );
    system.configure_camera(
        "cam-lobby",
        &serde_json::json!({
            "anomalyThreshold": 0.7,
            "position": {"x": 5.0, "y": 0.0, "z": 0.0},
            "name": "Lobby",
            "adjacent_cameras": ["cam-entrance"]
        }),
    );

    system.set_object_callback(Box::new(|device_id, observation| {
        log::debug!(
            "Object report from {}: {} objects",
            device_id,
            observation.objects.len()
        );
    }));

    system.start();

    let start_us = Utc::now().timestamp_micros();

    // A minute of quiet frames on both cameras
    for i in 0..30i64 {
        let ts = start_us + i * 2_000_000;
        let mut observation = FrameAnalysisResult::new(ts);
        observation.motion.overall_motion_level = 0.01;
        system.process_observation("cam-entrance", &mut observation);

        let mut observation = FrameAnalysisResult::new(ts);
        system.process_observation("cam-lobby", &mut observation);
    }

    // An unknown visitor lingers at the entrance past the dwell threshold
    for i in 0..8i64 {
        let ts = start_us + 60_000_000 + i * 2_000_000;
        let mut observation = FrameAnalysisResult::new(ts);
        observation.motion.overall_motion_level = 0.08;
        observation.objects.push(unknown_person("visitor-1", ts));
        system.process_observation("cam-entrance", &mut observation);
    }

    // Give the cognitive worker a moment to drain its queue
    std::thread::sleep(std::time::Duration::from_millis(500));

    println!("{}", system.status_report());

    for incident in system.strategy().get_active_incidents() {
        println!(
            "Incident {} [{:?}/{:?}]: {}",
            incident.incident_id, incident.incident_type, incident.severity, incident.description
        );
        for action in incident.recommended_actions() {
            println!("  -> {}", action);
        }
    }

    system.stop();
}
