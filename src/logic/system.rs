//! Integrated Agent System
//!
//! Wires the per-camera components (analyzer, detector, response gate) to the
//! shared strategy manager and cognitive core, and drives the periodic
//! reflection tick. The host feeds observations in through
//! `process_observation`; everything downstream of that call is this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::constants::DEFAULT_COGNITIVE_INTERVAL_MS;
use crate::logic::analyzer::FrameAnalyzer;
use crate::logic::anomaly::AnomalyDetector;
use crate::logic::cognitive::{CognitiveSystem, GoalPriority, GoalType, KnowledgeItem};
use crate::logic::config::ConfigService;
use crate::logic::observation::FrameAnalysisResult;
use crate::logic::oracle::{ContextItem, ContextStore, OracleManager};
use crate::logic::response::ResponseGate;
use crate::logic::strategy::{CameraInfo, StrategyManager};

pub type ObjectCallback = Box<dyn Fn(&str, &FrameAnalysisResult) + Send + Sync>;

struct CameraComponents {
    analyzer: Arc<FrameAnalyzer>,
    detector: Arc<AnomalyDetector>,
    gate: Arc<ResponseGate>,
}

pub struct AgentSystem {
    system_id: String,
    config: Arc<ConfigService>,
    oracle: Option<Arc<OracleManager>>,
    context: Arc<ContextStore>,
    strategy: Arc<StrategyManager>,
    cognitive: Arc<CognitiveSystem>,

    cameras: Mutex<HashMap<String, Arc<CameraComponents>>>,
    object_callback: Mutex<Option<Arc<ObjectCallback>>>,

    cognitive_interval: Duration,
    running: Arc<AtomicBool>,
    ticker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl AgentSystem {
    pub fn new(system_id: &str, config: Arc<ConfigService>) -> Arc<Self> {
        let settings = config.global();

        let oracle = if settings.enable_oracle && !settings.oracle_api_key.is_empty() {
            log::info!("Reasoning oracle enabled (model: {})", settings.oracle_model);
            Some(Arc::new(OracleManager::new(&settings)))
        } else {
            log::info!("Reasoning oracle not configured - using rule-based fallbacks");
            None
        };

        let strategy = Arc::new(StrategyManager::new(system_id, oracle.clone()));
        let cognitive = Arc::new(CognitiveSystem::new(
            system_id,
            oracle.clone(),
            Arc::clone(&strategy),
        ));

        Arc::new(Self {
            system_id: system_id.to_string(),
            config,
            oracle,
            context: Arc::new(ContextStore::new()),
            strategy,
            cognitive,
            cameras: Mutex::new(HashMap::new()),
            object_callback: Mutex::new(None),
            cognitive_interval: Duration::from_millis(DEFAULT_COGNITIVE_INTERVAL_MS),
            running: Arc::new(AtomicBool::new(false)),
            ticker: Mutex::new(None),
        })
    }

    pub fn strategy(&self) -> &Arc<StrategyManager> {
        &self.strategy
    }

    pub fn cognitive(&self) -> &Arc<CognitiveSystem> {
        &self.cognitive
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    /// Callback invoked once per frame when objects are present
    pub fn set_object_callback(&self, callback: ObjectCallback) {
        *self.object_callback.lock() = Some(Arc::new(callback));
    }

    /// Run the full per-frame path for one observation. Safe to call
    /// concurrently from multiple camera pipelines.
    pub fn process_observation(&self, device_id: &str, observation: &mut FrameAnalysisResult) {
        let components = self.components_for(device_id);

        // Enrich, then score against the learned baseline
        components.analyzer.process(observation);
        let anomaly_detected = components.detector.detect_anomaly(observation);

        // Verification gate; responses fire at most once per occurrence
        if observation.is_anomaly && components.gate.process_anomaly(observation) {
            log::info!(
                "Anomaly verified and response triggered on camera {}",
                device_id
            );
        }

        self.context.add(ContextItem::from_analysis_result(observation));

        if !observation.objects.is_empty() {
            let callback = self.object_callback.lock().clone();
            if let Some(callback) = callback {
                (callback.as_ref())(device_id, observation);
            }
        }

        self.strategy.process_analysis_result(device_id, observation);
        self.cognitive.process_analysis_result(device_id, observation);

        // Normal frames feed the baseline while learning is enabled
        let device_config = self.config.device(device_id);
        if device_config.enable_learning && !observation.is_anomaly {
            components.detector.add_to_baseline(observation);
        }

        if anomaly_detected {
            log::debug!(
                "Statistical anomaly on camera {} (score {:.2})",
                device_id,
                observation.anomaly_score
            );
        }
    }

    /// Apply JSON settings to a camera and register its topology
    pub fn configure_camera(&self, device_id: &str, settings: &serde_json::Value) {
        let mut device_config = self.config.device(device_id);
        device_config.apply_settings(settings);
        self.config.update_device(device_config.clone());

        {
            let cameras = self.cameras.lock();
            if let Some(components) = cameras.get(device_id) {
                components.analyzer.configure(device_config.clone());
                components.detector.configure(device_config.clone());
            }
        }

        if settings.get("position").is_some() {
            match serde_json::from_value::<CameraInfo>(settings.clone()) {
                Ok(mut camera) => {
                    camera.device_id = device_id.to_string();
                    self.strategy.register_camera(camera);
                }
                Err(e) => log::warn!("Camera topology for {} not registered: {}", device_id, e),
            }
        }

        log::info!("Camera {} configured", device_id);
    }

    /// Start the periodic reflection ticker
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = Arc::clone(&self.running);
        let cognitive = Arc::clone(&self.cognitive);
        let interval = self.cognitive_interval;

        let handle = thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                cognitive.execute_cognitive_cycle();

                // Sleep in short slices so stop() is responsive
                let mut remaining = interval;
                while running.load(Ordering::SeqCst) && remaining > Duration::ZERO {
                    let slice = remaining.min(Duration::from_millis(200));
                    thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
            }
        });

        *self.ticker.lock() = Some(handle);
        log::info!("Agent system {} started", self.system_id);
    }

    /// Stop the ticker and quiesce the cognitive worker
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.ticker.lock().take() {
            let _ = handle.join();
        }
        self.cognitive.shutdown();
        if let Some(oracle) = self.oracle.as_ref() {
            oracle.shutdown();
        }
        log::info!("Agent system {} stopped", self.system_id);
    }

    pub fn add_goal(&self, description: &str, priority: i32) -> String {
        self.cognitive
            .add_goal(GoalType::Monitor, description, convert_priority(priority))
    }

    pub fn query_knowledge(&self, query: &str) -> Vec<KnowledgeItem> {
        self.cognitive.query_knowledge(query, 10)
    }

    /// Aggregated status text for operators
    pub fn status_report(&self) -> String {
        let mut report = String::new();
        report.push_str("Agent System Status Report\n");
        report.push_str("==========================\n\n");
        report.push_str(&format!("System ID: {}\n\n", self.system_id));

        report.push_str("Cameras:\n");
        {
            let cameras = self.cameras.lock();
            let mut ids: Vec<&String> = cameras.keys().collect();
            ids.sort();
            for device_id in ids {
                report.push_str(&format!("- {}\n", device_id));
            }
        }
        report.push('\n');

        report.push_str("Cognitive Status:\n");
        report.push_str(&self.cognitive.generate_cognitive_status());
        report.push('\n');

        report.push_str("Security Situation:\n");
        report.push_str(&self.strategy.generate_situation_report());

        report
    }

    fn components_for(&self, device_id: &str) -> Arc<CameraComponents> {
        let mut cameras = self.cameras.lock();
        if let Some(components) = cameras.get(device_id) {
            return Arc::clone(components);
        }

        let device_config = self.config.device(device_id);
        let analyzer = Arc::new(FrameAnalyzer::new(device_id, device_config));
        let detector = Arc::new(AnomalyDetector::new(device_id, Arc::clone(&self.config)));
        let gate = Arc::new(ResponseGate::new(device_id));

        // The gate's event output is the cognitive core's anomaly entry point
        let cognitive = Arc::clone(&self.cognitive);
        let event_device = device_id.to_string();
        gate.set_event_callback(Box::new(move |result| {
            cognitive.process_analysis_result(&event_device, result);
        }));

        let components = Arc::new(CameraComponents {
            analyzer,
            detector,
            gate,
        });
        cameras.insert(device_id.to_string(), Arc::clone(&components));
        components
    }
}

impl Drop for AgentSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

fn convert_priority(priority: i32) -> GoalPriority {
    match priority {
        p if p >= 9 => GoalPriority::Critical,
        p if p >= 7 => GoalPriority::High,
        p if p >= 4 => GoalPriority::Medium,
        p if p >= 2 => GoalPriority::Low,
        _ => GoalPriority::Background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::GlobalSettings;
    use crate::logic::observation::{BoundingBox, DetectedObject};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    fn test_system(dir: &std::path::Path) -> Arc<AgentSystem> {
        let settings = GlobalSettings {
            data_storage_path: dir.to_path_buf(),
            ..Default::default()
        };
        AgentSystem::new("test-system", ConfigService::new(settings))
    }

    fn observation_at(hour: u32, motion: f32) -> FrameAnalysisResult {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 6, hour, 15, 0)
            .unwrap()
            .timestamp_micros();
        let mut result = FrameAnalysisResult::new(ts);
        result.motion.overall_motion_level = motion;
        result
    }

    #[test]
    fn test_quiet_frame_flows_through_without_incident() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());

        let mut observation = observation_at(10, 0.01);
        system.process_observation("cam-a", &mut observation);

        assert!(!observation.is_anomaly);
        assert!(system.strategy().get_active_incidents().is_empty());
    }

    #[test]
    fn test_anomalous_frame_opens_incident() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());

        let mut observation = observation_at(2, 0.5);
        let mut person = DetectedObject {
            type_id: "person".into(),
            track_id: "p1".into(),
            confidence: 0.9,
            bounding_box: BoundingBox::new(900.0, 500.0, 100.0, 200.0),
            ..Default::default()
        };
        person
            .attributes
            .insert("recognitionStatus".into(), "unknown".into());
        observation.objects.push(person);

        system.process_observation("cam-a", &mut observation);

        assert!(observation.is_anomaly);
        let incidents = system.strategy().get_active_incidents();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].primary_camera_id, "cam-a");
        assert_eq!(system.strategy().get_active_plans().len(), 1);
        assert_eq!(system.strategy().get_tracked_subjects().len(), 1);
    }

    #[test]
    fn test_object_callback_fires_when_objects_present() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        system.set_object_callback(Box::new(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let mut empty = observation_at(10, 0.0);
        system.process_observation("cam-a", &mut empty);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let mut with_object = observation_at(10, 0.0);
        with_object.objects.push(DetectedObject {
            type_id: "vehicle".into(),
            track_id: "v1".into(),
            ..Default::default()
        });
        system.process_observation("cam-a", &mut with_object);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_configure_camera_applies_settings_and_topology() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());

        system.configure_camera(
            "cam-a",
            &serde_json::json!({
                "anomalyThreshold": 0.5,
                "enableLearning": false,
                "position": {"x": 1.0, "y": 2.0, "z": 0.0},
                "adjacent_cameras": ["cam-b"]
            }),
        );

        let config = system.config.device("cam-a");
        assert_eq!(config.anomaly_threshold, 0.5);
        assert!(!config.enable_learning);
        assert_eq!(
            system.strategy().adjacent_cameras("cam-a"),
            vec!["cam-b".to_string()]
        );
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());
        system.start();
        system.start(); // idempotent
        system.stop();
        system.stop();
    }

    #[test]
    fn test_status_report_lists_cameras() {
        let dir = tempfile::tempdir().unwrap();
        let system = test_system(dir.path());

        let mut observation = observation_at(10, 0.0);
        system.process_observation("cam-a", &mut observation);
        let mut observation = observation_at(10, 0.0);
        system.process_observation("cam-b", &mut observation);

        let report = system.status_report();
        assert!(report.contains("- cam-a"));
        assert!(report.contains("- cam-b"));
        assert!(report.contains("Cognitive Status:"));
        assert!(report.contains("Security Situation:"));
    }
}
