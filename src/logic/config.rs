//! Configuration Service
//!
//! Explicitly constructed configuration store shared by `Arc`. Device configs
//! are keyed by id; components receive cloned snapshots on (re)configure, so
//! no component ever holds a live reference into this store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO Error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse Error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

// ============================================================================
// DEVICE CONFIGURATION
// ============================================================================

/// Inclusive time range in seconds from midnight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i32,
    pub end: i32,
}

impl TimeRange {
    pub fn contains(&self, seconds_from_midnight: i32) -> bool {
        seconds_from_midnight >= self.start && seconds_from_midnight <= self.end
    }
}

/// Per-camera configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,

    // Detection settings
    #[serde(default = "default_min_confidence")]
    pub min_person_confidence: f32,
    #[serde(default = "default_min_confidence")]
    pub min_vehicle_confidence: f32,

    // Anomaly detection settings
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f32,
    #[serde(default = "default_true")]
    pub enable_unknown_visitor_detection: bool,
    #[serde(default = "default_unknown_visitor_secs")]
    pub unknown_visitor_threshold_secs: i64,
    #[serde(default = "default_true")]
    pub enable_activity_analysis: bool,

    // Learning settings
    #[serde(default = "default_true")]
    pub enable_learning: bool,
    #[serde(default = "default_baseline_days")]
    pub baseline_duration_days: u32,

    // Business hour windows, seconds from midnight
    #[serde(default = "default_business_hours")]
    pub business_hours: Vec<TimeRange>,
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_anomaly_threshold() -> f32 {
    crate::constants::DEFAULT_ANOMALY_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_unknown_visitor_secs() -> i64 {
    300
}

fn default_baseline_days() -> u32 {
    7
}

fn default_business_hours() -> Vec<TimeRange> {
    vec![TimeRange {
        start: 8 * 3600,
        end: 18 * 3600,
    }]
}

impl DeviceConfig {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            device_name: device_id.to_string(),
            min_person_confidence: default_min_confidence(),
            min_vehicle_confidence: default_min_confidence(),
            anomaly_threshold: default_anomaly_threshold(),
            enable_unknown_visitor_detection: true,
            unknown_visitor_threshold_secs: default_unknown_visitor_secs(),
            enable_activity_analysis: true,
            enable_learning: true,
            baseline_duration_days: default_baseline_days(),
            business_hours: default_business_hours(),
        }
    }

    /// Whether the given second-of-day falls inside any business-hours window
    pub fn is_business_hours(&self, seconds_from_midnight: i32) -> bool {
        self.business_hours
            .iter()
            .any(|r| r.contains(seconds_from_midnight))
    }

    /// Apply recognized options from a JSON settings object. Unknown keys are
    /// ignored; malformed values leave the previous setting in place.
    pub fn apply_settings(&mut self, settings: &serde_json::Value) {
        if let Some(v) = settings.get("anomalyThreshold").and_then(|v| v.as_f64()) {
            self.anomaly_threshold = (v as f32).clamp(0.0, 1.0);
        }
        if let Some(v) = settings.get("enableLearning").and_then(|v| v.as_bool()) {
            self.enable_learning = v;
        }
        if let Some(v) = settings
            .get("enableUnknownVisitorDetection")
            .and_then(|v| v.as_bool())
        {
            self.enable_unknown_visitor_detection = v;
        }
        if let Some(v) = settings
            .get("unknownVisitorThresholdSecs")
            .and_then(|v| v.as_i64())
        {
            self.unknown_visitor_threshold_secs = v;
        }
        if let Some(v) = settings.get("minPersonConfidence").and_then(|v| v.as_f64()) {
            self.min_person_confidence = (v as f32).clamp(0.0, 1.0);
        }
        if let Some(hours) = settings.get("businessHours").and_then(|v| v.as_array()) {
            let mut ranges = Vec::new();
            for entry in hours {
                let start = entry.get("start").and_then(|v| v.as_i64());
                let end = entry.get("end").and_then(|v| v.as_i64());
                if let (Some(start), Some(end)) = (start, end) {
                    ranges.push(TimeRange {
                        start: start as i32,
                        end: end as i32,
                    });
                }
            }
            if !ranges.is_empty() {
                self.business_hours = ranges;
            }
        }
    }
}

// ============================================================================
// GLOBAL SETTINGS
// ============================================================================

/// Settings that apply to the whole agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_storage_path")]
    pub data_storage_path: PathBuf,

    // Reasoning oracle settings
    #[serde(default)]
    pub enable_oracle: bool,
    #[serde(default)]
    pub oracle_api_key: String,
    #[serde(default = "default_oracle_model")]
    pub oracle_model: String,
    #[serde(default = "default_oracle_endpoint")]
    pub oracle_endpoint: String,
    #[serde(default = "default_oracle_max_tokens")]
    pub oracle_max_tokens: u32,
    #[serde(default = "default_oracle_temperature")]
    pub oracle_temperature: f32,
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
}

fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vision-agent")
}

fn default_oracle_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_oracle_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_oracle_max_tokens() -> u32 {
    4096
}

fn default_oracle_temperature() -> f32 {
    0.7
}

fn default_oracle_timeout() -> u64 {
    30
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            data_storage_path: default_storage_path(),
            enable_oracle: false,
            oracle_api_key: String::new(),
            oracle_model: default_oracle_model(),
            oracle_endpoint: default_oracle_endpoint(),
            oracle_max_tokens: default_oracle_max_tokens(),
            oracle_temperature: default_oracle_temperature(),
            oracle_timeout_secs: default_oracle_timeout(),
        }
    }
}

// ============================================================================
// CONFIG SERVICE
// ============================================================================

/// Serialized shape of the full configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    global: Option<GlobalSettings>,
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

/// Owns all device and global configuration. Constructed once and passed by
/// reference; there is no process-wide singleton.
pub struct ConfigService {
    global: Mutex<GlobalSettings>,
    devices: Mutex<HashMap<String, DeviceConfig>>,
}

impl ConfigService {
    pub fn new(global: GlobalSettings) -> Arc<Self> {
        Arc::new(Self {
            global: Mutex::new(global),
            devices: Mutex::new(HashMap::new()),
        })
    }

    /// Load a configuration document from disk. A missing or malformed file
    /// yields defaults with a warning, never an error.
    pub fn load_or_default(path: &Path) -> Arc<Self> {
        let doc = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<ConfigDocument>(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("Config parse failed ({}), using defaults", e);
                    ConfigDocument::default()
                }
            },
            Err(e) => {
                log::warn!("Config read failed ({}), using defaults", e);
                ConfigDocument::default()
            }
        };

        let service = Self::new(doc.global.unwrap_or_default());
        {
            let mut devices = service.devices.lock();
            for device in doc.devices {
                devices.insert(device.device_id.clone(), device);
            }
        }
        service
    }

    /// Persist the full configuration document
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let doc = ConfigDocument {
            global: Some(self.global.lock().clone()),
            devices: {
                let devices = self.devices.lock();
                let mut list: Vec<DeviceConfig> = devices.values().cloned().collect();
                list.sort_by(|a, b| a.device_id.cmp(&b.device_id));
                list
            },
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(())
    }

    pub fn global(&self) -> GlobalSettings {
        self.global.lock().clone()
    }

    pub fn set_global(&self, settings: GlobalSettings) {
        *self.global.lock() = settings;
    }

    /// Snapshot of a device config, creating defaults on first access
    pub fn device(&self, device_id: &str) -> DeviceConfig {
        let mut devices = self.devices.lock();
        devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceConfig::new(device_id))
            .clone()
    }

    /// Replace a device config with a modified snapshot
    pub fn update_device(&self, config: DeviceConfig) {
        self.devices
            .lock()
            .insert(config.device_id.clone(), config);
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.devices.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_defaults() {
        let config = DeviceConfig::new("cam-1");
        assert_eq!(config.anomaly_threshold, 0.7);
        assert!(config.enable_learning);
        assert_eq!(config.unknown_visitor_threshold_secs, 300);
        assert!(config.is_business_hours(12 * 3600));
        assert!(!config.is_business_hours(3 * 3600));
    }

    #[test]
    fn test_apply_settings_clamps_threshold() {
        let mut config = DeviceConfig::new("cam-1");
        config.apply_settings(&json!({ "anomalyThreshold": 1.8 }));
        assert_eq!(config.anomaly_threshold, 1.0);

        config.apply_settings(&json!({ "anomalyThreshold": -0.4 }));
        assert_eq!(config.anomaly_threshold, 0.0);
    }

    #[test]
    fn test_apply_settings_business_hours() {
        let mut config = DeviceConfig::new("cam-1");
        config.apply_settings(&json!({
            "businessHours": [{"start": 0, "end": 3600}],
            "enableLearning": false,
            "unknownVisitorThresholdSecs": 42
        }));
        assert_eq!(config.business_hours.len(), 1);
        assert!(config.is_business_hours(1800));
        assert!(!config.is_business_hours(7200));
        assert!(!config.enable_learning);
        assert_eq!(config.unknown_visitor_threshold_secs, 42);
    }

    #[test]
    fn test_service_creates_device_on_access() {
        let service = ConfigService::new(GlobalSettings::default());
        let config = service.device("cam-7");
        assert_eq!(config.device_id, "cam-7");
        assert_eq!(service.device_ids(), vec!["cam-7".to_string()]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let service = ConfigService::new(GlobalSettings::default());
        let mut config = service.device("cam-1");
        config.anomaly_threshold = 0.55;
        service.update_device(config);
        service.save(&path).unwrap();

        let reloaded = ConfigService::load_or_default(&path);
        assert_eq!(reloaded.device("cam-1").anomaly_threshold, 0.55);
    }
}
