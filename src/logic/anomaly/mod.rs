//! Anomaly Engine
//!
//! Per-camera statistical anomaly detection. Each detector keeps 24
//! independent Gaussian models keyed by local hour of day, trained online
//! from accumulated feature vectors and persisted one file per hour.
//!
//! # Failure Strategy
//! Save/load problems are logged and reported as boolean failures; a missing
//! or incompatible model file simply leaves that hour untrained, and an
//! untrained hour scores as "not anomalous".

pub mod model;
pub mod storage;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::{BASELINE_TRAIN_BATCH, HOUR_SLOTS, RECENT_HISTORY_CAP};
use crate::logic::config::{ConfigService, DeviceConfig};
use crate::logic::features::{hour_of_day, FeatureVector};
use crate::logic::observation::FrameAnalysisResult;

pub use model::GaussianModel;
pub use storage::{load_model, model_file_path, save_model, ModelError};

struct DetectorState {
    models: Vec<GaussianModel>,
    baseline: Vec<Vec<FeatureVector>>,
    recent_history: VecDeque<FeatureVector>,
}

/// Main anomaly detection engine, one instance per camera.
///
/// All model and buffer state sits behind a single lock; the detector is
/// called synchronously from the frame-processing path and must be safe under
/// concurrent calls from multiple pipelines.
pub struct AnomalyDetector {
    device_id: String,
    config_service: Arc<ConfigService>,
    storage_root: PathBuf,
    config: Mutex<DeviceConfig>,
    state: Mutex<DetectorState>,
}

impl AnomalyDetector {
    pub fn new(device_id: &str, config_service: Arc<ConfigService>) -> Self {
        let config = config_service.device(device_id);
        let storage_root = config_service.global().data_storage_path;

        let detector = Self {
            device_id: device_id.to_string(),
            config_service,
            storage_root,
            config: Mutex::new(config),
            state: Mutex::new(DetectorState {
                models: (0..HOUR_SLOTS).map(|_| GaussianModel::new()).collect(),
                baseline: (0..HOUR_SLOTS).map(|_| Vec::new()).collect(),
                recent_history: VecDeque::new(),
            }),
        };

        detector.load_models();
        detector
    }

    /// Replace the configuration snapshot
    pub fn configure(&self, config: DeviceConfig) {
        *self.config.lock() = config;
    }

    pub fn threshold(&self) -> f32 {
        self.config.lock().anomaly_threshold
    }

    /// Clamp and persist a new anomaly threshold
    pub fn set_threshold(&self, threshold: f32) {
        let clamped = threshold.clamp(0.0, 1.0);
        let snapshot = {
            let mut config = self.config.lock();
            config.anomaly_threshold = clamped;
            config.clone()
        };
        self.config_service.update_device(snapshot);
    }

    /// Score an observation against the hour-of-day model and flag it when
    /// the score crosses the threshold. Untrained hours report not-anomalous.
    pub fn detect_anomaly(&self, result: &mut FrameAnalysisResult) -> bool {
        let features = FeatureVector::encode(result);
        let hour = hour_of_day(result.timestamp_us);
        let threshold = self.threshold();

        let score = {
            let state = self.state.lock();
            let model = &state.models[hour];
            if !model.is_trained() {
                // No model for this hour yet; consider the frame normal
                return false;
            }
            model.score(&features)
        };

        result.raise_score(score);

        if score > threshold {
            if result.anomaly_type.is_empty() {
                result.anomaly_type = "StatisticalAnomaly".to_string();
                result.anomaly_description =
                    "Activity deviates from normal patterns".to_string();
            }
            result.is_anomaly = true;
            return true;
        }

        false
    }

    /// Accumulate a normal observation into the hour's baseline buffer.
    /// Reaching the batch size triggers a retrain of every hour with data and
    /// a persist of all trained models.
    pub fn add_to_baseline(&self, result: &FrameAnalysisResult) {
        if !self.config.lock().enable_learning {
            return;
        }

        let features = FeatureVector::encode(result);
        let hour = hour_of_day(result.timestamp_us);

        let should_train = {
            let mut state = self.state.lock();
            state.baseline[hour].push(features.clone());

            state.recent_history.push_back(features);
            while state.recent_history.len() > RECENT_HISTORY_CAP {
                state.recent_history.pop_front();
            }

            state.baseline[hour].len() >= BASELINE_TRAIN_BATCH
        };

        if should_train {
            self.train_models();
        }
    }

    /// Retrain every hour slot that has buffered samples, then persist
    pub fn train_models(&self) {
        {
            let mut state = self.state.lock();
            for hour in 0..HOUR_SLOTS {
                if state.baseline[hour].is_empty() {
                    continue;
                }
                let samples = state.baseline[hour].clone();
                state.models[hour].train(&samples);
            }
        }

        self.save_models();
    }

    /// Drop all baseline buffers and trained models. Calling twice is
    /// equivalent to calling once.
    pub fn reset_baseline(&self) {
        let mut state = self.state.lock();
        for buffer in state.baseline.iter_mut() {
            buffer.clear();
        }
        state.recent_history.clear();
        for model in state.models.iter_mut() {
            *model = GaussianModel::new();
        }
    }

    /// Persist all trained hourly models. Returns false if any save failed.
    pub fn save_models(&self) -> bool {
        let state = self.state.lock();
        let mut all_saved = true;

        for (hour, model) in state.models.iter().enumerate() {
            if !model.is_trained() {
                continue;
            }
            let path = model_file_path(&self.storage_root, &self.device_id, hour);
            if let Err(e) = save_model(model, &path) {
                log::error!("Failed to save model for hour {}: {}", hour, e);
                all_saved = false;
            }
        }

        all_saved
    }

    /// Load any persisted hourly models. Returns true if at least one loaded.
    pub fn load_models(&self) -> bool {
        let mut state = self.state.lock();
        let mut any_loaded = false;

        for hour in 0..HOUR_SLOTS {
            let path = model_file_path(&self.storage_root, &self.device_id, hour);
            if !path.exists() {
                continue;
            }
            match load_model(&path) {
                Ok(model) => {
                    state.models[hour] = model;
                    any_loaded = true;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to load model for hour {} on {}: {}",
                        hour,
                        self.device_id,
                        e
                    );
                }
            }
        }

        any_loaded
    }

    /// Whether the model for the given hour slot has been trained
    pub fn is_trained(&self, hour: usize) -> bool {
        self.state.lock().models[hour].is_trained()
    }

    /// Number of samples buffered for the given hour slot
    pub fn baseline_len(&self, hour: usize) -> usize {
        self.state.lock().baseline[hour].len()
    }
}
