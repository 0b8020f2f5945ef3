//! Model Storage
//!
//! One JSON file per camera per hour slot. Files carry the feature layout
//! version and hash; a mismatch on load is reported and the model is treated
//! as untrained.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::GaussianModel;
use crate::logic::features::{layout_hash, validate_layout, FEATURE_VERSION};

#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    LayoutMismatch {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "IO Error: {}", e),
            ModelError::Serialization(e) => write!(f, "Serialization Error: {}", e),
            ModelError::LayoutMismatch {
                expected_version,
                expected_hash,
                actual_version,
                actual_hash,
            } => write!(
                f,
                "Model Layout Mismatch: Expected v{} ({:x}), Got v{} ({:x})",
                expected_version, expected_hash, actual_version, actual_hash
            ),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err)
    }
}

/// On-disk shape of a persisted hourly model
#[derive(Debug, Serialize, Deserialize)]
struct PersistedModel {
    feature_version: u8,
    layout_hash: u32,
    model: GaussianModel,
}

/// Path of the model file for one hour slot
pub fn model_file_path(storage_root: &Path, device_id: &str, hour: usize) -> PathBuf {
    storage_root
        .join(device_id)
        .join(format!("model_hour_{}.json", hour))
}

/// Save a trained model for one hour slot
pub fn save_model(model: &GaussianModel, path: &Path) -> Result<(), ModelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let persisted = PersistedModel {
        feature_version: FEATURE_VERSION,
        layout_hash: layout_hash(),
        model: model.clone(),
    };

    fs::write(path, serde_json::to_vec_pretty(&persisted)?)?;
    Ok(())
}

/// Load a model for one hour slot, validating layout compatibility
pub fn load_model(path: &Path) -> Result<GaussianModel, ModelError> {
    let data = fs::read(path)?;
    let persisted: PersistedModel = serde_json::from_slice(&data)?;

    validate_layout(persisted.feature_version, persisted.layout_hash).map_err(|e| {
        ModelError::LayoutMismatch {
            expected_version: e.expected_version,
            expected_hash: e.expected_hash,
            actual_version: e.actual_version,
            actual_hash: e.actual_hash,
        }
    })?;

    Ok(persisted.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{FeatureVector, FEATURE_COUNT};

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = model_file_path(dir.path(), "cam-1", 14);

        let mut model = GaussianModel::new();
        let samples: Vec<_> = (0..20)
            .map(|i| {
                FeatureVector::from_values([0.5, 0.4, 0.01 * (i % 3) as f32, 0.0, 0.0, 0.0])
            })
            .collect();
        model.train(&samples);

        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        assert!(loaded.is_trained());
        assert_eq!(loaded.mean, model.mean);
        assert_eq!(loaded.std_dev, model.std_dev);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = model_file_path(dir.path(), "cam-1", 3);
        assert!(load_model(&path).is_err());
    }

    #[test]
    fn test_load_rejects_layout_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_hour_0.json");

        let doc = serde_json::json!({
            "feature_version": 99,
            "layout_hash": 0,
            "model": {
                "trained": true,
                "mean": vec![0.0f32; FEATURE_COUNT],
                "std_dev": vec![1.0f32; FEATURE_COUNT],
            }
        });
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        match load_model(&path) {
            Err(ModelError::LayoutMismatch { actual_version, .. }) => {
                assert_eq!(actual_version, 99)
            }
            other => panic!("expected layout mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
