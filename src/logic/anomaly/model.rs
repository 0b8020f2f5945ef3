//! Gaussian Anomaly Model
//!
//! Per-feature mean/standard-deviation model trained in batches. Scoring
//! computes a normalized squared deviation sum and maps it into [0,1) with
//! an exponential transform.

use serde::{Deserialize, Serialize};

use crate::logic::features::{FeatureVector, FEATURE_COUNT};

/// Standard deviations below this are treated as zero-variance features
const SIGMA_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GaussianModel {
    pub trained: bool,
    pub mean: Vec<f32>,
    pub std_dev: Vec<f32>,
}

impl GaussianModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Train from a batch of feature vectors representing normal activity.
    /// An empty batch is a warned no-op.
    pub fn train(&mut self, samples: &[FeatureVector]) {
        if samples.is_empty() {
            log::warn!("Cannot train on empty feature set");
            return;
        }

        let n = samples.len() as f32;
        let mut mean = vec![0.0f32; FEATURE_COUNT];
        for sample in samples {
            for (i, value) in sample.values.iter().enumerate() {
                mean[i] += value;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut variance = vec![0.0f32; FEATURE_COUNT];
        for sample in samples {
            for (i, value) in sample.values.iter().enumerate() {
                let diff = value - mean[i];
                variance[i] += diff * diff;
            }
        }

        self.std_dev = variance.iter().map(|v| (v / n).sqrt()).collect();
        self.mean = mean;
        self.trained = true;
    }

    /// Score a feature vector; higher is more anomalous. An untrained model
    /// scores everything as maximally anomalous. Callers that want the
    /// "untrained means normal" behavior check `is_trained` first.
    pub fn score(&self, features: &FeatureVector) -> f32 {
        if !self.trained {
            return 1.0;
        }

        let mut sum = 0.0f32;
        for (i, value) in features.values.iter().enumerate() {
            let sigma = self.std_dev[i];
            if sigma > SIGMA_EPSILON {
                let normalized = (value - self.mean[i]) / sigma;
                sum += normalized * normalized;
            }
        }

        1.0 - (-sum / (2.0 * FEATURE_COUNT as f32)).exp()
    }
}
