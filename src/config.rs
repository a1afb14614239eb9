//! Extractor configuration

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::catalog::StandardFeature;
use crate::error::FeatureError;
use crate::scale::DEFAULT_EPS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Packets per window unless configured otherwise
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Settings for one feature-extraction run.
///
/// The window size and feature list fix the column layout, so they must stay
/// constant across a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Packets per window; shorter windows are zero-filled
    pub window_size: usize,
    /// Distinct (window, size) pairs kept in the cache
    pub cache_capacity: usize,
    /// Features to extract, in column order
    pub features: Vec<StandardFeature>,
    /// Stabilizer used when fitting scale parameters
    pub scale_eps: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            features: StandardFeature::all(),
            scale_eps: DEFAULT_EPS,
        }
    }
}

impl ExtractorConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_features(mut self, features: Vec<StandardFeature>) -> Self {
        self.features = features;
        self
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.window_size == 0 {
            return Err(FeatureError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(FeatureError::InvalidConfig(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if !self.scale_eps.is_finite() || self.scale_eps < 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "scale_eps must be finite and non-negative, got {}",
                self.scale_eps
            )));
        }
        if self.features.is_empty() {
            return Err(FeatureError::InvalidConfig(
                "feature list is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.features.iter().find(|f| !seen.insert(**f)) {
            return Err(FeatureError::InvalidConfig(format!(
                "feature {dup} listed more than once"
            )));
        }
        Ok(())
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        let config: ExtractorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FeatureError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
