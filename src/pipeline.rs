//! Pipeline orchestration
//!
//! This module provides the public API for flow feature extraction. A
//! [`FeatureSet`] evaluates an ordered list of window features and concatenates
//! their columns into one [`FeatureVector`]. [`FeatureExtractor`] owns the
//! configuration, the feature set, and the value cache for a whole run.

use crate::base::window::{WindowContext, WindowFeature};
use crate::cache::{CacheStats, FeatureCache};
use crate::catalog::StandardFeature;
use crate::clip::Clip;
use crate::config::ExtractorConfig;
use crate::error::FeatureError;
use crate::scale::{BaseData, ScaleParams};
use crate::types::{FlowId, PacketWindow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Extract every standard feature from one window.
///
/// # Arguments
/// * `fid` - Flow identity defining the forward direction
/// * `window` - Packets of the window, at most `window_size` of them
/// * `window_size` - Number of packet positions per window
///
/// # Returns
/// The concatenated feature vector in catalog order
///
/// # Example
/// ```ignore
/// let vector = extract_features(&fid, &window, 10)?;
/// assert_eq!(vector.names.len(), vector.values.len());
/// ```
pub fn extract_features(
    fid: &FlowId,
    window: &PacketWindow,
    window_size: usize,
) -> Result<FeatureVector, FeatureError> {
    let features = FeatureSet::standard(&StandardFeature::all());
    let cache = FeatureCache::default();
    let ctx = WindowContext::new(fid, window, window_size)?.with_cache(&cache);
    features.evaluate(&ctx)
}

/// Ordered list of window features making up the columns of a vector.
#[derive(Clone, Default)]
pub struct FeatureSet {
    features: Vec<Arc<dyn WindowFeature>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard(features: &[StandardFeature]) -> Self {
        Self {
            features: features.iter().map(StandardFeature::build).collect(),
        }
    }

    /// Append a feature; its columns follow those already present
    pub fn push(&mut self, feature: Arc<dyn WindowFeature>) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn WindowFeature>> {
        self.features.iter()
    }

    /// Column names for a window size, without computing any values
    pub fn names(&self, window_size: usize) -> Vec<String> {
        self.features
            .iter()
            .flat_map(|feature| feature.names(window_size))
            .collect()
    }

    /// Evaluate every feature on one window and concatenate the columns
    pub fn evaluate(&self, ctx: &WindowContext<'_>) -> Result<FeatureVector, FeatureError> {
        let mut vector = FeatureVector::default();
        for feature in &self.features {
            let columns = feature.columns(ctx)?;
            vector.names.extend(columns.names);
            vector.values.extend(columns.values);
            vector.min.extend(columns.min);
            vector.max.extend(columns.max);
            vector.clip.extend(columns.clip);
        }
        Ok(vector)
    }
}

/// A fixed-width, named feature vector with per-column bounds and clip policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub clip: Vec<Clip>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Value of the column called `name`
    pub fn get(&self, name: &str) -> Option<f64> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.values.get(idx).copied()
    }

    /// Confirm columns line up with names recorded earlier (e.g. when scale
    /// parameters were fitted).
    pub fn check_alignment(&self, expected: &[String]) -> Result<(), FeatureError> {
        if expected.len() != self.names.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: expected.len(),
                actual: self.names.len(),
            });
        }
        match expected
            .iter()
            .zip(&self.names)
            .position(|(want, have)| want != have)
        {
            Some(index) => {
                warn!(index, "feature columns out of alignment");
                Err(FeatureError::ColumnMismatch {
                    index,
                    expected: expected[index].clone(),
                    actual: self.names[index].clone(),
                })
            }
            None => Ok(()),
        }
    }

    /// Apply each column's clip policy to `values`, e.g. descaled model output
    pub fn clip_values<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        rng: &mut R,
    ) -> Result<Vec<f64>, FeatureError> {
        if values.len() != self.clip.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.clip.len(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(&self.clip)
            .map(|(value, policy)| policy.apply(*value, rng))
            .collect())
    }
}

/// Stateful extractor for a dataset-generation run.
///
/// Holds one cache for the whole run, so repeated or overlapping requests for
/// the same window reuse earlier work.
pub struct FeatureExtractor {
    config: ExtractorConfig,
    features: FeatureSet,
    cache: FeatureCache,
}

impl FeatureExtractor {
    /// Create an extractor from a validated configuration
    pub fn new(config: ExtractorConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        let features = FeatureSet::standard(&config.features);
        let cache = FeatureCache::new(config.cache_capacity);
        info!(
            window_size = config.window_size,
            features = features.len(),
            columns = features.names(config.window_size).len(),
            cache_capacity = cache.capacity(),
            "feature extractor ready"
        );
        Ok(Self {
            config,
            features,
            cache,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Column names produced by [`extract`](Self::extract)
    pub fn names(&self) -> Vec<String> {
        self.features.names(self.config.window_size)
    }

    /// Compute the configured feature vector for one window
    pub fn extract(
        &self,
        fid: &FlowId,
        window: &PacketWindow,
    ) -> Result<FeatureVector, FeatureError> {
        let ctx = self.context(fid, window)?;
        self.features.evaluate(&ctx)
    }

    /// Directions, sizes, and entropies of one window
    pub fn base_data(&self, fid: &FlowId, window: &PacketWindow) -> Result<BaseData, FeatureError> {
        let ctx = self.context(fid, window)?;
        BaseData::from_window(&ctx)
    }

    /// Fit scale parameters over rows of extracted values using the configured eps
    pub fn fit_scale(&self, rows: &[Vec<f64>]) -> Result<ScaleParams, FeatureError> {
        ScaleParams::fit(rows, self.config.scale_eps)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn context<'a>(
        &'a self,
        fid: &'a FlowId,
        window: &'a PacketWindow,
    ) -> Result<WindowContext<'a>, FeatureError> {
        Ok(WindowContext::new(fid, window, self.config.window_size)?.with_cache(&self.cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Series;
    use crate::derived::Reducer;
    use crate::types::{Packet, Protocol};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::net::{IpAddr, Ipv4Addr};

    fn flow() -> (FlowId, PacketWindow) {
        let c = (IpAddr::V4(Ipv4Addr::new(10, 8, 0, 1)), 40123);
        let s = (IpAddr::V4(Ipv4Addr::new(10, 8, 0, 2)), 443);
        let fid = FlowId::new(c.0, s.0, c.1, s.1, Protocol::Tcp);
        let window = PacketWindow::new(
            "flow-1/0",
            vec![
                Packet::tcp(0.00, c, s, 0x02, vec![]),
                Packet::tcp(0.02, s, c, 0x12, vec![]),
                Packet::tcp(0.03, c, s, 0x18, b"GET / HTTP/1.1\r\n".to_vec()),
                Packet::tcp(0.10, s, c, 0x18, vec![0xab; 1200]),
                Packet::tcp(0.11, s, c, 0x18, vec![0xcd; 300]),
            ],
        );
        (fid, window)
    }

    fn small_config() -> ExtractorConfig {
        ExtractorConfig::default()
            .with_window_size(8)
            .with_features(vec![
                StandardFeature::Series(Series::Sizes),
                StandardFeature::Summary(Reducer::Sum, Series::Sizes),
                StandardFeature::TotalBwdBytes,
                StandardFeature::TotalFwdBytes,
            ])
    }

    #[test]
    fn test_extract_concatenates_in_order() {
        let (fid, window) = flow();
        let extractor = FeatureExtractor::new(small_config()).unwrap();
        let vector = extractor.extract(&fid, &window).unwrap();

        assert_eq!(vector.len(), 8 + 3);
        assert_eq!(vector.names, extractor.names());
        assert_eq!(vector.names[0], "p0_Size");
        assert_eq!(vector.get("SumSize"), Some(1616.0));
        assert_eq!(vector.get("TotalBwdBytes"), Some(1560.0));
        assert_eq!(vector.get("TotalFwdBytes"), Some(56.0));
        assert_eq!(vector.get("Nope"), None);
    }

    #[test]
    fn test_extract_is_idempotent_and_cached() {
        let (fid, window) = flow();
        let extractor = FeatureExtractor::new(small_config()).unwrap();
        let first = extractor.extract(&fid, &window).unwrap();
        let second = extractor.extract(&fid, &window).unwrap();
        assert_eq!(first, second);
        assert!(extractor.cache_stats().hits > 0);

        extractor.clear_cache();
        assert_eq!(extractor.cache_stats().windows, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = small_config().with_window_size(0);
        assert!(FeatureExtractor::new(config).is_err());
    }

    #[test]
    fn test_window_too_long() {
        let (fid, window) = flow();
        let extractor = FeatureExtractor::new(small_config().with_window_size(3)).unwrap();
        assert!(matches!(
            extractor.extract(&fid, &window),
            Err(FeatureError::WindowTooLong { .. })
        ));
    }

    #[test]
    fn test_stateless_extraction_covers_catalog() {
        let (fid, window) = flow();
        let vector = extract_features(&fid, &window, 10).unwrap();
        assert_eq!(vector.names, FeatureSet::standard(&StandardFeature::all()).names(10));
        assert_eq!(vector.values.len(), vector.len());
        assert_eq!(vector.min.len(), vector.len());
        assert_eq!(vector.clip.len(), vector.len());
    }

    #[test]
    fn test_check_alignment() {
        let (fid, window) = flow();
        let extractor = FeatureExtractor::new(small_config()).unwrap();
        let vector = extractor.extract(&fid, &window).unwrap();
        assert!(vector.check_alignment(&extractor.names()).is_ok());

        let mut shuffled = extractor.names();
        shuffled.swap(0, 1);
        assert!(matches!(
            vector.check_alignment(&shuffled),
            Err(FeatureError::ColumnMismatch { index: 0, .. })
        ));
        assert!(matches!(
            vector.check_alignment(&shuffled[..3]),
            Err(FeatureError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_clip_values() {
        let vector = FeatureVector {
            names: vec!["p0_Direction".into(), "p0_Size".into(), "MeanIAT".into()],
            values: vec![0.0; 3],
            min: vec![-1.0, 0.0, 0.0],
            max: vec![1.0, 1440.0, 1.0],
            clip: vec![Clip::Sign, Clip::RandomRound, Clip::Identity],
        };
        let mut rng = StdRng::seed_from_u64(5);
        let clipped = vector.clip_values(&[-0.7, 42.0, 0.125], &mut rng).unwrap();
        assert_eq!(clipped, vec![-1.0, 42.0, 0.125]);
        assert!(vector.clip_values(&[1.0], &mut rng).is_err());
    }

    #[test]
    fn test_base_data_and_scaling() {
        let (fid, window) = flow();
        let extractor = FeatureExtractor::new(small_config()).unwrap();
        let data = extractor.base_data(&fid, &window).unwrap();
        assert_eq!(data.window_size(), 8);
        assert_eq!(&data.directions()[..5], &[1.0, -1.0, 1.0, -1.0, -1.0]);

        let rows = vec![data.to_array(), data.to_array()];
        let params = extractor.fit_scale(&rows).unwrap();
        let scaled = data.scale(&params).unwrap();
        assert!(scaled.to_array().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_custom_feature_set() {
        let mut set = FeatureSet::new();
        set.push(StandardFeature::Top(Series::Sizes).build());
        assert_eq!(set.len(), 1);
        assert_eq!(set.names(4), vec!["Top0Size", "Top1Size", "Top2Size", "Top3Size", "Top4Size"]);
    }
}
