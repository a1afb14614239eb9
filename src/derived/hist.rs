//! Bucketed counts of a window feature's values

use crate::base::window::{WindowContext, WindowFeature};
use crate::clip::Clip;
use crate::error::FeatureError;
use std::sync::Arc;
use tracing::debug;

/// Counts of a feature's values per bucket.
///
/// Bucket `i` covers `[edges[i], edges[i + 1])`; the last bucket is open-ended.
/// Values below the first edge are counted in bucket 0.
pub struct Hist {
    feature: Arc<dyn WindowFeature>,
    edges: Vec<f64>,
    id: String,
    base_name: String,
}

impl Hist {
    /// Edges are sorted ascending and deduplicated; non-finite edges are dropped.
    pub fn new(feature: Arc<dyn WindowFeature>, edges: Vec<f64>) -> Self {
        let given = edges.len();
        let mut edges: Vec<f64> = edges.into_iter().filter(|e| e.is_finite()).collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();
        if edges.len() != given {
            debug!(feature = feature.id(), given, kept = edges.len(), "normalized histogram edges");
        }

        let base_name = format!("Hist{}", feature.base_name());
        let joined: Vec<String> = edges.iter().map(|e| e.to_string()).collect();
        let id = format!("Hist({})[{}]", feature.id(), joined.join(","));
        Self {
            feature,
            edges,
            id,
            base_name,
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Walk the sorted values with a cursor that only moves forward.
    fn counts(&self, mut values: Vec<f64>) -> Vec<f64> {
        let mut counts = vec![0.0; self.edges.len()];
        if counts.is_empty() {
            return counts;
        }

        values.sort_by(f64::total_cmp);
        let mut cursor = 0;
        for value in values {
            while cursor + 1 < self.edges.len() && value >= self.edges[cursor + 1] {
                cursor += 1;
            }
            counts[cursor] += 1.0;
        }
        counts
    }
}

impl WindowFeature for Hist {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_name(&self) -> &str {
        &self.base_name
    }

    fn names(&self, _window_size: usize) -> Vec<String> {
        self.edges
            .iter()
            .map(|edge| format!("Hist{}{edge}", self.feature.base_name()))
            .collect()
    }

    fn min(&self, _window_size: usize) -> Vec<f64> {
        vec![0.0; self.edges.len()]
    }

    /// Loose: any one bucket could receive the whole window.
    fn max(&self, window_size: usize) -> Vec<f64> {
        vec![window_size as f64; self.edges.len()]
    }

    fn clip(&self, _window_size: usize) -> Vec<Clip> {
        vec![Clip::RandomRound; self.edges.len()]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        Ok(self.counts(self.feature.value(ctx)?))
    }
}
