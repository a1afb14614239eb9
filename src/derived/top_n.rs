//! Largest (or smallest) values of a window feature

use crate::base::window::{WindowContext, WindowFeature};
use crate::clip::Clip;
use crate::error::FeatureError;
use std::sync::Arc;

/// The `n` largest values of a feature in ascending order, or the `n` smallest
/// in bottom mode. Short inputs are zero-padded on the right.
pub struct TopN {
    feature: Arc<dyn WindowFeature>,
    n: usize,
    bottom: bool,
    id: String,
    base_name: String,
}

impl TopN {
    pub fn new(feature: Arc<dyn WindowFeature>, n: usize) -> Self {
        Self::build(feature, n, false)
    }

    /// Select the smallest `n` values instead
    pub fn bottom(feature: Arc<dyn WindowFeature>, n: usize) -> Self {
        Self::build(feature, n, true)
    }

    fn build(feature: Arc<dyn WindowFeature>, n: usize, bottom: bool) -> Self {
        let mode = if bottom { "Bottom" } else { "Top" };
        let id = format!("{mode}{n}({})", feature.id());
        let base_name = format!("{mode}{}", feature.base_name());
        Self {
            feature,
            n,
            bottom,
            id,
            base_name,
        }
    }

    fn mode(&self) -> &'static str {
        if self.bottom {
            "Bottom"
        } else {
            "Top"
        }
    }

    fn select(&self, mut data: Vec<f64>) -> Vec<f64> {
        data.sort_by(f64::total_cmp);
        let mut picked = if self.bottom {
            data.truncate(self.n);
            data
        } else {
            let start = data.len().saturating_sub(self.n);
            data.split_off(start)
        };
        picked.resize(self.n, 0.0);
        picked
    }
}

impl WindowFeature for TopN {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_name(&self) -> &str {
        &self.base_name
    }

    fn names(&self, _window_size: usize) -> Vec<String> {
        (0..self.n)
            .map(|idx| format!("{}{idx}{}", self.mode(), self.feature.base_name()))
            .collect()
    }

    // Bottom mode selects from the opposite bound vector.
    fn min(&self, window_size: usize) -> Vec<f64> {
        if self.bottom {
            self.select(self.feature.max(window_size))
        } else {
            self.select(self.feature.min(window_size))
        }
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        if self.bottom {
            self.select(self.feature.min(window_size))
        } else {
            self.select(self.feature.max(window_size))
        }
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        let policy = self
            .feature
            .clip(window_size)
            .first()
            .copied()
            .unwrap_or(Clip::Identity);
        vec![policy; self.n]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        Ok(self.select(self.feature.value(ctx)?))
    }
}
