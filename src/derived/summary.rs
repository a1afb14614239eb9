//! Summary statistics over a window feature
//!
//! [`Summary`] reduces a wrapped feature's vector to a single value. A reduction
//! that is undefined on its input (a sample deviation of one value, a max of
//! nothing) yields `0.0` instead of failing the pipeline.

use crate::base::per_packet::value_entropy;
use crate::base::window::{WindowContext, WindowFeature};
use crate::clip::Clip;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Aggregate applied by a [`Summary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    Max,
    Min,
    Sum,
    Mean,
    /// Sample standard deviation (n - 1)
    Stdev,
    /// Population standard deviation
    Pstdev,
    /// Sample variance (n - 1)
    Variance,
    /// Population variance
    Pvariance,
    /// Shannon entropy of the distribution of values
    Entropy,
}

impl Reducer {
    /// Prefix used in column names
    pub fn label(&self) -> &'static str {
        match self {
            Reducer::Max => "Max",
            Reducer::Min => "Min",
            Reducer::Sum => "Sum",
            Reducer::Mean => "Mean",
            Reducer::Stdev => "Stdev",
            Reducer::Pstdev => "Pstdev",
            Reducer::Variance => "Variance",
            Reducer::Pvariance => "Pvariance",
            Reducer::Entropy => "Entropy",
        }
    }

    /// Apply the reduction; `None` when it is undefined for `values`.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        match self {
            Reducer::Max => values.iter().copied().reduce(f64::max),
            Reducer::Min => values.iter().copied().reduce(f64::min),
            Reducer::Sum => Some(values.iter().sum()),
            Reducer::Mean => mean(values),
            Reducer::Stdev => variance(values, 1).map(f64::sqrt),
            Reducer::Pstdev => variance(values, 0).map(f64::sqrt),
            Reducer::Variance => variance(values, 1),
            Reducer::Pvariance => variance(values, 0),
            Reducer::Entropy => {
                if values.is_empty() {
                    None
                } else {
                    Some(value_entropy(values))
                }
            }
        }
    }

    /// Range of the reduction given per-index bounds of its input.
    ///
    /// Max, Min, Mean, and Sum are tight. Dispersion uses the widest spread the
    /// input range allows and Entropy uses `log2(n)`; both are valid but loose.
    pub fn bounds(&self, min: &[f64], max: &[f64]) -> (f64, f64) {
        let n = min.len().min(max.len());
        if n == 0 {
            return (0.0, 0.0);
        }
        let lo = min.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = max.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let half_range = (hi - lo).max(0.0) / 2.0;
        let sample_correction = if n > 1 {
            n as f64 / (n - 1) as f64
        } else {
            0.0
        };

        match self {
            Reducer::Max | Reducer::Min | Reducer::Mean => (lo, hi),
            Reducer::Sum => (min.iter().sum(), max.iter().sum()),
            Reducer::Pvariance => (0.0, half_range * half_range),
            Reducer::Variance => (0.0, half_range * half_range * sample_correction),
            Reducer::Pstdev => (0.0, half_range),
            Reducer::Stdev => (0.0, half_range * sample_correction.sqrt()),
            Reducer::Entropy => (0.0, (n as f64).log2()),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Variance with `ddof` delta degrees of freedom
fn variance(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let mu = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some(squares / (values.len() - ddof) as f64)
}

/// A one-value feature: `reducer` applied to another feature's vector.
pub struct Summary {
    feature: Arc<dyn WindowFeature>,
    reducer: Reducer,
    id: String,
    name: String,
    bounds: Option<(f64, f64)>,
}

impl Summary {
    pub fn new(feature: Arc<dyn WindowFeature>, reducer: Reducer) -> Self {
        let id = format!("{}({})", reducer.label(), feature.id());
        let name = format!("{}{}", reducer.label(), feature.base_name());
        Self {
            feature,
            reducer,
            id,
            name,
            bounds: None,
        }
    }

    /// Replace the derived bounds with caller-supplied ones
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    fn bounds(&self, window_size: usize) -> (f64, f64) {
        self.bounds.unwrap_or_else(|| {
            self.reducer.bounds(
                &self.feature.min(window_size),
                &self.feature.max(window_size),
            )
        })
    }
}

impl WindowFeature for Summary {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_name(&self) -> &str {
        &self.name
    }

    fn names(&self, _window_size: usize) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        vec![self.bounds(window_size).0]
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        vec![self.bounds(window_size).1]
    }

    fn clip(&self, _window_size: usize) -> Vec<Clip> {
        vec![Clip::Identity]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let values = self.feature.value(ctx)?;
        let reduced = match self.reducer.reduce(&values).filter(|v| v.is_finite()) {
            Some(value) => value,
            None => {
                debug!(feature = %self.name, len = values.len(), "reduction undefined, using 0.0");
                0.0
            }
        };
        Ok(vec![reduced])
    }
}
