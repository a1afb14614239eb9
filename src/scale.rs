//! Standardization of feature vectors
//!
//! [`ScaleParams`] holds a per-index mean and standard deviation computed once
//! from a reference dataset and persisted as JSON. [`BaseData`] is the
//! directions/sizes/entropies triple of one window, the unit most scaling is
//! applied to.

use crate::base::per_packet::{Direction, Entropy, PerPacketFeature, Size};
use crate::base::window::{WindowContext, WindowFeature, Windowized};
use crate::error::FeatureError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default stabilizer added to every standard deviation
pub const DEFAULT_EPS: f64 = 1e-8;

fn default_eps() -> f64 {
    DEFAULT_EPS
}

/// Per-index mean/standard-deviation normalization.
///
/// `scale(x) = (x - mu) / (std + eps)` and `descale` is its exact inverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub mu: Vec<f64>,
    pub std: Vec<f64>,
    #[serde(default = "default_eps")]
    pub eps: f64,
}

impl ScaleParams {
    pub fn new(mu: Vec<f64>, std: Vec<f64>, eps: f64) -> Result<Self, FeatureError> {
        if mu.len() != std.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: mu.len(),
                actual: std.len(),
            });
        }
        Ok(Self { mu, std, eps })
    }

    /// Column means and population standard deviations of `rows`.
    ///
    /// Every row must have the same length. No rows gives empty parameters.
    pub fn fit(rows: &[Vec<f64>], eps: f64) -> Result<Self, FeatureError> {
        let Some(first) = rows.first() else {
            return Self::new(Vec::new(), Vec::new(), eps);
        };
        let width = first.len();
        if let Some(row) = rows.iter().find(|row| row.len() != width) {
            return Err(FeatureError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }

        let count = rows.len() as f64;
        let mut mu = vec![0.0; width];
        for row in rows {
            for (m, v) in mu.iter_mut().zip(row) {
                *m += v;
            }
        }
        mu.iter_mut().for_each(|m| *m /= count);

        let mut std = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mu) {
                *s += (v - m).powi(2);
            }
        }
        std.iter_mut().for_each(|s| *s = (*s / count).sqrt());

        Self::new(mu, std, eps)
    }

    pub fn len(&self) -> usize {
        self.mu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    pub fn scale(&self, data: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_len(data.len())?;
        Ok(data
            .iter()
            .zip(self.mu.iter().zip(&self.std))
            .map(|(x, (mu, std))| (x - mu) / (std + self.eps))
            .collect())
    }

    pub fn descale(&self, data: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_len(data.len())?;
        Ok(data
            .iter()
            .zip(self.mu.iter().zip(&self.std))
            .map(|(x, (mu, std))| x * (std + self.eps) + mu)
            .collect())
    }

    /// Scale one value with the parameters of column `idx`
    pub fn scale_at(&self, value: f64, idx: usize) -> Result<f64, FeatureError> {
        let (mu, std) = self.column(idx)?;
        Ok((value - mu) / (std + self.eps))
    }

    pub fn descale_at(&self, value: f64, idx: usize) -> Result<f64, FeatureError> {
        let (mu, std) = self.column(idx)?;
        Ok(value * (std + self.eps) + mu)
    }

    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        let params: ScaleParams = serde_json::from_str(json)?;
        Self::new(params.mu, params.std, params.eps)
    }

    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FeatureError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn check_len(&self, actual: usize) -> Result<(), FeatureError> {
        if actual != self.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.len(),
                actual,
            });
        }
        Ok(())
    }

    fn column(&self, idx: usize) -> Result<(f64, f64), FeatureError> {
        match (self.mu.get(idx), self.std.get(idx)) {
            (Some(mu), Some(std)) => Ok((*mu, *std)),
            _ => Err(FeatureError::IndexOutOfRange {
                index: idx,
                len: self.len(),
            }),
        }
    }
}

/// Directions, sizes, and entropies of one window, all the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BaseDataRecord", into = "BaseDataRecord")]
pub struct BaseData {
    directions: Vec<f64>,
    sizes: Vec<f64>,
    entropies: Vec<f64>,
}

impl BaseData {
    pub fn new(
        directions: Vec<f64>,
        sizes: Vec<f64>,
        entropies: Vec<f64>,
    ) -> Result<Self, FeatureError> {
        if directions.len() != sizes.len() || sizes.len() != entropies.len() {
            return Err(FeatureError::UnevenBaseData {
                directions: directions.len(),
                sizes: sizes.len(),
                entropies: entropies.len(),
            });
        }
        Ok(Self {
            directions,
            sizes,
            entropies,
        })
    }

    /// The windowized base features of one window, read through the context's cache
    pub fn from_window(ctx: &WindowContext<'_>) -> Result<Self, FeatureError> {
        Self::new(
            Windowized::new(Direction).value(ctx)?,
            Windowized::new(Size).value(ctx)?,
            Windowized::new(Entropy).value(ctx)?,
        )
    }

    pub fn directions(&self) -> &[f64] {
        &self.directions
    }

    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    pub fn entropies(&self) -> &[f64] {
        &self.entropies
    }

    /// Length of each component
    pub fn window_size(&self) -> usize {
        self.directions.len()
    }

    /// Flatten as directions, then sizes, then entropies
    pub fn to_array(&self) -> Vec<f64> {
        let mut array = Vec::with_capacity(self.window_size() * 3);
        array.extend_from_slice(&self.directions);
        array.extend_from_slice(&self.sizes);
        array.extend_from_slice(&self.entropies);
        array
    }

    pub fn from_array(array: &[f64]) -> Result<Self, FeatureError> {
        if array.len() % 3 != 0 {
            return Err(FeatureError::BaseDataSplit { len: array.len() });
        }
        let n = array.len() / 3;
        Self::new(
            array[..n].to_vec(),
            array[n..2 * n].to_vec(),
            array[2 * n..].to_vec(),
        )
    }

    pub fn scale(&self, params: &ScaleParams) -> Result<Self, FeatureError> {
        Self::from_array(&params.scale(&self.to_array())?)
    }

    pub fn descale(&self, params: &ScaleParams) -> Result<Self, FeatureError> {
        Self::from_array(&params.descale(&self.to_array())?)
    }

    /// Snap each component back to valid packet attributes
    pub fn clip<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let direction = Direction.clip_policy();
        let size = Size.clip_policy();
        let entropy = Entropy.clip_policy();
        Self {
            directions: self.directions.iter().map(|v| direction.apply(*v, rng)).collect(),
            sizes: self.sizes.iter().map(|v| size.apply(*v, rng)).collect(),
            entropies: self.entropies.iter().map(|v| entropy.apply(*v, rng)).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BaseDataRecord {
    directions: Vec<f64>,
    sizes: Vec<f64>,
    entropies: Vec<f64>,
}

impl TryFrom<BaseDataRecord> for BaseData {
    type Error = FeatureError;

    fn try_from(record: BaseDataRecord) -> Result<Self, Self::Error> {
        BaseData::new(record.directions, record.sizes, record.entropies)
    }
}

impl From<BaseData> for BaseDataRecord {
    fn from(data: BaseData) -> Self {
        BaseDataRecord {
            directions: data.directions,
            sizes: data.sizes,
            entropies: data.entropies,
        }
    }
}
