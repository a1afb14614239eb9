//! Stock feature instantiations
//!
//! [`StandardFeature`] names every ready-made feature the crate ships, so a
//! feature set can be described in configuration as a list of names such as
//! `"Sizes"`, `"MaxBurstDepths"`, `"Top5IATs"`, or `"HistEntropies"`.

use crate::base::per_packet::{Direction, Entropy, Size, MAX_BYTE_ENTROPY, MAX_PACKET_SIZE};
use crate::base::window::{WindowFeature, Windowized};
use crate::derived::{
    BurstDepths, DirSignBurstBytes, DirSignSizes, Hist, Iats, Reducer, Summary, TopN, TotalBytes,
};
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Number of values kept by the stock top-N features
pub const STOCK_TOP_N: usize = 5;

/// Reducers applied to every summarized series
const STOCK_REDUCERS: [Reducer; 7] = [
    Reducer::Max,
    Reducer::Min,
    Reducer::Sum,
    Reducer::Mean,
    Reducer::Stdev,
    Reducer::Variance,
    Reducer::Entropy,
];

/// Series that get summaries, a top-N, and a histogram
const SUMMARIZED: [Series; 5] = [
    Series::Sizes,
    Series::Entropies,
    Series::BurstDepths,
    Series::DirSignBurstBytes,
    Series::Iats,
];

/// A per-position vector feature of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Directions,
    Sizes,
    Entropies,
    DirSignSizes,
    BurstDepths,
    DirSignBurstBytes,
    Iats,
}

impl Series {
    pub const ALL: [Series; 7] = [
        Series::Directions,
        Series::Sizes,
        Series::Entropies,
        Series::DirSignSizes,
        Series::BurstDepths,
        Series::DirSignBurstBytes,
        Series::Iats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Series::Directions => "Directions",
            Series::Sizes => "Sizes",
            Series::Entropies => "Entropies",
            Series::DirSignSizes => "DirSignSizes",
            Series::BurstDepths => "BurstDepths",
            Series::DirSignBurstBytes => "DirSignBurstBytes",
            Series::Iats => "IATs",
        }
    }

    pub fn build(&self) -> Arc<dyn WindowFeature> {
        match self {
            Series::Directions => Arc::new(Windowized::new(Direction)),
            Series::Sizes => Arc::new(Windowized::new(Size)),
            Series::Entropies => Arc::new(Windowized::new(Entropy)),
            Series::DirSignSizes => Arc::new(DirSignSizes),
            Series::BurstDepths => Arc::new(BurstDepths),
            Series::DirSignBurstBytes => Arc::new(DirSignBurstBytes),
            Series::Iats => Arc::new(Iats),
        }
    }

    /// Bucket edges used by the stock histogram of this series
    pub fn hist_edges(&self) -> Vec<f64> {
        match self {
            Series::Directions => vec![-1.0, 0.0, 1.0],
            Series::Sizes => stepped(0, MAX_PACKET_SIZE as i64, 5),
            Series::Entropies => stepped(0, MAX_BYTE_ENTROPY as i64, 1),
            Series::DirSignSizes => {
                let limit = MAX_PACKET_SIZE as i64;
                stepped(-limit, limit, 160)
            }
            Series::BurstDepths => stepped(0, 10, 1),
            Series::DirSignBurstBytes => stepped(-10_000, 10_000, 2_000),
            // Milliseconds, 10 ms apart, expressed in seconds
            Series::Iats => (0..500).step_by(10).map(|ms| ms as f64 / 1000.0).collect(),
        }
    }
}

/// `start..end` by `step`, as floats
fn stepped(start: i64, end: i64, step: usize) -> Vec<f64> {
    (start..end).step_by(step).map(|edge| edge as f64).collect()
}

/// A named stock feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StandardFeature {
    /// The per-position vector itself
    Series(Series),
    /// One aggregate of a series
    Summary(Reducer, Series),
    /// The five largest values of a series
    Top(Series),
    /// Bucket counts of a series
    Hist(Series),
    TotalBwdBytes,
    TotalFwdBytes,
}

impl StandardFeature {
    /// Every stock feature, in canonical column order
    pub fn all() -> Vec<StandardFeature> {
        let mut all: Vec<StandardFeature> =
            Series::ALL.iter().map(|s| StandardFeature::Series(*s)).collect();
        all.push(StandardFeature::TotalBwdBytes);
        all.push(StandardFeature::TotalFwdBytes);
        for series in SUMMARIZED {
            for reducer in STOCK_REDUCERS {
                all.push(StandardFeature::Summary(reducer, series));
            }
        }
        all.extend(SUMMARIZED.iter().map(|s| StandardFeature::Top(*s)));
        all.extend(SUMMARIZED.iter().map(|s| StandardFeature::Hist(*s)));
        all
    }

    pub fn name(&self) -> String {
        match self {
            StandardFeature::Series(series) => series.name().to_string(),
            StandardFeature::Summary(reducer, series) => {
                format!("{}{}", reducer.label(), series.name())
            }
            StandardFeature::Top(series) => format!("Top{STOCK_TOP_N}{}", series.name()),
            StandardFeature::Hist(series) => format!("Hist{}", series.name()),
            StandardFeature::TotalBwdBytes => "TotalBwdBytes".to_string(),
            StandardFeature::TotalFwdBytes => "TotalFwdBytes".to_string(),
        }
    }

    /// Look up a stock feature by its catalog name
    pub fn from_name(name: &str) -> Result<Self, FeatureError> {
        Self::all()
            .into_iter()
            .find(|feature| feature.name() == name)
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    /// Instantiate the feature
    pub fn build(&self) -> Arc<dyn WindowFeature> {
        match self {
            StandardFeature::Series(series) => series.build(),
            StandardFeature::Summary(reducer, series) => {
                Arc::new(Summary::new(series.build(), *reducer))
            }
            StandardFeature::Top(series) => Arc::new(TopN::new(series.build(), STOCK_TOP_N)),
            StandardFeature::Hist(series) => {
                Arc::new(Hist::new(series.build(), series.hist_edges()))
            }
            StandardFeature::TotalBwdBytes => Arc::new(TotalBytes::backward()),
            StandardFeature::TotalFwdBytes => Arc::new(TotalBytes::forward()),
        }
    }
}

impl fmt::Display for StandardFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for StandardFeature {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for StandardFeature {
    type Error = FeatureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

impl From<StandardFeature> for String {
    fn from(feature: StandardFeature) -> Self {
        feature.name()
    }
}
