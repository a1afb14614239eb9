//! Flow Features - Windowed feature algebra for network traffic flows
//!
//! Turns a window of packets from one flow into a fixed-width, named, bounded
//! feature vector, and maps such vectors to a standardized range and back.
//!
//! ## Modules
//!
//! - **Base features**: per-packet direction, size, and payload entropy, lifted
//!   to whole windows by [`Windowized`]
//! - **Derived features**: summary, top-N, and histogram combinators plus burst,
//!   signed-size, and inter-arrival composites
//! - **Scaling**: [`ScaleParams`] and [`BaseData`] for normalization and
//!   discretization of generated values

pub mod base;
pub mod cache;
pub mod catalog;
pub mod clip;
pub mod config;
pub mod derived;
pub mod error;
pub mod packet;
pub mod pipeline;
pub mod scale;
pub mod types;

pub use base::{
    Direction, Entropy, FeatureColumns, PerPacketFeature, Size, WindowContext, WindowFeature,
    Windowized,
};
pub use cache::{CacheStats, FeatureCache};
pub use catalog::{Series, StandardFeature};
pub use clip::Clip;
pub use config::ExtractorConfig;
pub use derived::{
    BurstDepths, DirSignBurstBytes, DirSignSizes, Hist, Iats, Reducer, Summary, TopN, TotalBytes,
};
pub use error::FeatureError;
pub use packet::PacketFacts;
pub use pipeline::{extract_features, FeatureExtractor, FeatureSet, FeatureVector};
pub use scale::{BaseData, ScaleParams};
pub use types::{dewindow_name, window_name, FlowId, Packet, PacketWindow, Protocol};

/// Crate version, recorded alongside persisted scale parameters and configs
pub const FEATURES_VERSION: &str = env!("CARGO_PKG_VERSION");
