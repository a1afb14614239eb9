//! Error types for flow feature extraction

use thiserror::Error;

/// Errors that can occur while computing, scaling, or aligning features.
///
/// Malformed packets and degenerate aggregates are not errors: they map to
/// neutral values. Everything here is a broken contract between caller and
/// library (bad shapes, reused window names, mismatched scalers).
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(
        "Feature {feature} has inconsistent shape: {names} names, {values} values, {min} min bounds, {max} max bounds"
    )]
    ShapeMismatch {
        feature: String,
        names: usize,
        values: usize,
        min: usize,
        max: usize,
    },

    #[error("Window {window} holds {packets} packets but the window size is {window_size}")]
    WindowTooLong {
        window: String,
        packets: usize,
        window_size: usize,
    },

    #[error("Window name {window} was reused for different packet contents")]
    WindowIdentityConflict { window: String },

    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index {index} out of range for {len} scale parameters")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(
        "Base data components differ in length: {directions} directions, {sizes} sizes, {entropies} entropies"
    )]
    UnevenBaseData {
        directions: usize,
        sizes: usize,
        entropies: usize,
    },

    #[error("Cannot split an array of length {len} into three equal parts")]
    BaseDataSplit { len: usize },

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Column {index} mismatch: expected {expected}, got {actual}")]
    ColumnMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
