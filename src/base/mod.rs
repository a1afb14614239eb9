//! Base features: per-packet scalars and their lift to whole windows

pub mod per_packet;
pub mod window;

pub use per_packet::{
    byte_entropy, value_entropy, Direction, Entropy, PerPacketFeature, Size, MAX_BYTE_ENTROPY,
    MAX_PACKET_SIZE,
};
pub use window::{FeatureColumns, WindowContext, WindowFeature, Windowized};
