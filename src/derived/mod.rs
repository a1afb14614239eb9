//! Derived features
//!
//! Combinators ([`Summary`], [`TopN`], [`Hist`]) wrap any window feature.
//! The composite features read the windowized base features and build
//! burst, signed-size, and timing views of the window.

pub mod burst;
pub mod dir_sign;
pub mod hist;
pub mod iat;
pub mod summary;
pub mod top_n;

pub use burst::{BurstDepths, DirSignBurstBytes};
pub use dir_sign::{DirSignSizes, TotalBytes, TOTAL_BWD_BYTES, TOTAL_FWD_BYTES};
pub use hist::Hist;
pub use iat::{Iats, IAT_BOUND_SECS};
pub use summary::{Reducer, Summary};
pub use top_n::TopN;
