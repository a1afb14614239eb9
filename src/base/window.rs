//! Window features
//!
//! A [`WindowFeature`] turns one packet window into a fixed-length vector with
//! matching names, bounds, and clip policies. [`Windowized`] lifts any
//! [`PerPacketFeature`] into one.

use crate::base::per_packet::PerPacketFeature;
use crate::cache::FeatureCache;
use crate::clip::Clip;
use crate::error::FeatureError;
use crate::types::{FlowId, PacketWindow};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything a window feature is evaluated against.
#[derive(Clone, Copy)]
pub struct WindowContext<'a> {
    fid: &'a FlowId,
    window: &'a PacketWindow,
    window_size: usize,
    cache: Option<&'a FeatureCache>,
}

impl<'a> WindowContext<'a> {
    /// Fails if the window holds more packets than `window_size`.
    pub fn new(
        fid: &'a FlowId,
        window: &'a PacketWindow,
        window_size: usize,
    ) -> Result<Self, FeatureError> {
        if window.len() > window_size {
            return Err(FeatureError::WindowTooLong {
                window: window.name().to_string(),
                packets: window.len(),
                window_size,
            });
        }
        Ok(Self {
            fid,
            window,
            window_size,
            cache: None,
        })
    }

    /// Route every feature evaluation through `cache`
    pub fn with_cache(mut self, cache: &'a FeatureCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fid(&self) -> &'a FlowId {
        self.fid
    }

    pub fn window(&self) -> &'a PacketWindow {
        self.window
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn cache(&self) -> Option<&'a FeatureCache> {
        self.cache
    }
}

/// A feature computed over a whole packet window.
///
/// For a given window size, `names`, `min`, `max`, `clip`, and the computed
/// values all have the same length. Values must be a pure function of
/// `(flow id, window, window size)`; the cache depends on it.
pub trait WindowFeature: Send + Sync {
    /// Identity of the feature for memoization; distinct configurations get distinct ids
    fn id(&self) -> &str;

    /// Name stem derived features build their column names from
    fn base_name(&self) -> &str;

    fn names(&self, window_size: usize) -> Vec<String>;

    fn min(&self, window_size: usize) -> Vec<f64>;

    fn max(&self, window_size: usize) -> Vec<f64>;

    fn clip(&self, window_size: usize) -> Vec<Clip>;

    /// Compute the vector without consulting the cache
    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError>;

    /// The feature's vector for this window, memoized when the context carries a cache
    fn value(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        match ctx.cache() {
            Some(cache) => cache.get_or_compute(self.id(), ctx, || self.compute(ctx)),
            None => self.compute(ctx),
        }
    }

    /// Names, values, bounds, and clip policies in one shape-checked bundle
    fn columns(&self, ctx: &WindowContext<'_>) -> Result<FeatureColumns, FeatureError> {
        let n = ctx.window_size();
        let columns = FeatureColumns {
            names: self.names(n),
            values: self.value(ctx)?,
            min: self.min(n),
            max: self.max(n),
            clip: self.clip(n),
        };
        columns.check_shape(self.id())?;
        Ok(columns)
    }
}

/// One feature's output for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub names: Vec<String>,
    pub values: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub clip: Vec<Clip>,
}

impl FeatureColumns {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every vector must have one entry per column name.
    pub fn check_shape(&self, feature: &str) -> Result<(), FeatureError> {
        let n = self.names.len();
        if self.values.len() == n
            && self.min.len() == n
            && self.max.len() == n
            && self.clip.len() == n
        {
            return Ok(());
        }
        warn!(feature, "feature produced vectors of different lengths");
        Err(FeatureError::ShapeMismatch {
            feature: feature.to_string(),
            names: n,
            values: self.values.len(),
            min: self.min.len(),
            max: self.max.len(),
        })
    }
}

/// A per-packet feature evaluated at every position of the window.
///
/// Positions past the window's last packet are zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Windowized<F> {
    feature: F,
}

impl<F: PerPacketFeature> Windowized<F> {
    pub fn new(feature: F) -> Self {
        Self { feature }
    }

    pub fn feature(&self) -> &F {
        &self.feature
    }
}

impl<F: PerPacketFeature> WindowFeature for Windowized<F> {
    fn id(&self) -> &str {
        self.feature.name()
    }

    fn base_name(&self) -> &str {
        self.feature.name()
    }

    fn names(&self, window_size: usize) -> Vec<String> {
        (0..window_size)
            .map(|idx| format!("p{idx}_{}", self.feature.name()))
            .collect()
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        vec![self.feature.min(); window_size]
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        vec![self.feature.max(); window_size]
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        vec![self.feature.clip_policy(); window_size]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let mut data = vec![0.0; ctx.window_size()];
        for (slot, pkt) in data.iter_mut().zip(ctx.window().packets()) {
            *slot = self.feature.value_of(ctx.fid(), pkt);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::per_packet::{Direction, Size};
    use crate::types::{Packet, Protocol};
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpoints() -> ((IpAddr, u16), (IpAddr, u16)) {
        (
            (IpAddr::V4(Ipv4Addr::new(172, 16, 0, 2)), 5000),
            (IpAddr::V4(Ipv4Addr::new(172, 16, 0, 3)), 80),
        )
    }

    fn sample() -> (FlowId, PacketWindow) {
        let (c, s) = endpoints();
        let fid = FlowId::new(c.0, s.0, c.1, s.1, Protocol::Tcp);
        let window = PacketWindow::new(
            "w",
            vec![
                Packet::tcp(0.0, c, s, 0x02, vec![]),
                Packet::tcp(0.1, s, c, 0x12, vec![0; 10]),
                Packet::tcp(0.2, c, s, 0x10, vec![0; 30]),
            ],
        );
        (fid, window)
    }

    #[test]
    fn test_windowized_zero_fills() {
        let (fid, window) = sample();
        let ctx = WindowContext::new(&fid, &window, 5).unwrap();
        let sizes = Windowized::new(Size).value(&ctx).unwrap();
        // Size counts the TCP header on top of the payload
        assert_eq!(sizes, vec![20.0, 30.0, 50.0, 0.0, 0.0]);
        let dirs = Windowized::new(Direction).value(&ctx).unwrap();
        assert_eq!(dirs, vec![1.0, -1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_windowized_names_and_bounds() {
        let sizes = Windowized::new(Size);
        assert_eq!(sizes.names(3), vec!["p0_Size", "p1_Size", "p2_Size"]);
        assert_eq!(sizes.min(2), vec![0.0, 0.0]);
        assert_eq!(sizes.max(2), vec![1440.0, 1440.0]);
        assert_eq!(sizes.clip(2), vec![Clip::RandomRound; 2]);
        assert_eq!(sizes.base_name(), "Size");
    }

    #[test]
    fn test_window_longer_than_size_is_rejected() {
        let (fid, window) = sample();
        let err = WindowContext::new(&fid, &window, 2).err().unwrap();
        assert!(matches!(err, FeatureError::WindowTooLong { packets: 3, .. }));
    }

    #[test]
    fn test_columns_are_shape_checked() {
        let (fid, window) = sample();
        let ctx = WindowContext::new(&fid, &window, 4).unwrap();
        let columns = Windowized::new(Direction).columns(&ctx).unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns.clip, vec![Clip::Sign; 4]);
    }

    #[test]
    fn test_shape_mismatch_detected() {
        let columns = FeatureColumns {
            names: vec!["a".into(), "b".into()],
            values: vec![1.0],
            min: vec![0.0, 0.0],
            max: vec![1.0, 1.0],
            clip: vec![Clip::Identity; 2],
        };
        assert!(matches!(
            columns.check_shape("broken"),
            Err(FeatureError::ShapeMismatch { values: 1, .. })
        ));
    }
}
