//! Direction-signed packet sizes and the byte totals built from them

use crate::base::per_packet::{Direction, PerPacketFeature, Size};
use crate::base::window::{WindowContext, WindowFeature, Windowized};
use crate::clip::Clip;
use crate::derived::summary::Reducer;
use crate::error::FeatureError;

/// Payload size multiplied by direction: forward positive, backward negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirSignSizes;

impl WindowFeature for DirSignSizes {
    fn id(&self) -> &str {
        "DirSignSize"
    }

    fn base_name(&self) -> &str {
        "DirSignSize"
    }

    fn names(&self, window_size: usize) -> Vec<String> {
        (0..window_size)
            .map(|idx| format!("p{idx}_DirSignSize"))
            .collect()
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        vec![Direction.min() * Size.max(); window_size]
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        vec![Direction.max() * Size.max(); window_size]
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        Windowized::new(Size).clip(window_size)
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let directions = Windowized::new(Direction).value(ctx)?;
        let sizes = Windowized::new(Size).value(ctx)?;
        Ok(directions
            .iter()
            .zip(&sizes)
            .map(|(direction, size)| direction * size)
            .collect())
    }
}

/// Total payload bytes moving one way through the window.
#[derive(Debug, Clone, Copy)]
pub struct TotalBytes {
    backward: bool,
}

/// Total backward payload bytes, reported as a non-negative number
pub const TOTAL_BWD_BYTES: TotalBytes = TotalBytes { backward: true };

/// Total forward payload bytes
pub const TOTAL_FWD_BYTES: TotalBytes = TotalBytes { backward: false };

impl TotalBytes {
    pub fn backward() -> Self {
        TOTAL_BWD_BYTES
    }

    pub fn forward() -> Self {
        TOTAL_FWD_BYTES
    }

    fn label(&self) -> &'static str {
        if self.backward {
            "TotalBwdBytes"
        } else {
            "TotalFwdBytes"
        }
    }
}

impl WindowFeature for TotalBytes {
    fn id(&self) -> &str {
        self.label()
    }

    fn base_name(&self) -> &str {
        self.label()
    }

    fn names(&self, _window_size: usize) -> Vec<String> {
        vec![self.label().to_string()]
    }

    fn min(&self, _window_size: usize) -> Vec<f64> {
        vec![0.0]
    }

    /// Every slot carrying a full-size packet in this direction
    fn max(&self, window_size: usize) -> Vec<f64> {
        let sizes = Windowized::new(Size);
        let (_, max) = Reducer::Sum.bounds(&sizes.min(window_size), &sizes.max(window_size));
        vec![max]
    }

    fn clip(&self, _window_size: usize) -> Vec<Clip> {
        vec![Clip::RandomRound]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let signed = DirSignSizes.value(ctx)?;
        let total = if self.backward {
            signed.iter().filter(|v| **v < 0.0).map(|v| -v).sum()
        } else {
            signed.iter().filter(|v| **v > 0.0).sum()
        };
        Ok(vec![total])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureCache;
    use crate::types::{FlowId, Packet, PacketWindow, Protocol};
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};

    fn sample() -> (FlowId, PacketWindow) {
        let c = (IpAddr::V4(Ipv4Addr::new(192, 168, 7, 10)), 61000);
        let s = (IpAddr::V4(Ipv4Addr::new(192, 168, 7, 1)), 8080);
        let fid = FlowId::new(c.0, s.0, c.1, s.1, Protocol::Tcp);
        let window = PacketWindow::new(
            "signed",
            vec![
                Packet::tcp(0.0, c, s, 0x18, vec![0; 120]),
                Packet::tcp(0.2, s, c, 0x18, vec![0; 900]),
                Packet::tcp(0.3, s, c, 0x18, vec![0; 100]),
                Packet::tcp(0.4, c, s, 0x10, vec![0; 30]),
            ],
        );
        (fid, window)
    }

    #[test]
    fn test_dir_sign_sizes() {
        let (fid, window) = sample();
        let ctx = WindowContext::new(&fid, &window, 6).unwrap();
        assert_eq!(
            DirSignSizes.value(&ctx).unwrap(),
            vec![140.0, -920.0, -120.0, 50.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_dir_sign_sizes_bounds() {
        assert_eq!(DirSignSizes.min(2), vec![-1440.0, -1440.0]);
        assert_eq!(DirSignSizes.max(2), vec![1440.0, 1440.0]);
        assert_eq!(DirSignSizes.names(2), vec!["p0_DirSignSize", "p1_DirSignSize"]);
    }

    #[test]
    fn test_total_bytes_per_direction() {
        let (fid, window) = sample();
        let cache = FeatureCache::new(4);
        let ctx = WindowContext::new(&fid, &window, 6)
            .unwrap()
            .with_cache(&cache);

        assert_eq!(TotalBytes::backward().value(&ctx).unwrap(), vec![1040.0]);
        assert_eq!(TotalBytes::forward().value(&ctx).unwrap(), vec![190.0]);
        // Both totals read the same signed sizes
        assert!(cache.stats().hits >= 1);
    }

    #[test]
    fn test_total_bytes_shape() {
        let bwd = TotalBytes::backward();
        assert_eq!(bwd.names(10), vec!["TotalBwdBytes"]);
        assert_eq!(bwd.min(10), vec![0.0]);
        assert_eq!(bwd.max(10), vec![14400.0]);
        assert_eq!(bwd.clip(10), vec![Clip::RandomRound]);
        assert_eq!(TotalBytes::forward().id(), "TotalFwdBytes");
    }
}
