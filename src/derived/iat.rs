//! Inter-arrival times

use crate::base::per_packet::Direction;
use crate::base::window::{WindowContext, WindowFeature, Windowized};
use crate::clip::Clip;
use crate::error::FeatureError;
use crate::packet::PacketFacts;

/// Ceiling on an inter-arrival time, in seconds. Longer gaps saturate.
pub const IAT_BOUND_SECS: f64 = 1.0;

/// Seconds since the previous packet travelling the same direction.
///
/// The first packet seen in each direction gets 0, as do zero-filled slots.
/// A timestamp earlier than its predecessor yields 0 rather than a negative gap,
/// and gaps longer than [`IAT_BOUND_SECS`] report the bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iats;

impl WindowFeature for Iats {
    fn id(&self) -> &str {
        "IAT"
    }

    fn base_name(&self) -> &str {
        "IAT"
    }

    fn names(&self, window_size: usize) -> Vec<String> {
        (0..window_size).map(|idx| format!("p{idx}_IAT")).collect()
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        vec![0.0; window_size]
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        vec![IAT_BOUND_SECS; window_size]
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        vec![Clip::Identity; window_size]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let directions = Windowized::new(Direction).value(ctx)?;
        let mut iats = vec![0.0; ctx.window_size()];
        let mut last_fwd: Option<f64> = None;
        let mut last_bwd: Option<f64> = None;

        for ((slot, pkt), &direction) in iats
            .iter_mut()
            .zip(ctx.window().packets())
            .zip(&directions)
        {
            let ts = pkt.timestamp();
            // Packets without a direction are grouped with backward traffic
            let last = if direction > 0.0 {
                &mut last_fwd
            } else {
                &mut last_bwd
            };
            if let Some(prev) = last.replace(ts) {
                *slot = (ts - prev).clamp(0.0, IAT_BOUND_SECS);
            }
        }

        Ok(iats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlowId, Packet, PacketWindow, Protocol};
    use std::net::{IpAddr, Ipv4Addr};

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn flow_window(timed: &[(f64, bool)]) -> (FlowId, PacketWindow) {
        let c = (IpAddr::V4(Ipv4Addr::new(10, 20, 0, 1)), 3000);
        let s = (IpAddr::V4(Ipv4Addr::new(10, 20, 0, 2)), 4000);
        let fid = FlowId::new(c.0, s.0, c.1, s.1, Protocol::Udp);
        let packets = timed
            .iter()
            .map(|&(ts, forward)| {
                if forward {
                    Packet::udp(ts, c, s, vec![1])
                } else {
                    Packet::udp(ts, s, c, vec![1])
                }
            })
            .collect();
        (fid, PacketWindow::new("iat", packets))
    }

    #[test]
    fn test_iats_per_direction() {
        let (fid, window) = flow_window(&[
            (10.0, true),
            (10.1, false),
            (10.25, true),
            (10.5, false),
            (10.55, false),
        ]);
        let ctx = WindowContext::new(&fid, &window, 6).unwrap();
        let iats = Iats.value(&ctx).unwrap();
        assert!(close(&iats, &[0.0, 0.0, 0.25, 0.4, 0.05, 0.0]), "{iats:?}");
    }

    #[test]
    fn test_out_of_order_timestamps_clamp_to_zero() {
        let (fid, window) = flow_window(&[(5.0, true), (4.0, true), (4.5, true)]);
        let ctx = WindowContext::new(&fid, &window, 3).unwrap();
        let iats = Iats.value(&ctx).unwrap();
        assert!(close(&iats, &[0.0, 0.0, 0.5]), "{iats:?}");
    }

    #[test]
    fn test_long_gaps_saturate_at_bound() {
        let (fid, window) = flow_window(&[(0.0, true), (2.5, true), (60.0, false), (61.0, false)]);
        let ctx = WindowContext::new(&fid, &window, 4).unwrap();
        let iats = Iats.value(&ctx).unwrap();
        assert_eq!(iats, vec![0.0, IAT_BOUND_SECS, 0.0, 1.0]);
        assert!(iats.iter().zip(Iats.max(4)).all(|(v, max)| *v <= max));
    }

    #[test]
    fn test_non_ip_packets_share_backward_tracker() {
        let c = (IpAddr::V4(Ipv4Addr::new(10, 20, 0, 1)), 3000);
        let s = (IpAddr::V4(Ipv4Addr::new(10, 20, 0, 2)), 4000);
        let fid = FlowId::new(c.0, s.0, c.1, s.1, Protocol::Udp);
        let window = PacketWindow::new(
            "mixed",
            vec![Packet::udp(1.0, s, c, vec![]), Packet::non_ip(1.5)],
        );
        let ctx = WindowContext::new(&fid, &window, 2).unwrap();
        assert!(close(&Iats.value(&ctx).unwrap(), &[0.0, 0.5]));
    }

    #[test]
    fn test_iat_shape() {
        assert_eq!(Iats.names(2), vec!["p0_IAT", "p1_IAT"]);
        assert_eq!(Iats.min(3), vec![0.0; 3]);
        assert_eq!(Iats.max(3), vec![1.0; 3]);
        assert_eq!(Iats.clip(1), vec![Clip::Identity]);
    }
}
