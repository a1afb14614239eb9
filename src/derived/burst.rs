//! Burst features
//!
//! A burst is a run of consecutive packets travelling in the same direction.

use crate::base::per_packet::{Direction, Size, MAX_PACKET_SIZE};
use crate::base::window::{WindowContext, WindowFeature, Windowized};
use crate::clip::Clip;
use crate::error::FeatureError;

/// Per-packet depth into the current burst.
///
/// Backward packets count up from 0 since the last forward packet. Forward
/// packets count *down* from 0 since the last backward packet, so forward runs
/// produce `0, -1, -2, ...`. Downstream data depends on this asymmetry.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstDepths;

impl WindowFeature for BurstDepths {
    fn id(&self) -> &str {
        "BurstDepth"
    }

    fn base_name(&self) -> &str {
        "BurstDepth"
    }

    fn names(&self, window_size: usize) -> Vec<String> {
        (0..window_size)
            .map(|idx| format!("p{idx}_BurstDepth"))
            .collect()
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        (0..window_size).map(|idx| -(idx as f64)).collect()
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        (0..window_size).map(|idx| idx as f64).collect()
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        vec![Clip::RandomRound; window_size]
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let directions = Windowized::new(Direction).value(ctx)?;
        let mut depths = vec![0.0; ctx.window_size()];
        let mut since_fwd = 0.0;
        let mut since_bwd = 0.0;

        for (depth, &direction) in depths.iter_mut().zip(&directions) {
            if direction > 0.0 {
                *depth = since_bwd;
                since_bwd -= 1.0;
                since_fwd = 0.0;
            } else if direction < 0.0 {
                *depth = since_fwd;
                since_fwd += 1.0;
                since_bwd = 0.0;
            }
        }

        Ok(depths)
    }
}

/// Signed byte total of each completed burst, in burst order.
///
/// Forward bursts are positive and backward bursts negative. A burst is emitted
/// when the direction changes, so a burst still open at the end of the window
/// is not reported unless zero-filled slots close it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirSignBurstBytes;

impl DirSignBurstBytes {
    /// Slot `k` needs `k` earlier bursts and a closing packet, leaving at most
    /// `n - 1 - k` packets for the burst itself.
    fn slot_bound(window_size: usize) -> Vec<f64> {
        (0..window_size)
            .map(|k| (window_size - 1 - k) as f64 * MAX_PACKET_SIZE)
            .collect()
    }
}

impl WindowFeature for DirSignBurstBytes {
    fn id(&self) -> &str {
        "DirSignBurstBytes"
    }

    fn base_name(&self) -> &str {
        "DirSignBurstBytes"
    }

    fn names(&self, window_size: usize) -> Vec<String> {
        (0..window_size)
            .map(|idx| format!("b{idx}_DirSignBurstBytes"))
            .collect()
    }

    fn min(&self, window_size: usize) -> Vec<f64> {
        Self::slot_bound(window_size)
            .into_iter()
            .map(|bound| -bound)
            .collect()
    }

    fn max(&self, window_size: usize) -> Vec<f64> {
        Self::slot_bound(window_size)
    }

    fn clip(&self, window_size: usize) -> Vec<Clip> {
        Windowized::new(Size).clip(window_size)
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> Result<Vec<f64>, FeatureError> {
        let directions = Windowized::new(Direction).value(ctx)?;
        let sizes = Windowized::new(Size).value(ctx)?;
        let mut bursts = vec![0.0; ctx.window_size()];

        // 0 means no burst has started yet
        let mut current_dir = 0.0;
        let mut current_sum = 0.0;
        let mut emitted = 0;
        for (&direction, &size) in directions.iter().zip(&sizes) {
            if direction == current_dir {
                current_sum += size;
                continue;
            }
            if current_dir != 0.0 {
                if let Some(slot) = bursts.get_mut(emitted) {
                    *slot = current_dir * current_sum;
                }
                emitted += 1;
            }
            current_sum = size;
            current_dir = direction;
        }

        Ok(bursts)
    }
}
