//! Per-packet features
//!
//! Direction, payload size, and payload entropy of a single packet, each with
//! its theoretical bounds and clip policy.

use crate::clip::Clip;
use crate::packet::PacketFacts;
use crate::types::FlowId;

/// Ceiling on payload size used for bounds (MTU-derived)
pub const MAX_PACKET_SIZE: f64 = 1440.0;

/// Theoretical entropy ceiling for 8-bit bytes
pub const MAX_BYTE_ENTROPY: f64 = 8.0;

/// Fixed UDP header length in bytes
const UDP_HEADER_SIZE: u16 = 8;

/// A scalar feature of one packet
pub trait PerPacketFeature: Send + Sync {
    /// Column name stem, e.g. `Size` in `p3_Size`
    fn name(&self) -> &'static str;
    /// Smallest value the feature can take
    fn min(&self) -> f64;
    /// Largest value the feature can take
    fn max(&self) -> f64;
    fn value_of(&self, fid: &FlowId, pkt: &dyn PacketFacts) -> f64;
    fn clip_policy(&self) -> Clip;

    /// Discretize a continuous value with the thread-local generator
    fn clip(&self, value: f64) -> f64 {
        self.clip_policy().apply(value, &mut rand::thread_rng())
    }
}

/// +1 for packets travelling the flow's forward direction, -1 otherwise, 0 without IP.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direction;

impl PerPacketFeature for Direction {
    fn name(&self) -> &'static str {
        "Direction"
    }

    fn min(&self) -> f64 {
        -1.0
    }

    fn max(&self) -> f64 {
        1.0
    }

    fn value_of(&self, fid: &FlowId, pkt: &dyn PacketFacts) -> f64 {
        let Some(ip) = pkt.ip() else {
            return 0.0;
        };

        let addresses_match = ip.src == fid.sip && ip.dst == fid.dip;
        let forward = match pkt.ports() {
            Some((sport, dport)) => addresses_match && sport == fid.sport && dport == fid.dport,
            None => addresses_match,
        };

        if forward {
            1.0
        } else {
            -1.0
        }
    }

    fn clip_policy(&self) -> Clip {
        Clip::Sign
    }
}

/// Transport payload length in bytes, saturating at [`MAX_PACKET_SIZE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Size;

impl PerPacketFeature for Size {
    fn name(&self) -> &'static str {
        "Size"
    }

    fn min(&self) -> f64 {
        0.0
    }

    fn max(&self) -> f64 {
        MAX_PACKET_SIZE
    }

    fn value_of(&self, _fid: &FlowId, pkt: &dyn PacketFacts) -> f64 {
        let Some(ip) = pkt.ip() else {
            return 0.0;
        };

        let len = if let Some(tcp) = pkt.tcp() {
            ip.total_len.saturating_sub(tcp.header_len())
        } else if let Some(udp) = pkt.udp() {
            udp.len.saturating_sub(UDP_HEADER_SIZE)
        } else {
            0
        };
        f64::from(len).min(MAX_PACKET_SIZE)
    }

    fn clip_policy(&self) -> Clip {
        Clip::RandomRound
    }
}

/// Shannon entropy (bits) of the transport payload's byte distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entropy;

impl Entropy {
    /// Highest entropy a window of `win_size` bytes can reach.
    ///
    /// `max()` reports the 8-bit ceiling, not this value.
    pub fn achievable_max(win_size: usize) -> f64 {
        let distinct = win_size.min(256);
        if distinct <= 1 {
            return 0.0;
        }
        (distinct as f64).log2()
    }
}

impl PerPacketFeature for Entropy {
    fn name(&self) -> &'static str {
        "Entropy"
    }

    fn min(&self) -> f64 {
        0.0
    }

    fn max(&self) -> f64 {
        MAX_BYTE_ENTROPY
    }

    fn value_of(&self, _fid: &FlowId, pkt: &dyn PacketFacts) -> f64 {
        if pkt.has_tcp() || pkt.has_udp() {
            byte_entropy(pkt.payload())
        } else {
            0.0
        }
    }

    fn clip_policy(&self) -> Clip {
        Clip::Clamp {
            min: 0.0,
            max: MAX_BYTE_ENTROPY,
        }
    }
}

/// Shannon entropy (base 2) of a byte string
pub fn byte_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u32; 256];
    for &b in data {
        freq[b as usize] += 1;
    }
    entropy_of_counts(freq.iter().copied().filter(|&f| f > 0), data.len())
}

/// Shannon entropy (base 2) of the distribution of distinct values in `values`.
///
/// Values are compared bit-for-bit, so `0.0` and `-0.0` count separately.
pub fn value_entropy(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut bits: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
    bits.sort_unstable();

    let mut counts = Vec::new();
    let mut run = 1u32;
    for pair in bits.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
        } else {
            counts.push(run);
            run = 1;
        }
    }
    counts.push(run);

    entropy_of_counts(counts.into_iter(), values.len())
}

fn entropy_of_counts(counts: impl Iterator<Item = u32>, total: usize) -> f64 {
    let total = total as f64;
    let entropy: f64 = counts
        .map(|count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    // A single symbol yields -0.0
    entropy.max(0.0)
}
