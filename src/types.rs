//! Core types for flow feature extraction
//!
//! This module defines the data that flows into the feature algebra: the flow
//! identity, decoded packet header facts, and named packet windows.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

/// Transport protocol number of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Other,
    Tcp,
    Udp,
}

impl Protocol {
    /// IANA protocol number
    pub fn number(&self) -> u8 {
        match self {
            Protocol::Other => 0,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
        }
    }

    pub fn from_number(number: u8) -> Self {
        match number {
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            _ => Protocol::Other,
        }
    }
}

/// Five-tuple identity of a flow; the tuple order defines the forward direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId {
    /// Source IP address
    pub sip: IpAddr,
    /// Destination IP address
    pub dip: IpAddr,
    /// Source port
    pub sport: u16,
    /// Destination port
    pub dport: u16,
    /// Transport protocol
    pub proto: Protocol,
}

impl FlowId {
    pub fn new(sip: IpAddr, dip: IpAddr, sport: u16, dport: u16, proto: Protocol) -> Self {
        Self {
            sip,
            dip,
            sport,
            dport,
            proto,
        }
    }

    /// The same flow seen from the other end
    pub fn reversed(&self) -> Self {
        Self {
            sip: self.dip,
            dip: self.sip,
            sport: self.dport,
            dport: self.sport,
            proto: self.proto,
        }
    }
}

/// IP layer facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpHeader {
    pub src: IpAddr,
    pub dst: IpAddr,
    /// Total length field (header plus payload, bytes)
    pub total_len: u16,
}

/// TCP layer facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Data offset in 32-bit words
    pub data_offset: u8,
    pub flags: u8,
}

impl TcpHeader {
    /// Header length in bytes
    pub fn header_len(&self) -> u16 {
        u16::from(self.data_offset) * 4
    }
}

/// UDP layer facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Length field (header plus payload, bytes)
    pub len: u16,
}

/// Transport layer of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

const IPV4_HEADER_LEN: u16 = 20;
const UDP_HEADER_LEN: u16 = 8;

/// Length fields are 16 bits; longer payloads saturate at `u16::MAX`.
fn payload_len(payload: &[u8]) -> u16 {
    u16::try_from(payload.len()).unwrap_or(u16::MAX)
}

/// A decoded packet: the header facts the feature algebra reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Capture timestamp (seconds)
    pub timestamp: f64,
    /// IP layer, absent for non-IP frames
    pub ip: Option<IpHeader>,
    /// TCP or UDP layer, absent for other protocols
    pub transport: Option<Transport>,
    /// Transport payload bytes
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.to_bits().hash(state);
        self.ip.hash(state);
        self.transport.hash(state);
        self.payload.hash(state);
    }
}

impl Packet {
    /// A frame without an IP layer
    pub fn non_ip(timestamp: f64) -> Self {
        Self {
            timestamp,
            ip: None,
            transport: None,
            payload: Vec::new(),
        }
    }

    /// A TCP segment with a bare 20-byte IPv4 header.
    ///
    /// Length fields saturate at `u16::MAX` for oversized payloads.
    pub fn tcp(
        timestamp: f64,
        src: (IpAddr, u16),
        dst: (IpAddr, u16),
        flags: u8,
        payload: Vec<u8>,
    ) -> Self {
        let tcp = TcpHeader {
            src_port: src.1,
            dst_port: dst.1,
            data_offset: 5,
            flags,
        };
        let total_len = IPV4_HEADER_LEN
            .saturating_add(tcp.header_len())
            .saturating_add(payload_len(&payload));
        Self {
            timestamp,
            ip: Some(IpHeader {
                src: src.0,
                dst: dst.0,
                total_len,
            }),
            transport: Some(Transport::Tcp(tcp)),
            payload,
        }
    }

    /// A UDP datagram with a bare 20-byte IPv4 header; lengths saturate like [`Packet::tcp`]
    pub fn udp(timestamp: f64, src: (IpAddr, u16), dst: (IpAddr, u16), payload: Vec<u8>) -> Self {
        let len = UDP_HEADER_LEN.saturating_add(payload_len(&payload));
        Self {
            timestamp,
            ip: Some(IpHeader {
                src: src.0,
                dst: dst.0,
                total_len: IPV4_HEADER_LEN.saturating_add(len),
            }),
            transport: Some(Transport::Udp(UdpHeader {
                src_port: src.1,
                dst_port: dst.1,
                len,
            })),
            payload,
        }
    }
}

/// A named, ordered window of packets from one flow.
///
/// The name is the window's identity for memoization: two windows with the same
/// name must hold the same packets. A content fingerprint is taken at
/// construction so the cache can detect a reused name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WindowRecord", into = "WindowRecord")]
pub struct PacketWindow {
    name: String,
    packets: Vec<Packet>,
    fingerprint: u64,
}

impl PacketWindow {
    pub fn new(name: impl Into<String>, packets: Vec<Packet>) -> Self {
        let mut hasher = DefaultHasher::new();
        packets.hash(&mut hasher);
        Self {
            name: name.into(),
            packets,
            fingerprint: hasher.finish(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Hash of the packet contents
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

#[derive(Serialize, Deserialize)]
struct WindowRecord {
    name: String,
    packets: Vec<Packet>,
}

impl From<WindowRecord> for PacketWindow {
    fn from(record: WindowRecord) -> Self {
        PacketWindow::new(record.name, record.packets)
    }
}

impl From<PacketWindow> for WindowRecord {
    fn from(window: PacketWindow) -> Self {
        WindowRecord {
            name: window.name,
            packets: window.packets,
        }
    }
}

/// Prefix a feature name with the window it was computed on.
pub fn window_name(window_id: &str, feature_name: &str) -> String {
    format!("{window_id}_{feature_name}")
}

/// Strip the leading underscore-delimited token (a window id or per-index prefix).
pub fn dewindow_name(feature_name: &str) -> &str {
    match feature_name.split_once('_') {
        Some((_, rest)) => rest,
        None => "",
    }
}
