//! Packet facts
//!
//! Per-packet features never look at raw bytes. They ask a [`PacketFacts`]
//! implementation which layers are present and what their header fields hold.
//! Decoding captures into these facts happens upstream of this crate.

use crate::types::{IpHeader, Packet, TcpHeader, Transport, UdpHeader};

/// Layer presence and header fields of a single packet
pub trait PacketFacts {
    fn ip(&self) -> Option<IpHeader>;
    fn tcp(&self) -> Option<TcpHeader>;
    fn udp(&self) -> Option<UdpHeader>;
    /// Transport payload bytes (empty when there is no transport layer)
    fn payload(&self) -> &[u8];
    /// Capture timestamp in seconds
    fn timestamp(&self) -> f64;

    fn has_ip(&self) -> bool {
        self.ip().is_some()
    }

    fn has_tcp(&self) -> bool {
        self.tcp().is_some()
    }

    fn has_udp(&self) -> bool {
        self.udp().is_some()
    }

    /// Source and destination port of the TCP or UDP layer
    fn ports(&self) -> Option<(u16, u16)> {
        self.udp()
            .map(|udp| (udp.src_port, udp.dst_port))
            .or_else(|| self.tcp().map(|tcp| (tcp.src_port, tcp.dst_port)))
    }
}

impl PacketFacts for Packet {
    fn ip(&self) -> Option<IpHeader> {
        self.ip
    }

    fn tcp(&self) -> Option<TcpHeader> {
        match self.transport {
            Some(Transport::Tcp(tcp)) if self.ip.is_some() => Some(tcp),
            _ => None,
        }
    }

    fn udp(&self) -> Option<UdpHeader> {
        match self.transport {
            Some(Transport::Udp(udp)) if self.ip.is_some() => Some(udp),
            _ => None,
        }
    }

    fn payload(&self) -> &[u8] {
        if self.transport.is_some() {
            &self.payload
        } else {
            &[]
        }
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}
