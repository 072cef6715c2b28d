//! A small user-space TCP/IP stack
//!
//! This library provides:
//! - Ethernet II framing
//! - IPv4 headers, ICMP echo and the Internet checksum
//! - TCP and UDP codecs
//! - A single-connection TCP lifecycle with pluggable transport and
//!   diagnostics

pub mod config;
pub mod error;
pub mod iface;
pub mod link;
pub mod network;
pub mod transport;

// Re-export commonly used types
pub use config::{ConnectionConfig, StackConfig};
pub use error::{Error, Result};
pub use iface::{EventSink, LoopbackTransport, NullSink, StackEvent, TracingSink, Transport};
pub use link::{EthernetFrame, MacAddr};
pub use network::icmp::IcmpPacket;
pub use network::ipv4::Ipv4Header;
pub use network::{checksum, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST};
pub use transport::{Connection, TcpFlags, TcpHeader, TcpState, UdpPacket};
