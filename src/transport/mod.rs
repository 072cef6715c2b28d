//! Transport layer protocols implementation
//!
//! This module contains implementations for transport layer protocols:
//! - TCP: header codec, connection states and the connection itself
//! - UDP: User Datagram Protocol

pub mod connection;
pub mod handshake;
pub mod state;
pub mod tcp;
pub mod udp;

// Re-export commonly used items
pub use connection::Connection;
pub use handshake::{Handshake, SimulatedHandshake};
pub use state::{Event, TcpState};
pub use tcp::{TcpFlags, TcpHeader};
pub use udp::UdpPacket;
