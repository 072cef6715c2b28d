//! Diagnostics sink for lifecycle and packet events.
//!
//! A connection never logs through process-wide state. It reports to the
//! [`EventSink`] it was built with, and the sink decides what to do.

use std::fmt;
use std::net::SocketAddrV4;

use tracing::{debug, info};

use crate::transport::TcpState;

/// Direction of a packet relative to the local host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("SEND"),
            Direction::Recv => f.write_str("RECV"),
        }
    }
}

/// Structured event emitted by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// The connection entered `state`
    Connection {
        state: TcpState,
        local: SocketAddrV4,
        remote: SocketAddrV4,
    },
    /// Application payload crossed the connection
    Packet {
        direction: Direction,
        protocol: &'static str,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        len: usize,
    },
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEvent::Connection {
                state,
                local,
                remote,
            } => write!(f, "{} connection: {} -> {}", state, local, remote),
            StackEvent::Packet {
                direction,
                protocol,
                src,
                dst,
                len,
            } => write!(
                f,
                "{} {} packet: {} -> {} ({} bytes)",
                direction, protocol, src, dst, len
            ),
        }
    }
}

/// Write-only consumer of [`StackEvent`]s
pub trait EventSink: Send + Sync {
    fn record(&self, event: &StackEvent);
}

/// Forwards events to `tracing`
///
/// State changes are logged at `info`, packets at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &StackEvent) {
        match event {
            StackEvent::Connection {
                state,
                local,
                remote,
            } => {
                info!(state = %state, local = %local, remote = %remote, "connection state changed");
            }
            StackEvent::Packet {
                direction,
                protocol,
                src,
                dst,
                len,
            } => {
                debug!(
                    direction = %direction,
                    protocol = *protocol,
                    src = %src,
                    dst = %dst,
                    len = *len,
                    "packet"
                );
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &StackEvent) {}
}
