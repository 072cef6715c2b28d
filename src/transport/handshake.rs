//! Active-open strategies.
//!
//! [`Connection::connect`](super::Connection::connect) sends a SYN and then
//! asks its [`Handshake`] for the peer's initial sequence number. Swapping
//! the strategy is how a segment-driven handshake replaces the in-process
//! one.

use crate::error::Result;
use crate::transport::tcp::TcpHeader;

/// Completes an active open
pub trait Handshake: Send {
    /// Called after `syn` has been framed. Returns the peer's initial
    /// sequence number as carried in its SYN+ACK.
    fn active_open(&mut self, syn: &TcpHeader) -> Result<u32>;
}

/// In-process handshake that never talks to a peer
///
/// The locally generated SYN stands in for the peer's SYN+ACK, so the
/// returned sequence number is the SYN's own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedHandshake;

impl Handshake for SimulatedHandshake {
    fn active_open(&mut self, syn: &TcpHeader) -> Result<u32> {
        Ok(syn.seq_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tcp::TcpFlags;

    #[test]
    fn test_simulated_handshake_echoes_syn() {
        let syn = TcpHeader::new(1, 2, 0xDEAD_BEEF, 0, TcpFlags::SYN, 100);
        assert_eq!(SimulatedHandshake.active_open(&syn).unwrap(), 0xDEAD_BEEF);
    }
}
