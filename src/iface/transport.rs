//! Packet transport seam.
//!
//! A [`Transport`] accepts fully framed IPv4 packets for transmission. Inbound
//! packets flow the other way through
//! [`Connection::deliver`](crate::transport::Connection::deliver).

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// Outbound half of a link
pub trait Transport: Send {
    /// Hand one encoded IPv4 packet to the link
    fn transmit(&mut self, packet: &[u8]) -> io::Result<()>;
}

/// In-memory transport that queues every transmitted packet
///
/// Clones share the same queue, so one handle can be given to a connection
/// while another drains it.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest queued packet
    pub fn pop(&self) -> Option<Vec<u8>> {
        self.lock().pop_front()
    }

    /// Remove and return every queued packet in transmission order
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for LoopbackTransport {
    fn transmit(&mut self, packet: &[u8]) -> io::Result<()> {
        self.lock().push_back(packet.to_vec());
        Ok(())
    }
}
