//! Single TCP connection lifecycle.
//!
//! A [`Connection`] owns the sequence counters, windows and buffers of one
//! local/remote endpoint pair and moves through [`TcpState`]s in response to
//! `connect`, `listen`, `send`, `receive` and `close`.
//!
//! All mutable state sits behind one mutex. Every public method holds it for
//! its whole duration, including while callbacks run, so a callback must not
//! call back into the same connection.
//!
//! Outbound segments are framed as IPv4 packets and handed to the attached
//! [`Transport`], if any. Each operation transmits before it commits any
//! bookkeeping, so a transport failure leaves the connection untouched.

use std::fmt;
use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::iface::{Direction, EventSink, StackEvent, TracingSink, Transport};
use crate::network::ipv4::IPV4_HEADER_LEN;
use crate::network::{protocol, Ipv4Header};
use crate::transport::handshake::{Handshake, SimulatedHandshake};
use crate::transport::state::TcpState;
use crate::transport::tcp::{TcpFlags, TcpHeader, TCP_HEADER_LEN};

type StateCallback = Box<dyn FnMut(TcpState) + Send>;
type DataCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Everything guarded by the connection lock
struct Inner {
    state: TcpState,
    send_sequence: u32,
    receive_sequence: u32,
    send_window: u16,
    receive_window: u16,
    send_buffer: Vec<u8>,
    receive_buffer: Vec<u8>,
    // Tracked only; no congestion control acts on them
    congestion_window: u16,
    slow_start_threshold: u16,
    on_state_change: Option<StateCallback>,
    on_data_received: Option<DataCallback>,
    transport: Option<Box<dyn Transport>>,
    handshake: Box<dyn Handshake>,
}

/// A single TCP connection
pub struct Connection {
    local: SocketAddrV4,
    remote: SocketAddrV4,
    config: ConnectionConfig,
    sink: Arc<dyn EventSink>,
    inner: Mutex<Inner>,
}

impl Connection {
    /// Create a connection in the CLOSED state with default configuration
    pub fn new(local: SocketAddrV4, remote: SocketAddrV4) -> Self {
        Self::with_config(local, remote, ConnectionConfig::default())
    }

    /// Create a connection in the CLOSED state
    pub fn with_config(local: SocketAddrV4, remote: SocketAddrV4, config: ConnectionConfig) -> Self {
        let inner = Inner {
            state: TcpState::Closed,
            send_sequence: 0,
            receive_sequence: 0,
            send_window: config.send_window,
            receive_window: config.receive_window,
            send_buffer: Vec::with_capacity(config.buffer_capacity),
            receive_buffer: Vec::with_capacity(config.buffer_capacity),
            congestion_window: config.initial_congestion_window,
            slow_start_threshold: config.slow_start_threshold,
            on_state_change: None,
            on_data_received: None,
            transport: None,
            handshake: Box::new(SimulatedHandshake),
        };

        Connection {
            local,
            remote,
            config,
            sink: Arc::new(TracingSink),
            inner: Mutex::new(inner),
        }
    }

    /// Report lifecycle and packet events to `sink` instead of `tracing`
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Transmit framed segments through `transport`
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.inner_mut().transport = Some(Box::new(transport));
        self
    }

    /// Replace the in-process handshake used by [`Connection::connect`]
    pub fn with_handshake(mut self, handshake: impl Handshake + 'static) -> Self {
        self.inner_mut().handshake = Box::new(handshake);
        self
    }

    /// Register the state-change callback, replacing any previous one
    pub fn on_state_change(&self, callback: impl FnMut(TcpState) + Send + 'static) {
        self.lock().on_state_change = Some(Box::new(callback));
    }

    /// Register the data-received callback, replacing any previous one
    pub fn on_data_received(&self, callback: impl FnMut(&[u8]) + Send + 'static) {
        self.lock().on_data_received = Some(Box::new(callback));
    }

    /// Active open
    ///
    /// Valid only from CLOSED. Picks a random initial sequence number, sends
    /// a SYN and lets the handshake strategy supply the peer's sequence
    /// number, then acknowledges it and enters ESTABLISHED.
    pub fn connect(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != TcpState::Closed {
            return Err(Error::InvalidState {
                operation: "connect",
                state: inner.state,
            });
        }

        let isn: u32 = rand::random();
        let syn = self.header(TcpFlags::SYN, isn, 0, inner.send_window);
        self.transmit(&mut inner, &syn, &[])?;
        self.record_state(TcpState::SynSent);

        let peer_isn = inner.handshake.active_open(&syn)?;
        let receive_sequence = peer_isn.wrapping_add(1);

        let ack = self.header(TcpFlags::ACK, isn, receive_sequence, inner.send_window);
        self.transmit(&mut inner, &ack, &[])?;

        inner.send_sequence = isn;
        inner.receive_sequence = receive_sequence;
        self.enter(&mut inner, TcpState::Established);
        Ok(())
    }

    /// Passive open
    ///
    /// Moves to LISTEN from any state. Accepting a peer is left to the
    /// caller.
    pub fn listen(&self) -> Result<()> {
        let mut inner = self.lock();
        self.enter(&mut inner, TcpState::Listen);
        Ok(())
    }

    /// Queue application data for the peer
    ///
    /// Valid only in ESTABLISHED. The data is framed as one PSH+ACK segment
    /// at the current send sequence, which then advances by its length.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != TcpState::Established {
            return Err(Error::InvalidState {
                operation: "send",
                state: inner.state,
            });
        }

        let segment = self.header(
            TcpFlags::PSH | TcpFlags::ACK,
            inner.send_sequence,
            inner.receive_sequence,
            inner.send_window,
        );
        self.transmit(&mut inner, &segment, data)?;

        inner.send_buffer.extend_from_slice(data);
        inner.send_sequence = inner.send_sequence.wrapping_add(data.len() as u32);

        self.sink.record(&StackEvent::Packet {
            direction: Direction::Send,
            protocol: "TCP",
            src: self.local,
            dst: self.remote,
            len: data.len(),
        });
        Ok(())
    }

    /// Accept payload from the peer
    ///
    /// Accepted in every state. The payload is buffered, the receive
    /// sequence advances by its length, an ACK is framed and the
    /// data-received callback runs with the raw payload.
    pub fn receive(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();

        let receive_sequence = inner.receive_sequence.wrapping_add(data.len() as u32);
        let ack = self.header(
            TcpFlags::ACK,
            inner.send_sequence,
            receive_sequence,
            inner.receive_window,
        );
        self.transmit(&mut inner, &ack, &[])?;

        inner.receive_buffer.extend_from_slice(data);
        inner.receive_sequence = receive_sequence;

        self.sink.record(&StackEvent::Packet {
            direction: Direction::Recv,
            protocol: "TCP",
            src: self.remote,
            dst: self.local,
            len: data.len(),
        });

        if let Some(callback) = inner.on_data_received.as_mut() {
            callback(data);
        }
        Ok(())
    }

    /// Decode an inbound IPv4 packet and feed its TCP payload to
    /// [`Connection::receive`]
    pub fn deliver(&self, packet: &[u8]) -> Result<()> {
        let ip = Ipv4Header::decode(packet)?;
        if ip.protocol != protocol::TCP {
            return Err(Error::Malformed("not a TCP packet"));
        }

        // Trailing link padding beyond the IPv4 total length is not payload
        let end = (ip.total_len as usize).min(packet.len());
        let ip_header_len = ip.header_len();
        if ip_header_len < IPV4_HEADER_LEN {
            return Err(Error::Malformed("IPv4 header length below 20 bytes"));
        }
        if ip_header_len + TCP_HEADER_LEN > end {
            return Err(Error::too_short(
                "TCP segment",
                ip_header_len + TCP_HEADER_LEN,
                end,
            ));
        }
        let segment = &packet[ip_header_len..end];

        let tcp = TcpHeader::decode(segment)?;
        if tcp.dst_port != self.local.port() {
            return Err(Error::Malformed("segment addressed to another port"));
        }

        let data_offset = tcp.header_len();
        if data_offset < TCP_HEADER_LEN {
            return Err(Error::Malformed("TCP data offset below 20 bytes"));
        }
        if data_offset > segment.len() {
            return Err(Error::too_short("TCP segment", data_offset, segment.len()));
        }

        self.receive(&segment[data_offset..])
    }

    /// Close the connection
    ///
    /// No-op when already CLOSED. Otherwise sends FIN+ACK, passes through
    /// FIN_WAIT_1 (notifying the state-change callback) and lands in CLOSED
    /// without waiting for the peer.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state == TcpState::Closed {
            return Ok(());
        }

        let fin = self.header(
            TcpFlags::FIN | TcpFlags::ACK,
            inner.send_sequence,
            inner.receive_sequence,
            inner.send_window,
        );
        self.transmit(&mut inner, &fin, &[])?;

        self.enter(&mut inner, TcpState::FinWait1);

        inner.state = TcpState::Closed;
        self.record_state(TcpState::Closed);
        Ok(())
    }

    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.remote
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> TcpState {
        self.lock().state
    }

    pub fn send_sequence(&self) -> u32 {
        self.lock().send_sequence
    }

    pub fn receive_sequence(&self) -> u32 {
        self.lock().receive_sequence
    }

    pub fn send_window(&self) -> u16 {
        self.lock().send_window
    }

    pub fn receive_window(&self) -> u16 {
        self.lock().receive_window
    }

    pub fn congestion_window(&self) -> u16 {
        self.lock().congestion_window
    }

    pub fn slow_start_threshold(&self) -> u16 {
        self.lock().slow_start_threshold
    }

    /// Copy of everything sent so far
    pub fn send_buffer(&self) -> Vec<u8> {
        self.lock().send_buffer.clone()
    }

    /// Copy of everything received and not yet taken
    pub fn receive_buffer(&self) -> Vec<u8> {
        self.lock().receive_buffer.clone()
    }

    /// Drain the receive buffer
    pub fn take_received(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().receive_buffer)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner_mut(&mut self) -> &mut Inner {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn header(&self, flags: TcpFlags, seq: u32, ack: u32, window: u16) -> TcpHeader {
        TcpHeader::new(
            self.local.port(),
            self.remote.port(),
            seq,
            ack,
            flags,
            window,
        )
    }

    // Frame `header` + `payload` into an IPv4 packet and hand it to the
    // transport. Without a transport the segment goes nowhere.
    fn transmit(&self, inner: &mut Inner, header: &TcpHeader, payload: &[u8]) -> Result<()> {
        let Some(transport) = inner.transport.as_mut() else {
            return Ok(());
        };

        let src = self.local.ip().octets();
        let dst = self.remote.ip().octets();
        let segment = header.encode_segment(src, dst, payload)?;
        let packet = Ipv4Header::new(src, dst, protocol::TCP, 0).with_payload(&segment)?;

        transport.transmit(&packet).map_err(|err| {
            warn!(
                local = %self.local,
                remote = %self.remote,
                flags = %header.flags,
                error = %err,
                "transport rejected segment"
            );
            Error::Io(err)
        })
    }

    fn record_state(&self, state: TcpState) {
        self.sink.record(&StackEvent::Connection {
            state,
            local: self.local,
            remote: self.remote,
        });
    }

    // Commit `state`, report it and run the state-change callback
    fn enter(&self, inner: &mut Inner, state: TcpState) {
        inner.state = state;
        self.record_state(state);
        if let Some(callback) = inner.on_state_change.as_mut() {
            callback(state);
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TCP Connection: {} -> {} [{}]",
            self.local,
            self.remote,
            self.state()
        )
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Connection")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("state", &inner.state)
            .field("send_sequence", &inner.send_sequence)
            .field("receive_sequence", &inner.receive_sequence)
            .field("send_window", &inner.send_window)
            .field("receive_window", &inner.receive_window)
            .field("send_buffered", &inner.send_buffer.len())
            .field("receive_buffered", &inner.receive_buffer.len())
            .finish_non_exhaustive()
    }
}
