//! TCP connection states and the transition function between them.
//!
//! [`TcpState::next`] encodes the RFC 793 state diagram as a pure function
//! over (current state, [`Event`]). The [`Connection`](super::Connection)
//! shortcuts some of these paths; this table is what a segment-driven
//! handshake plugs into.
//!
//! ```text
//!  CLOSED ──active open──▶ SYN_SENT ──SYN+ACK──▶ ESTABLISHED
//!    │                        │ SYN                 │      │
//!    │ passive open           ▼                close│      │FIN
//!    ▼                   SYN_RECEIVED ──ACK──▶      ▼      ▼
//!  LISTEN ──SYN──────────────▲             FIN_WAIT_1   CLOSE_WAIT
//!                                           │ACK  │FIN      │close
//!                                           ▼     ▼         ▼
//!                                   FIN_WAIT_2  CLOSING   LAST_ACK
//!                                       │FIN      │ACK      │ACK
//!                                       ▼         ▼         ▼
//!                                      TIME_WAIT ──2MSL──▶ CLOSED
//! ```

use std::fmt;

use super::tcp::TcpFlags;

/// TCP connection states as defined in RFC 793
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TcpState {
    #[default]
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
}

/// Inputs that move a connection between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Local `connect`
    ActiveOpen,
    /// Local `listen`
    PassiveOpen,
    /// Local `close`
    Close,
    /// Inbound SYN without ACK
    Syn,
    /// Inbound SYN+ACK
    SynAck,
    /// Inbound bare ACK
    Ack,
    /// Inbound FIN without ACK
    Fin,
    /// Inbound FIN+ACK acknowledging our FIN
    FinAck,
    /// Inbound RST
    Rst,
    /// 2*MSL timer fired
    TimeWaitExpired,
}

impl Event {
    /// Classify an inbound segment by its control bits
    ///
    /// Returns `None` for segments that carry no state-relevant flag.
    pub fn from_flags(flags: TcpFlags) -> Option<Event> {
        if flags.contains(TcpFlags::RST) {
            Some(Event::Rst)
        } else if flags.contains(TcpFlags::SYN | TcpFlags::ACK) {
            Some(Event::SynAck)
        } else if flags.contains(TcpFlags::SYN) {
            Some(Event::Syn)
        } else if flags.contains(TcpFlags::FIN | TcpFlags::ACK) {
            Some(Event::FinAck)
        } else if flags.contains(TcpFlags::FIN) {
            Some(Event::Fin)
        } else if flags.contains(TcpFlags::ACK) {
            Some(Event::Ack)
        } else {
            None
        }
    }
}

impl TcpState {
    /// The state reached from `self` on `event`, or `None` if the event is
    /// not valid here
    pub fn next(self, event: Event) -> Option<TcpState> {
        use Event::*;
        use TcpState::*;

        let next = match (self, event) {
            (Closed, ActiveOpen) => SynSent,
            (Closed, PassiveOpen) => Listen,

            (Listen, Syn) => SynReceived,
            (Listen, ActiveOpen) => SynSent,
            (Listen, Close) => Closed,

            (SynSent, SynAck) => Established,
            (SynSent, Syn) => SynReceived,
            (SynSent, Close) | (SynSent, Rst) => Closed,

            (SynReceived, Ack) => Established,
            (SynReceived, Close) => FinWait1,
            (SynReceived, Rst) => Listen,

            (Established, Close) => FinWait1,
            (Established, Fin) | (Established, FinAck) => CloseWait,

            (FinWait1, Ack) => FinWait2,
            (FinWait1, Fin) => Closing,
            (FinWait1, FinAck) => TimeWait,

            (FinWait2, Fin) | (FinWait2, FinAck) => TimeWait,

            (CloseWait, Close) => LastAck,

            (Closing, Ack) => TimeWait,

            (LastAck, Ack) => Closed,

            (TimeWait, TimeWaitExpired) => Closed,

            (_, Rst) if self.is_synchronized() => Closed,

            _ => return None,
        };

        Some(next)
    }

    /// States in which both sides have exchanged sequence numbers
    pub fn is_synchronized(&self) -> bool {
        !matches!(
            self,
            TcpState::Closed | TcpState::Listen | TcpState::SynSent | TcpState::SynReceived
        )
    }

    /// Check if connection is in a state that carries data
    pub fn is_active(&self) -> bool {
        matches!(self, TcpState::Established | TcpState::CloseWait)
    }

    /// Check if connection is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, TcpState::Closed)
    }

    /// The upper-case RFC name, e.g. `SYN_SENT`
    pub fn as_str(&self) -> &'static str {
        match self {
            TcpState::Closed => "CLOSED",
            TcpState::Listen => "LISTEN",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynReceived => "SYN_RECEIVED",
            TcpState::Established => "ESTABLISHED",
            TcpState::FinWait1 => "FIN_WAIT_1",
            TcpState::FinWait2 => "FIN_WAIT_2",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::Closing => "CLOSING",
            TcpState::LastAck => "LAST_ACK",
            TcpState::TimeWait => "TIME_WAIT",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: TcpState, events: &[Event]) -> Option<TcpState> {
        events.iter().try_fold(start, |state, &event| state.next(event))
    }

    #[test]
    fn test_active_open_and_close() {
        let state = walk(
            TcpState::Closed,
            &[
                Event::ActiveOpen,
                Event::SynAck,
                Event::Close,
                Event::Ack,
                Event::Fin,
                Event::TimeWaitExpired,
            ],
        );
        assert_eq!(state, Some(TcpState::Closed));
    }

    #[test]
    fn test_passive_open_and_close() {
        let state = walk(
            TcpState::Closed,
            &[Event::PassiveOpen, Event::Syn, Event::Ack],
        );
        assert_eq!(state, Some(TcpState::Established));

        let state = walk(
            TcpState::Established,
            &[Event::Fin, Event::Close, Event::Ack],
        );
        assert_eq!(state, Some(TcpState::Closed));
    }

    #[test]
    fn test_simultaneous_close() {
        let state = walk(
            TcpState::Established,
            &[Event::Close, Event::Fin, Event::Ack],
        );
        assert_eq!(state, Some(TcpState::TimeWait));
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(TcpState::Closed.next(Event::Ack), None);
        assert_eq!(TcpState::Listen.next(Event::SynAck), None);
        assert_eq!(TcpState::Established.next(Event::Syn), None);
        assert_eq!(TcpState::TimeWait.next(Event::Close), None);
    }

    #[test]
    fn test_reset_aborts_synchronized_states() {
        for state in [
            TcpState::Established,
            TcpState::FinWait1,
            TcpState::FinWait2,
            TcpState::CloseWait,
            TcpState::Closing,
            TcpState::LastAck,
            TcpState::TimeWait,
        ] {
            assert_eq!(state.next(Event::Rst), Some(TcpState::Closed), "{}", state);
        }
        assert_eq!(TcpState::SynReceived.next(Event::Rst), Some(TcpState::Listen));
        assert_eq!(TcpState::Listen.next(Event::Rst), None);
    }

    #[test]
    fn test_event_from_flags() {
        assert_eq!(Event::from_flags(TcpFlags::SYN), Some(Event::Syn));
        assert_eq!(
            Event::from_flags(TcpFlags::SYN | TcpFlags::ACK),
            Some(Event::SynAck)
        );
        assert_eq!(
            Event::from_flags(TcpFlags::FIN | TcpFlags::ACK),
            Some(Event::FinAck)
        );
        assert_eq!(
            Event::from_flags(TcpFlags::PSH | TcpFlags::ACK),
            Some(Event::Ack)
        );
        assert_eq!(
            Event::from_flags(TcpFlags::RST | TcpFlags::ACK),
            Some(Event::Rst)
        );
        assert_eq!(Event::from_flags(TcpFlags::PSH), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TcpState::Closed.to_string(), "CLOSED");
        assert_eq!(TcpState::SynReceived.to_string(), "SYN_RECEIVED");
        assert_eq!(TcpState::FinWait1.to_string(), "FIN_WAIT_1");
        assert_eq!(TcpState::TimeWait.to_string(), "TIME_WAIT");
        assert_eq!(TcpState::default(), TcpState::Closed);
    }
}
