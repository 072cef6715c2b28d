//! Error type shared by the codecs and the connection state machine.

use thiserror::Error;

use crate::transport::TcpState;

/// Errors returned by ustack operations.
///
/// None of these are retried internally. A failed call leaves every
/// caller-visible value exactly as it was before the call.
#[derive(Error, Debug)]
pub enum Error {
    /// Decode input is smaller than the protocol's minimum header size
    #[error("{what} too short: need {needed} bytes, got {actual}")]
    TooShort {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    /// Encoded payload, options or header exceed the protocol's maximum
    #[error("{what} too large: limit {limit} bytes, got {actual}")]
    TooLarge {
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    /// Operation is not permitted in the connection's current state
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: TcpState,
    },

    /// Structurally decodable input that fails validation
    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    /// The attached transport refused a packet
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn too_short(what: &'static str, needed: usize, actual: usize) -> Self {
        Error::TooShort {
            what,
            needed,
            actual,
        }
    }

    pub(crate) fn too_large(what: &'static str, limit: usize, actual: usize) -> Self {
        Error::TooLarge {
            what,
            limit,
            actual,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::too_short("IPv4 header", 20, 19);
        assert_eq!(err.to_string(), "IPv4 header too short: need 20 bytes, got 19");

        let err = Error::too_large("Ethernet payload", 1500, 1501);
        assert_eq!(
            err.to_string(),
            "Ethernet payload too large: limit 1500 bytes, got 1501"
        );

        let err = Error::InvalidState {
            operation: "send",
            state: TcpState::Closed,
        };
        assert_eq!(err.to_string(), "cannot send in state CLOSED");
    }
}
