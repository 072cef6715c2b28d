//! ICMP (Internet Control Message Protocol) implementation
//!
//! This module provides ICMP packet encoding and decoding.
//! It supports the Echo Request and Echo Reply messages used by ping.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::network::checksum;

/// Minimum ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_DESTINATION_UNREACHABLE: u8 = 3;
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;

/// ICMP codes for the echo messages
pub const ICMP_CODE_ECHO_REQUEST: u8 = 0;
pub const ICMP_CODE_ECHO_REPLY: u8 = 0;

/// ICMP echo message
///
/// The 8-byte header as defined in RFC 792 followed by the echoed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpPacket {
    pub msg_type: u8,  // ICMP message type
    pub msg_code: u8,  // ICMP message code
    pub checksum: u16, // ICMP checksum over header and payload
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl IcmpPacket {
    /// Create a new Echo Request
    pub fn echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Self {
        IcmpPacket {
            msg_type: ICMP_TYPE_ECHO_REQUEST,
            msg_code: ICMP_CODE_ECHO_REQUEST,
            checksum: 0,
            identifier,
            sequence,
            payload: payload.to_vec(),
        }
    }

    /// Parse ICMP packet from byte slice
    ///
    /// Everything after the 8-byte header is taken as payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(Error::too_short("ICMP packet", ICMP_HEADER_LEN, data.len()));
        }

        Ok(IcmpPacket {
            msg_type: data[0],
            msg_code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            identifier: BigEndian::read_u16(&data[4..6]),
            sequence: BigEndian::read_u16(&data[6..8]),
            payload: data[ICMP_HEADER_LEN..].to_vec(),
        })
    }

    /// Convert ICMP packet to bytes with a freshly computed checksum
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.encode_unchecked();
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[2..4], sum);
        bytes
    }

    fn encode_unchecked(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ICMP_HEADER_LEN + self.payload.len()];
        bytes[0] = self.msg_type;
        bytes[1] = self.msg_code;
        BigEndian::write_u16(&mut bytes[4..6], self.identifier);
        BigEndian::write_u16(&mut bytes[6..8], self.sequence);
        bytes[ICMP_HEADER_LEN..].copy_from_slice(&self.payload);
        bytes
    }

    /// Update checksum after modifying fields
    pub fn update_checksum(&mut self) {
        self.checksum = checksum(&self.encode_unchecked());
    }

    /// Check if this is an Echo Request message
    pub fn is_echo_request(&self) -> bool {
        self.msg_type == ICMP_TYPE_ECHO_REQUEST
    }

    /// Check if this is an Echo Reply message
    pub fn is_echo_reply(&self) -> bool {
        self.msg_type == ICMP_TYPE_ECHO_REPLY
    }

    /// Build the Echo Reply answering this message
    ///
    /// Identifier, sequence and payload are copied; the checksum is left for
    /// [`IcmpPacket::encode`] to compute.
    pub fn reply(&self) -> Self {
        IcmpPacket {
            msg_type: ICMP_TYPE_ECHO_REPLY,
            msg_code: ICMP_CODE_ECHO_REPLY,
            checksum: 0,
            identifier: self.identifier,
            sequence: self.sequence,
            payload: self.payload.clone(),
        }
    }
}

impl fmt::Display for IcmpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ICMP Packet: Type={}, Code={}, ID={}, Sequence={}, Data={} bytes",
            self.msg_type,
            self.msg_code,
            self.identifier,
            self.sequence,
            self.payload.len()
        )
    }
}
