//! IPv4 protocol implementation
//!
//! This module provides IPv4 header encoding, decoding and validation.
//!
//! Features:
//! - IPv4 header parsing and serialization (20-byte header, no options)
//! - Checksum calculation and validation
//! - Header creation with sensible defaults
//! - Fragment detection (reassembly is not supported)

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::network::checksum;

pub const IPV4_HEADER_LEN: usize = 20;
const IPV4_VERSION: u8 = 4;
const DEFAULT_IHL: u8 = 5; // 5 * 4 = 20 bytes (standard header length)
const DEFAULT_TTL: u8 = 64;

/// IPv4 protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// IPv4 flags constants
///
/// Flags are kept in their on-wire bit positions so they can be OR-ed
/// straight into the flags/fragment-offset word.
pub mod flags {
    pub const DONT_FRAGMENT: u16 = 0x4000;
    pub const MORE_FRAGMENTS: u16 = 0x2000;
    pub const FLAGS_MASK: u16 = 0xE000;
    pub const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;
}

/// IPv4 packet header structure
///
/// Represents the standard 20-byte IPv4 header as defined in RFC 791
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8, // Internet Header Length, in 32-bit words
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags: u16,           // Top three bits, see [`flags`]
    pub fragment_offset: u16, // Low 13 bits, in 8-byte units
    pub ttl: u8,              // Time to Live
    pub protocol: u8,         // Next Protocol
    pub checksum: u16,
    pub src_addr: [u8; 4], // Source IP Address
    pub dst_addr: [u8; 4], // Destination IP Address
}

impl Ipv4Header {
    /// Create a new IPv4 header with default values
    ///
    /// Version 4, IHL 5, TTL 64, no flags. The checksum is left zero and is
    /// computed by [`Ipv4Header::encode`].
    pub fn new(src_addr: [u8; 4], dst_addr: [u8; 4], protocol: u8, total_len: u16) -> Self {
        Ipv4Header {
            version: IPV4_VERSION,
            ihl: DEFAULT_IHL,
            tos: 0,
            total_len,
            id: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Parse IPv4 header from byte slice
    ///
    /// Only the fixed 20 bytes are read; version, IHL and checksum are taken
    /// as-is. Use [`Ipv4Header::validate`] to check them.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return Err(Error::too_short("IPv4 header", IPV4_HEADER_LEN, data.len()));
        }

        let flags_and_offset = BigEndian::read_u16(&data[6..8]);
        let mut src_addr = [0u8; 4];
        let mut dst_addr = [0u8; 4];
        src_addr.copy_from_slice(&data[12..16]);
        dst_addr.copy_from_slice(&data[16..20]);

        Ok(Ipv4Header {
            version: data[0] >> 4,
            ihl: data[0] & 0x0F,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags: flags_and_offset & flags::FLAGS_MASK,
            fragment_offset: flags_and_offset & flags::FRAGMENT_OFFSET_MASK,
            ttl: data[8],
            protocol: data[9],
            checksum: BigEndian::read_u16(&data[10..12]),
            src_addr,
            dst_addr,
        })
    }

    /// Convert IPv4 header to bytes
    ///
    /// Serializes the header to a 20-byte array ready for transmission with
    /// a freshly computed checksum. The stored `checksum` field is ignored.
    pub fn encode(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = self.encode_unchecked();
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[10..12], sum);
        bytes
    }

    // Header image with the checksum field zeroed
    fn encode_unchecked(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | (self.ihl & 0x0F);
        bytes[1] = self.tos;
        BigEndian::write_u16(&mut bytes[2..4], self.total_len);
        BigEndian::write_u16(&mut bytes[4..6], self.id);
        BigEndian::write_u16(&mut bytes[6..8], self.flags_and_offset());
        bytes[8] = self.ttl;
        bytes[9] = self.protocol;
        bytes[12..16].copy_from_slice(&self.src_addr);
        bytes[16..20].copy_from_slice(&self.dst_addr);
        bytes
    }

    /// The packed flags/fragment-offset word as it appears on the wire
    pub fn flags_and_offset(&self) -> u16 {
        (self.flags & flags::FLAGS_MASK) | (self.fragment_offset & flags::FRAGMENT_OFFSET_MASK)
    }

    /// Calculate IPv4 header checksum
    ///
    /// The checksum field is treated as zero during calculation.
    pub fn calculate_checksum(&self) -> u16 {
        checksum(&self.encode_unchecked())
    }

    /// Update checksum after modifying header fields
    ///
    /// Stores the value [`Ipv4Header::encode`] would embed.
    pub fn update_checksum(&mut self) {
        self.checksum = self.calculate_checksum();
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Get payload length
    ///
    /// Returns the length of the payload (total length - header length),
    /// saturating at zero for inconsistent headers.
    pub fn payload_len(&self) -> usize {
        (self.total_len as usize).saturating_sub(self.header_len())
    }

    /// Check if this packet is a fragment of a larger datagram
    pub fn is_fragment(&self) -> bool {
        (self.flags & flags::MORE_FRAGMENTS) != 0 || self.fragment_offset != 0
    }

    /// Check if this packet is the first fragment (or not fragmented at all)
    pub fn is_first_fragment(&self) -> bool {
        self.fragment_offset == 0
    }

    /// Create a complete IPv4 packet with payload
    ///
    /// The total length field is set to header plus payload and the checksum
    /// is recomputed. Fails if the packet would exceed 65535 bytes.
    pub fn with_payload(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let total_len = IPV4_HEADER_LEN + payload.len();
        if total_len > u16::MAX as usize {
            return Err(Error::too_large("IPv4 packet", u16::MAX as usize, total_len));
        }

        let mut header = self.clone();
        header.ihl = DEFAULT_IHL;
        header.total_len = total_len as u16;

        let mut packet = Vec::with_capacity(total_len);
        packet.extend_from_slice(&header.encode());
        packet.extend_from_slice(payload);
        Ok(packet)
    }

    /// Validate IPv4 packet structure
    ///
    /// Performs comprehensive validation of the IPv4 header
    pub fn validate(&self) -> Result<()> {
        if self.version != IPV4_VERSION {
            return Err(Error::Malformed("IPv4 version is not 4"));
        }

        // Minimum 5 words for a 20-byte header
        if self.ihl < DEFAULT_IHL {
            return Err(Error::Malformed("IPv4 header length below 20 bytes"));
        }

        if (self.total_len as usize) < self.header_len() {
            return Err(Error::Malformed("IPv4 total length shorter than header"));
        }

        if self.ttl == 0 {
            return Err(Error::Malformed("IPv4 TTL expired"));
        }

        if self.calculate_checksum() != self.checksum {
            return Err(Error::Malformed("IPv4 header checksum mismatch"));
        }

        Ok(())
    }
}

impl fmt::Display for Ipv4Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IP Header: {} -> {}, Protocol: {}, TTL: {}, Length: {}",
            DottedQuad(self.src_addr),
            DottedQuad(self.dst_addr),
            self.protocol,
            self.ttl,
            self.total_len
        )
    }
}

/// Display adapter for a raw IPv4 address
pub struct DottedQuad(pub [u8; 4]);

impl fmt::Display for DottedQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Ipv4Header {
        let mut header = Ipv4Header::new([192, 168, 1, 1], [192, 168, 1, 2], protocol::TCP, 40);
        header.id = 0x1c46;
        header.flags = flags::DONT_FRAGMENT;
        header
    }

    #[test]
    fn test_encode_layout() {
        let bytes = sample_header().encode();
        assert_eq!(bytes[0], 0x45);
        assert_eq!(&bytes[2..4], &[0x00, 0x28]);
        assert_eq!(&bytes[4..6], &[0x1c, 0x46]);
        assert_eq!(&bytes[6..8], &[0x40, 0x00]);
        assert_eq!(bytes[8], 64);
        assert_eq!(bytes[9], protocol::TCP);
        assert_eq!(&bytes[12..16], &[192, 168, 1, 1]);
        assert_eq!(&bytes[16..20], &[192, 168, 1, 2]);
    }

    #[test]
    fn test_encoded_header_checksum_verifies() {
        let bytes = sample_header().encode();
        assert!(crate::network::verify(&bytes));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut header = sample_header();
        header.update_checksum();
        let decoded = Ipv4Header::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_decode_too_short() {
        let err = Ipv4Header::decode(&[0x45; 19]).unwrap_err();
        assert!(matches!(
            err,
            Error::TooShort {
                needed: 20,
                actual: 19,
                ..
            }
        ));
    }

    #[test]
    fn test_flags_offset_packing() {
        let mut header = sample_header();
        header.flags = flags::MORE_FRAGMENTS;
        header.fragment_offset = 0x1ABC;
        assert_eq!(header.flags_and_offset(), 0x3ABC);

        let decoded = Ipv4Header::decode(&header.encode()).unwrap();
        assert_eq!(decoded.flags, flags::MORE_FRAGMENTS);
        assert_eq!(decoded.fragment_offset, 0x1ABC);
    }

    #[test]
    fn test_fragment_detection() {
        let mut header = sample_header();
        assert!(!header.is_fragment());
        assert!(header.is_first_fragment());

        header.flags |= flags::MORE_FRAGMENTS;
        assert!(header.is_fragment());
        assert!(header.is_first_fragment());

        header.flags = 0;
        header.fragment_offset = 185;
        assert!(header.is_fragment());
        assert!(!header.is_first_fragment());
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        let mut header = sample_header();
        header.update_checksum();
        header.checksum ^= 0xFFFF;
        assert!(matches!(header.validate(), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut header = sample_header();
        header.ttl = 0;
        header.update_checksum();
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_with_payload_sets_total_length() {
        let packet = sample_header().with_payload(b"hello").unwrap();
        assert_eq!(packet.len(), 25);

        let decoded = Ipv4Header::decode(&packet).unwrap();
        assert_eq!(decoded.total_len, 25);
        assert_eq!(decoded.payload_len(), 5);
        assert!(decoded.validate().is_ok());
        assert_eq!(&packet[decoded.header_len()..], b"hello");
    }

    #[test]
    fn test_display() {
        let header = sample_header();
        assert_eq!(
            header.to_string(),
            "IP Header: 192.168.1.1 -> 192.168.1.2, Protocol: 6, TTL: 64, Length: 40"
        );
    }
}
