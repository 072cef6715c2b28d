//! UDP (User Datagram Protocol) implementation
//!
//! This module provides UDP packet encoding, decoding and validation.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::network::{checksum, protocol, transport_checksum};

/// UDP header length in bytes
pub const UDP_HEADER_LEN: usize = 8;

/// Largest datagram the 16-bit length field can describe
pub const UDP_MAX_LEN: usize = u16::MAX as usize;

/// UDP datagram
///
/// The standard 8-byte header as defined in RFC 768 followed by the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16, // Length of UDP header and data
    pub checksum: u16,
    pub payload: Vec<u8>,
}

impl UdpPacket {
    /// Creates a new UDP packet with the length precomputed
    ///
    /// The length saturates for oversized payloads; [`UdpPacket::encode`]
    /// rejects those.
    pub fn new(src_port: u16, dst_port: u16, payload: &[u8]) -> Self {
        let length = (UDP_HEADER_LEN + payload.len()).min(UDP_MAX_LEN) as u16;
        UdpPacket {
            src_port,
            dst_port,
            length,
            checksum: 0,
            payload: payload.to_vec(),
        }
    }

    /// Parse UDP packet from byte slice
    ///
    /// Every byte after the header is payload, regardless of the length field.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < UDP_HEADER_LEN {
            return Err(Error::too_short("UDP packet", UDP_HEADER_LEN, data.len()));
        }

        Ok(UdpPacket {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            length: BigEndian::read_u16(&data[4..6]),
            checksum: BigEndian::read_u16(&data[6..8]),
            payload: data[UDP_HEADER_LEN..].to_vec(),
        })
    }

    /// Convert UDP packet to bytes
    ///
    /// The length field is computed from the payload and the checksum covers
    /// header and payload without a pseudo-header; see
    /// [`UdpPacket::encode_with_pseudo_header`] for the wire-correct variant.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = self.encode_unchecked()?;
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[6..8], sum);
        Ok(bytes)
    }

    fn encode_unchecked(&self) -> Result<Vec<u8>> {
        let total_len = UDP_HEADER_LEN + self.payload.len();
        if total_len > UDP_MAX_LEN {
            return Err(Error::too_large("UDP packet", UDP_MAX_LEN, total_len));
        }

        let mut bytes = vec![0u8; total_len];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u16(&mut bytes[4..6], total_len as u16);
        bytes[UDP_HEADER_LEN..].copy_from_slice(&self.payload);
        Ok(bytes)
    }

    /// Store the length and checksum [`UdpPacket::encode`] would embed
    pub fn update_checksum(&mut self) -> Result<()> {
        let bytes = self.encode_unchecked()?;
        self.length = bytes.len() as u16;
        self.checksum = checksum(&bytes);
        Ok(())
    }

    /// Calculate UDP checksum with pseudo header
    pub fn checksum_with_pseudo_header(&self, src_addr: [u8; 4], dst_addr: [u8; 4]) -> Result<u16> {
        let bytes = self.encode_unchecked()?;
        let sum = transport_checksum(&bytes, &[], src_addr, dst_addr, protocol::UDP);
        // RFC 768: a computed zero is transmitted as all ones
        Ok(if sum == 0 { 0xFFFF } else { sum })
    }

    /// Creates a complete UDP packet with the pseudo-header checksum
    pub fn encode_with_pseudo_header(&self, src_addr: [u8; 4], dst_addr: [u8; 4]) -> Result<Vec<u8>> {
        let mut bytes = self.encode_unchecked()?;
        let sum = self.checksum_with_pseudo_header(src_addr, dst_addr)?;
        BigEndian::write_u16(&mut bytes[6..8], sum);
        Ok(bytes)
    }

    /// Validate a received UDP packet against its IPv4 addresses
    ///
    /// Checks the length field and, unless the checksum is zero (disabled),
    /// the pseudo-header checksum.
    pub fn validate(src_addr: [u8; 4], dst_addr: [u8; 4], packet: &[u8]) -> Result<()> {
        let header = UdpPacket::decode(packet)?;

        if header.length as usize != packet.len() {
            return Err(Error::Malformed("UDP length field does not match datagram"));
        }

        if header.checksum != 0
            && transport_checksum(packet, &[], src_addr, dst_addr, protocol::UDP) != 0
        {
            return Err(Error::Malformed("UDP checksum mismatch"));
        }

        Ok(())
    }
}

impl fmt::Display for UdpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UDP Packet: {} -> {}, Length: {}, Payload: {} bytes",
            self.src_port,
            self.dst_port,
            self.length,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: [u8; 4] = [10, 0, 0, 1];
    const DST: [u8; 4] = [10, 0, 0, 254];

    #[test]
    fn test_encode_layout() {
        let bytes = UdpPacket::new(5353, 53, b"query").encode().unwrap();
        assert_eq!(bytes.len(), 13);
        assert_eq!(&bytes[0..2], &5353u16.to_be_bytes());
        assert_eq!(&bytes[2..4], &[0, 53]);
        assert_eq!(&bytes[4..6], &[0, 13]);
        assert_eq!(&bytes[8..], b"query");
        assert!(crate::network::verify(&bytes));
    }

    #[test]
    fn test_round_trip() {
        let mut packet = UdpPacket::new(7, 7, b"echo me");
        packet.update_checksum().unwrap();
        let decoded = UdpPacket::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_empty_payload() {
        let bytes = UdpPacket::new(1, 2, &[]).encode().unwrap();
        assert_eq!(bytes.len(), UDP_HEADER_LEN);
        assert!(UdpPacket::decode(&bytes).unwrap().payload.is_empty());
    }

    #[test]
    fn test_size_limit() {
        let max_payload = vec![0u8; UDP_MAX_LEN - UDP_HEADER_LEN];
        assert_eq!(
            UdpPacket::new(1, 2, &max_payload).encode().unwrap().len(),
            UDP_MAX_LEN
        );

        let too_big = vec![0u8; UDP_MAX_LEN - UDP_HEADER_LEN + 1];
        assert!(matches!(
            UdpPacket::new(1, 2, &too_big).encode(),
            Err(Error::TooLarge { limit: 65535, .. })
        ));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            UdpPacket::decode(&[0u8; 7]),
            Err(Error::TooShort { needed: 8, .. })
        ));
    }

    #[test]
    fn test_pseudo_header_packet_validates() {
        let bytes = UdpPacket::new(40000, 7, b"hello")
            .encode_with_pseudo_header(SRC, DST)
            .unwrap();
        assert!(UdpPacket::validate(SRC, DST, &bytes).is_ok());

        // Address order does not affect a one's complement sum
        assert!(UdpPacket::validate(DST, SRC, &bytes).is_ok());
        assert!(UdpPacket::validate([10, 0, 0, 9], DST, &bytes).is_err());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut bytes = UdpPacket::new(1, 2, b"abc").encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            UdpPacket::validate(SRC, DST, &bytes),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_zero_checksum_skips_verification() {
        let mut bytes = UdpPacket::new(1, 2, b"abc").encode().unwrap();
        bytes[6] = 0;
        bytes[7] = 0;
        assert!(UdpPacket::validate(SRC, DST, &bytes).is_ok());
    }
}
