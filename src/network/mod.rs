//! Network layer protocols implementation
//!
//! This module contains implementations for network layer protocols:
//! - IPv4: Internet Protocol version 4
//! - ICMP: Internet Control Message Protocol
//!
//! It also hosts the Internet checksum shared by every layer above it.

pub mod icmp;
pub mod ipv4;

// Re-export commonly used items
pub use icmp::{IcmpPacket, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST};
pub use ipv4::{flags, protocol, Ipv4Header};

use byteorder::{BigEndian, ByteOrder};

/// Length of the IPv4 pseudo-header used by transport checksums
pub const PSEUDO_HEADER_LEN: usize = 12;

/// Calculate Internet checksum
///
/// Algorithm: Sum data in 16-bit chunks, add carry bits to the sum,
/// and return the one's complement of the result.
/// This is used for IP, ICMP, UDP and TCP checksums.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    // Process data in 2-byte chunks
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += BigEndian::read_u16(chunk) as u32;
        // Keep the accumulator from overflowing on very long inputs
        if sum > 0xFFFF_0000 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    // Odd trailing byte is the high byte of a final word
    if let Some(&last_byte) = chunks.remainder().first() {
        sum += (last_byte as u32) << 8;
    }

    // Add carry bits
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // Return one's complement
    !sum as u16
}

/// Check a byte image that already carries its checksum
///
/// The one's complement sum over a correctly checksummed image folds to
/// all-ones, so its complement is zero.
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == 0
}

/// Calculate a TCP/UDP checksum including the IPv4 pseudo-header
///
/// The pseudo-header is `src(4) + dst(4) + zero(1) + protocol(1) + length(2)`
/// where length covers `header` and `payload`. The checksum field inside
/// `header` must already be zero, and `header` plus `payload` must not exceed
/// 65535 bytes; callers reject longer segments before getting here.
pub fn transport_checksum(
    header: &[u8],
    payload: &[u8],
    src_addr: [u8; 4],
    dst_addr: [u8; 4],
    protocol: u8,
) -> u16 {
    let segment_len = header.len() + payload.len();
    debug_assert!(segment_len <= u16::MAX as usize, "segment too long for pseudo-header");

    let mut data = Vec::with_capacity(PSEUDO_HEADER_LEN + segment_len);
    data.extend_from_slice(&src_addr);
    data.extend_from_slice(&dst_addr);
    data.push(0);
    data.push(protocol);
    data.extend_from_slice(&(segment_len as u16).to_be_bytes());
    data.extend_from_slice(header);
    data.extend_from_slice(payload);

    checksum(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_rfc1071_example() {
        // Worked example from RFC 1071 section 3
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), 0x220d);
    }

    #[test]
    fn test_checksum_odd_length() {
        // 0x0102 + 0x0300 = 0x0402
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), 0xfbfd);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_checksum_word_order_independent() {
        let a = [0x12, 0x34, 0xab, 0xcd, 0x00, 0xff];
        let b = [0x00, 0xff, 0x12, 0x34, 0xab, 0xcd];
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_embedded_checksum_verifies() {
        let mut data = vec![0x45, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01];
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
        let sum = checksum(&data);
        data[10..12].copy_from_slice(&sum.to_be_bytes());
        assert!(verify(&data));

        data[0] ^= 0x01;
        assert!(!verify(&data));
    }

    #[test]
    fn test_transport_checksum_matches_manual_pseudo_header() {
        let header = [0x04, 0xd2, 0x00, 0x35, 0x00, 0x0c, 0x00, 0x00];
        let payload = b"abcd";
        let src = [192, 168, 0, 1];
        let dst = [192, 168, 0, 2];

        let mut manual = Vec::new();
        manual.extend_from_slice(&src);
        manual.extend_from_slice(&dst);
        manual.extend_from_slice(&[0, 17, 0, 12]);
        manual.extend_from_slice(&header);
        manual.extend_from_slice(payload);

        assert_eq!(
            transport_checksum(&header, payload, src, dst, 17),
            checksum(&manual)
        );
    }
}
