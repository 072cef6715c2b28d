//! TCP (Transmission Control Protocol) header implementation
//!
//! This module provides TCP header encoding and decoding, including the
//! variable-length options area, and the flag set carried in every segment.

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::network::{checksum, protocol, transport_checksum};

/// Length of a TCP header without options
pub const TCP_HEADER_LEN: usize = 20;

/// Largest header the 4-bit data offset can describe
pub const TCP_MAX_HEADER_LEN: usize = 60;

/// Largest options area
pub const TCP_MAX_OPTIONS_LEN: usize = TCP_MAX_HEADER_LEN - TCP_HEADER_LEN;

/// Largest segment (header + payload) the pseudo-header length can describe
pub const TCP_MAX_SEGMENT_LEN: usize = u16::MAX as usize;

const DEFAULT_DATA_OFFSET: u8 = 5; // 5 * 4 = 20 bytes

bitflags! {
    /// Control bits of a TCP segment
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TcpFlags: u8 {
        const FIN = 0b0000_0001;
        const SYN = 0b0000_0010;
        const RST = 0b0000_0100;
        const PSH = 0b0000_1000;
        const ACK = 0b0001_0000;
        const URG = 0b0010_0000;
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "[{}]", names.join(" "))
    }
}

/// TCP packet header structure
///
/// Represents the TCP header as defined in RFC 793: 20 fixed bytes followed
/// by up to 40 bytes of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset: u8, // Header length in 32-bit words
    pub flags: TcpFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
    pub options: Vec<u8>,
}

impl TcpHeader {
    /// Create a header without options
    pub fn new(
        src_port: u16,
        dst_port: u16,
        seq_number: u32,
        ack_number: u32,
        flags: TcpFlags,
        window_size: u16,
    ) -> Self {
        TcpHeader {
            src_port,
            dst_port,
            seq_number,
            ack_number,
            data_offset: DEFAULT_DATA_OFFSET,
            flags,
            window_size,
            checksum: 0,
            urgent_ptr: 0,
            options: Vec::new(),
        }
    }

    /// Attach options, keeping `data_offset` consistent with them
    pub fn with_options(mut self, options: &[u8]) -> Self {
        self.data_offset = ((TCP_HEADER_LEN + options.len()) / 4) as u8;
        self.options = options.to_vec();
        self
    }

    /// Parse TCP header from byte slice
    ///
    /// The options length is derived from the data offset; options are only
    /// copied when the input actually holds that many bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < TCP_HEADER_LEN {
            return Err(Error::too_short("TCP header", TCP_HEADER_LEN, data.len()));
        }

        let data_offset = data[12] >> 4;
        let options_len = (data_offset as usize * 4).saturating_sub(TCP_HEADER_LEN);
        let options = if options_len > 0 && data.len() >= TCP_HEADER_LEN + options_len {
            data[TCP_HEADER_LEN..TCP_HEADER_LEN + options_len].to_vec()
        } else {
            Vec::new()
        };

        Ok(TcpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            seq_number: BigEndian::read_u32(&data[4..8]),
            ack_number: BigEndian::read_u32(&data[8..12]),
            data_offset,
            flags: TcpFlags::from_bits_truncate(data[13]),
            window_size: BigEndian::read_u16(&data[14..16]),
            checksum: BigEndian::read_u16(&data[16..18]),
            urgent_ptr: BigEndian::read_u16(&data[18..20]),
            options,
        })
    }

    /// Convert TCP header to bytes
    ///
    /// The data offset is derived from the options length. The embedded
    /// checksum covers the header bytes only; see
    /// [`TcpHeader::encode_segment`] for the pseudo-header variant.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = self.encode_unchecked()?;
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[16..18], sum);
        Ok(bytes)
    }

    // Header image with the checksum field zeroed
    fn encode_unchecked(&self) -> Result<Vec<u8>> {
        let header_len = TCP_HEADER_LEN + self.options.len();
        if header_len > TCP_MAX_HEADER_LEN {
            return Err(Error::too_large("TCP header", TCP_MAX_HEADER_LEN, header_len));
        }
        if self.options.len() % 4 != 0 {
            return Err(Error::Malformed("TCP options not padded to a 4-byte boundary"));
        }

        let mut bytes = vec![0u8; header_len];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u32(&mut bytes[4..8], self.seq_number);
        BigEndian::write_u32(&mut bytes[8..12], self.ack_number);
        bytes[12] = ((header_len / 4) as u8) << 4;
        bytes[13] = self.flags.bits();
        BigEndian::write_u16(&mut bytes[14..16], self.window_size);
        BigEndian::write_u16(&mut bytes[18..20], self.urgent_ptr);
        bytes[TCP_HEADER_LEN..].copy_from_slice(&self.options);
        Ok(bytes)
    }

    /// Header-only checksum, as embedded by [`TcpHeader::encode`]
    pub fn calculate_checksum(&self) -> Result<u16> {
        Ok(checksum(&self.encode_unchecked()?))
    }

    /// Store the checksum [`TcpHeader::encode`] would embed
    pub fn update_checksum(&mut self) -> Result<()> {
        self.checksum = self.calculate_checksum()?;
        Ok(())
    }

    /// Wire-correct checksum over the IPv4 pseudo-header, header and payload
    pub fn checksum_with_pseudo_header(
        &self,
        src_addr: [u8; 4],
        dst_addr: [u8; 4],
        payload: &[u8],
    ) -> Result<u16> {
        let header = self.encode_unchecked()?;
        check_segment_len(header.len(), payload.len())?;
        Ok(transport_checksum(
            &header,
            payload,
            src_addr,
            dst_addr,
            protocol::TCP,
        ))
    }

    /// Build a full segment (header + payload) carrying the pseudo-header
    /// checksum, ready to be wrapped in an IPv4 packet
    pub fn encode_segment(
        &self,
        src_addr: [u8; 4],
        dst_addr: [u8; 4],
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let mut segment = self.encode_unchecked()?;
        check_segment_len(segment.len(), payload.len())?;
        let sum = transport_checksum(&segment, payload, src_addr, dst_addr, protocol::TCP);
        BigEndian::write_u16(&mut segment[16..18], sum);
        segment.extend_from_slice(payload);
        Ok(segment)
    }

    /// Get the data offset (header length) in bytes
    pub fn header_len(&self) -> usize {
        (self.data_offset as usize) * 4
    }

    /// Check whether any of `flags` is set
    pub fn has_flag(&self, flags: TcpFlags) -> bool {
        self.flags.intersects(flags)
    }

    /// Check if SYN flag is set
    pub fn is_syn(&self) -> bool {
        self.has_flag(TcpFlags::SYN)
    }

    /// Check if ACK flag is set
    pub fn is_ack(&self) -> bool {
        self.has_flag(TcpFlags::ACK)
    }

    /// Check if FIN flag is set
    pub fn is_fin(&self) -> bool {
        self.has_flag(TcpFlags::FIN)
    }

    /// Check if RST flag is set
    pub fn is_rst(&self) -> bool {
        self.has_flag(TcpFlags::RST)
    }

    /// Check if PSH flag is set
    pub fn is_psh(&self) -> bool {
        self.has_flag(TcpFlags::PSH)
    }

    /// Check if URG flag is set
    pub fn is_urg(&self) -> bool {
        self.has_flag(TcpFlags::URG)
    }
}

// The pseudo-header carries the segment length in 16 bits
fn check_segment_len(header_len: usize, payload_len: usize) -> Result<()> {
    let segment_len = header_len + payload_len;
    if segment_len > TCP_MAX_SEGMENT_LEN {
        return Err(Error::too_large("TCP segment", TCP_MAX_SEGMENT_LEN, segment_len));
    }
    Ok(())
}

impl fmt::Display for TcpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TCP Header: {} -> {}, Seq: {}, Ack: {}, Flags: {}, Window: {}",
            self.src_port,
            self.dst_port,
            self.seq_number,
            self.ack_number,
            self.flags,
            self.window_size
        )
    }
}
