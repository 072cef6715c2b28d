//! Ethernet II frame encoding and decoding

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Ethernet header size in bytes
pub const ETH_HEADER_LEN: usize = 14;

/// Largest payload carried by a standard (non-jumbo) frame
pub const ETH_MAX_PAYLOAD: usize = 1500;

/// EtherType values
pub mod ether_type {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    /// All-ones destination
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit (least significant bit of the first octet) set
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// An Ethernet II frame: 14-byte header plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Create a new frame; size limits are checked by [`EthernetFrame::encode`]
    pub fn new(src: MacAddr, dst: MacAddr, ether_type: u16, payload: &[u8]) -> Self {
        Self {
            dst,
            src,
            ether_type,
            payload: payload.to_vec(),
        }
    }

    /// Convert Ethernet frame to bytes
    ///
    /// Returns [`Error::TooLarge`] if the payload exceeds 1500 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > ETH_MAX_PAYLOAD {
            return Err(Error::too_large(
                "Ethernet payload",
                ETH_MAX_PAYLOAD,
                self.payload.len(),
            ));
        }

        let mut buf = vec![0u8; ETH_HEADER_LEN + self.payload.len()];
        buf[0..6].copy_from_slice(&self.dst.0);
        buf[6..12].copy_from_slice(&self.src.0);
        BigEndian::write_u16(&mut buf[12..14], self.ether_type);
        buf[ETH_HEADER_LEN..].copy_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse Ethernet frame from byte slice
    ///
    /// Every byte after the header is taken as payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < ETH_HEADER_LEN {
            return Err(Error::too_short("Ethernet frame", ETH_HEADER_LEN, data.len()));
        }

        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&data[0..6]);
        src.copy_from_slice(&data[6..12]);

        Ok(Self {
            dst: MacAddr(dst),
            src: MacAddr(src),
            ether_type: BigEndian::read_u16(&data[12..14]),
            payload: data[ETH_HEADER_LEN..].to_vec(),
        })
    }

    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }

    pub fn is_multicast(&self) -> bool {
        self.dst.is_multicast()
    }
}

impl fmt::Display for EthernetFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ethernet Frame: {} -> {}, Type: 0x{:04x}, Payload: {} bytes",
            self.src,
            self.dst,
            self.ether_type,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const DST: MacAddr = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

    #[test]
    fn test_encode_hello_frame() {
        let frame = EthernetFrame::new(SRC, DST, ether_type::IPV4, b"Hello");
        let data = frame.encode().unwrap();

        assert_eq!(data.len(), 19);
        assert_eq!(&data[0..6], &DST.0);
        assert_eq!(&data[6..12], &SRC.0);
        assert_eq!(&data[12..14], &[0x08, 0x00]);
        assert_eq!(&data[14..19], b"Hello");

        assert_eq!(EthernetFrame::decode(&data).unwrap(), frame);
    }

    #[test]
    fn test_payload_limit() {
        let ok = EthernetFrame::new(SRC, DST, ether_type::IPV4, &[0u8; 1500]);
        assert_eq!(ok.encode().unwrap().len(), 1514);

        let too_big = EthernetFrame::new(SRC, DST, ether_type::IPV4, &[0u8; 1501]);
        assert!(matches!(
            too_big.encode(),
            Err(Error::TooLarge {
                limit: 1500,
                actual: 1501,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            EthernetFrame::decode(&[0u8; 13]),
            Err(Error::TooShort { needed: 14, .. })
        ));
    }

    #[test]
    fn test_decode_header_only_has_empty_payload() {
        let frame = EthernetFrame::decode(&[0u8; 14]).unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_broadcast_and_multicast() {
        let broadcast = EthernetFrame::new(SRC, MacAddr::BROADCAST, ether_type::ARP, b"test");
        assert!(broadcast.is_broadcast());
        // The all-ones address also has the group bit set
        assert!(broadcast.is_multicast());

        let multicast = EthernetFrame::new(
            SRC,
            MacAddr([0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]),
            ether_type::IPV4,
            b"",
        );
        assert!(!multicast.is_broadcast());
        assert!(multicast.is_multicast());

        let unicast = EthernetFrame::new(SRC, DST, ether_type::IPV4, b"");
        assert!(!unicast.is_broadcast());
        assert!(!unicast.is_multicast());
    }

    #[test]
    fn test_display() {
        let frame = EthernetFrame::new(SRC, DST, ether_type::IPV4, b"Hello");
        assert_eq!(
            frame.to_string(),
            "Ethernet Frame: 00:11:22:33:44:55 -> aa:bb:cc:dd:ee:ff, Type: 0x0800, Payload: 5 bytes"
        );
    }
}
