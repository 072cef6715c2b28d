//! Link layer protocols implementation
//!
//! This module contains the Ethernet II frame codec. Actual link-layer
//! transmission and ARP resolution live outside this crate.

pub mod ethernet;

// Re-export commonly used items
pub use ethernet::{ether_type, EthernetFrame, MacAddr, ETH_HEADER_LEN, ETH_MAX_PAYLOAD};
