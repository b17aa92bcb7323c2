//! Address families carried in frame headers and route messages.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// EtherType of an IPv4 payload.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// EtherType of an IPv6 payload.
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// Numeric value reported for a family that could not be decoded.
pub const UNRECOGNIZED_VALUE: u32 = 255;

/// Address family of a frame or route.
///
/// `Unrecognized` is only ever produced by decoding; it can't be encoded
/// into a frame or routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    Unrecognized,
}

impl AddressFamily {
    /// Family of an IP address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }

    /// Guess the family from the version nibble of a raw IP packet.
    pub fn from_packet(packet: &[u8]) -> Self {
        match packet.first().map(|b| b >> 4) {
            Some(4) => Self::Ipv4,
            Some(6) => Self::Ipv6,
            _ => Self::Unrecognized,
        }
    }

    /// Map an EtherType to a family.
    pub fn from_ether_type(ether_type: u16) -> Self {
        match ether_type {
            ETHERTYPE_IPV4 => Self::Ipv4,
            ETHERTYPE_IPV6 => Self::Ipv6,
            _ => Self::Unrecognized,
        }
    }

    /// EtherType for this family.
    pub fn ether_type(self) -> Option<u16> {
        match self {
            Self::Ipv4 => Some(ETHERTYPE_IPV4),
            Self::Ipv6 => Some(ETHERTYPE_IPV6),
            Self::Unrecognized => None,
        }
    }

    /// The host's `AF_*` value, or 255 for `Unrecognized`.
    pub fn value(self) -> u32 {
        match self {
            Self::Ipv4 => libc::AF_INET as u32,
            Self::Ipv6 => libc::AF_INET6 as u32,
            Self::Unrecognized => UNRECOGNIZED_VALUE,
        }
    }

    /// Address width in bits.
    pub fn max_prefix_len(self) -> Option<u8> {
        match self {
            Self::Ipv4 => Some(32),
            Self::Ipv6 => Some(128),
            Self::Unrecognized => None,
        }
    }

    /// Address width in bytes.
    pub fn address_len(self) -> Option<usize> {
        self.max_prefix_len().map(|bits| bits as usize / 8)
    }

    pub fn is_recognized(self) -> bool {
        self != Self::Unrecognized
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4 => f.write_str("IPv4"),
            Self::Ipv6 => f.write_str("IPv6"),
            Self::Unrecognized => write!(f, "unrecognized({})", UNRECOGNIZED_VALUE),
        }
    }
}
