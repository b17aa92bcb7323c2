//! Route destination prefixes.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::family::AddressFamily;

/// A destination address with its prefix length, e.g. `203.0.113.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePrefix {
    addr: IpAddr,
    prefix_len: u8,
}

impl RoutePrefix {
    /// Create a prefix, rejecting lengths wider than the address.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        let family = AddressFamily::of(&addr);
        // of() never yields Unrecognized
        let max = family.max_prefix_len().unwrap_or(0);
        if prefix_len > max {
            return Err(Error::InvalidPrefix(format!(
                "{}/{}: prefix length exceeds {}",
                addr, prefix_len, max
            )));
        }
        Ok(Self { addr, prefix_len })
    }

    /// A full-width prefix for a single address.
    pub fn host(addr: IpAddr) -> Self {
        let prefix_len = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        Self { addr, prefix_len }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    /// True when the prefix covers exactly one address.
    pub fn is_host(&self) -> bool {
        Some(self.prefix_len) == self.family().max_prefix_len()
    }

    /// Address bytes in network order (4 or 16 bytes).
    pub fn octets(&self) -> Vec<u8> {
        match self.addr {
            IpAddr::V4(a) => a.octets().to_vec(),
            IpAddr::V6(a) => a.octets().to_vec(),
        }
    }
}

impl FromStr for RoutePrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr, len) = match s.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (s, None),
        };

        let addr: IpAddr = addr
            .parse()
            .map_err(|_| Error::InvalidPrefix(format!("{}: bad address", s)))?;

        match len {
            None => Ok(Self::host(addr)),
            Some(l) => {
                let prefix_len: u8 = l
                    .parse()
                    .map_err(|_| Error::InvalidPrefix(format!("{}: bad prefix length", s)))?;
                Self::new(addr, prefix_len)
            }
        }
    }
}

impl TryFrom<String> for RoutePrefix {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<RoutePrefix> for String {
    fn from(p: RoutePrefix) -> Self {
        p.to_string()
    }
}

impl fmt::Display for RoutePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_network() {
        let p: RoutePrefix = "203.0.113.0/24".parse().unwrap();
        assert_eq!(p.addr(), IpAddr::V4(Ipv4Addr::new(203, 0, 113, 0)));
        assert_eq!(p.prefix_len(), 24);
        assert_eq!(p.family(), AddressFamily::Ipv4);
        assert!(!p.is_host());
    }

    #[test]
    fn test_parse_bare_address_is_host() {
        let p: RoutePrefix = "2001:db8::1".parse().unwrap();
        assert_eq!(p.prefix_len(), 128);
        assert!(p.is_host());
        assert_eq!(p.octets().len(), 16);
    }

    #[test]
    fn test_reject_wide_prefix() {
        assert!("10.0.0.0/33".parse::<RoutePrefix>().is_err());
        assert!(RoutePrefix::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 129).is_err());
        assert!("10.0.0.0/x".parse::<RoutePrefix>().is_err());
        assert!("tun0/8".parse::<RoutePrefix>().is_err());
    }

    #[test]
    fn test_zero_length_allowed() {
        let p: RoutePrefix = "0.0.0.0/0".parse().unwrap();
        assert_eq!(p.prefix_len(), 0);
    }

    #[test]
    fn test_display_and_serde() {
        let p: RoutePrefix = "2001:db8::/32".parse().unwrap();
        assert_eq!(p.to_string(), "2001:db8::/32");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"2001:db8::/32\"");
        let back: RoutePrefix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
