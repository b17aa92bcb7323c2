//! `PF_ROUTE` message serialization.
//!
//! Layout follows FreeBSD's `<net/route.h>`: a `struct rt_msghdr` followed
//! by the socket addresses named in `rtm_addrs`, in bit order, each padded
//! to `SA_SIZE` (a multiple of `sizeof(long)`). Fields are host byte order.
//! Other BSDs number `RTM_VERSION` and size `rt_metrics` differently.

use std::mem::size_of;

use bytes::{BufMut, Bytes, BytesMut};
use libc::c_long;

use super::link::LinkAddress;
use crate::error::{Error, Result};
use crate::family::AddressFamily;
use crate::netmask;
use crate::prefix::RoutePrefix;

pub const RTM_VERSION: u8 = 5;
pub const RTM_ADD: u8 = 0x1;

pub const RTF_UP: i32 = 0x1;
pub const RTF_HOST: i32 = 0x4;
pub const RTF_STATIC: i32 = 0x800;

pub const RTA_DST: i32 = 0x1;
pub const RTA_GATEWAY: i32 = 0x2;
pub const RTA_NETMASK: i32 = 0x4;

/// Socket address family tags as the BSD kernel numbers them.
pub const AF_INET: u8 = 2;
pub const AF_LINK: u8 = 18;
pub const AF_INET6: u8 = 28;

const SOCKADDR_IN_LEN: usize = 16;
const SOCKADDR_IN6_LEN: usize = 28;

const LONG: usize = size_of::<c_long>();

/// `struct rt_metrics`: fourteen `u_long`s.
const RT_METRICS_LEN: usize = 14 * LONG;

/// `sizeof(struct rt_msghdr)`.
pub const RT_MSGHDR_LEN: usize = 32 + LONG + RT_METRICS_LEN;

/// `SA_SIZE()`: socket address length rounded up to `sizeof(long)`.
pub fn sa_size(sa_len: usize) -> usize {
    if sa_len == 0 {
        LONG
    } else {
        1 + ((sa_len - 1) | (LONG - 1))
    }
}

/// `sockaddr_in` / `sockaddr_in6` holding `bytes` as the address.
fn inet_sockaddr(family: AddressFamily, bytes: &[u8]) -> Result<Vec<u8>> {
    let sa = match family {
        AddressFamily::Ipv4 => {
            let mut sa = vec![0u8; SOCKADDR_IN_LEN];
            sa[0] = SOCKADDR_IN_LEN as u8;
            sa[1] = AF_INET;
            // sin_port stays zero
            sa[4..8].copy_from_slice(bytes);
            sa
        }
        AddressFamily::Ipv6 => {
            let mut sa = vec![0u8; SOCKADDR_IN6_LEN];
            sa[0] = SOCKADDR_IN6_LEN as u8;
            sa[1] = AF_INET6;
            // sin6_port, sin6_flowinfo and sin6_scope_id stay zero
            sa[8..24].copy_from_slice(bytes);
            sa
        }
        AddressFamily::Unrecognized => return Err(Error::UnsupportedFamily(family)),
    };
    Ok(sa)
}

/// An `RTM_ADD` request routing a prefix to an interface.
#[derive(Debug, Clone)]
pub struct RouteMessage {
    flags: i32,
    addrs: i32,
    destination: Vec<u8>,
    gateway: Vec<u8>,
    netmask: Option<Vec<u8>>,
}

impl RouteMessage {
    /// Route `destination` through the interface owning `gateway`.
    ///
    /// A full-width prefix becomes a host route without netmask; anything
    /// shorter carries a netmask. A zero-length prefix is rejected by the
    /// netmask builder.
    pub fn add(destination: &RoutePrefix, gateway: &LinkAddress) -> Result<Self> {
        let family = destination.family();
        let dst = inet_sockaddr(family, &destination.octets())?;

        let mut flags = RTF_UP | RTF_STATIC;
        let mut addrs = RTA_DST | RTA_GATEWAY;

        let netmask = if destination.is_host() {
            flags |= RTF_HOST;
            None
        } else {
            let mask = netmask::build(family, destination.prefix_len())?;
            addrs |= RTA_NETMASK;
            Some(inet_sockaddr(family, &mask)?)
        };

        Ok(Self {
            flags,
            addrs,
            destination: dst,
            gateway: gateway.as_bytes().to_vec(),
            netmask,
        })
    }

    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// `rtm_addrs` bitmask.
    pub fn addrs(&self) -> i32 {
        self.addrs
    }

    pub fn has_netmask(&self) -> bool {
        self.netmask.is_some()
    }

    /// Total message length (`rtm_msglen`).
    pub fn msg_len(&self) -> usize {
        RT_MSGHDR_LEN
            + self
                .sockaddrs()
                .map(|sa| sa_size(sa.len()))
                .sum::<usize>()
    }

    /// Present addresses in `RTA_*` bit order.
    fn sockaddrs(&self) -> impl Iterator<Item = &[u8]> {
        [
            Some(self.destination.as_slice()),
            Some(self.gateway.as_slice()),
            self.netmask.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Serialize with sequence number `seq`.
    pub fn encode(&self, seq: u32) -> Result<Bytes> {
        let len = self.msg_len();
        let msglen = u16::try_from(len)
            .map_err(|_| Error::precondition(format!("route message too long: {}", len)))?;

        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16_ne(msglen);
        buf.put_u8(RTM_VERSION);
        buf.put_u8(RTM_ADD);
        buf.put_u16_ne(0); // rtm_index
        buf.put_u16_ne(0); // _rtm_spare1
        buf.put_i32_ne(self.flags);
        buf.put_i32_ne(self.addrs);
        buf.put_i32_ne(0); // rtm_pid, filled in by the kernel
        buf.put_i32_ne(seq as i32);
        buf.put_i32_ne(0); // rtm_errno
        buf.put_i32_ne(0); // rtm_fmask
        buf.put_bytes(0, LONG + RT_METRICS_LEN); // rtm_inits, rtm_rmx
        debug_assert_eq!(buf.len(), RT_MSGHDR_LEN);

        for sa in self.sockaddrs() {
            buf.put_slice(sa);
            buf.put_bytes(0, sa_size(sa.len()) - sa.len());
        }
        debug_assert_eq!(buf.len(), len);

        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::link::tests::fake_link;

    fn read_i32(buf: &[u8], off: usize) -> i32 {
        i32::from_ne_bytes(buf[off..off + 4].try_into().unwrap())
    }

    #[test]
    fn test_sa_size() {
        assert_eq!(sa_size(0), LONG);
        assert_eq!(sa_size(16), 16);
        assert_eq!(sa_size(28), if LONG == 8 { 32 } else { 28 });
        assert_eq!(sa_size(54), 56);
        assert_eq!(sa_size(1), LONG);
    }

    #[test]
    fn test_header_len() {
        if LONG == 8 {
            assert_eq!(RT_MSGHDR_LEN, 152);
        }
    }

    #[cfg(target_os = "freebsd")]
    #[test]
    fn test_matches_host_headers() {
        assert_eq!(RTM_VERSION as libc::c_int, libc::RTM_VERSION);
        assert_eq!(RT_MSGHDR_LEN, size_of::<libc::rt_msghdr>());
    }

    #[test]
    fn test_host_route_has_no_netmask() {
        let dst: RoutePrefix = "203.0.113.5/32".parse().unwrap();
        let msg = RouteMessage::add(&dst, &fake_link("tun0")).unwrap();
        assert!(!msg.has_netmask());
        assert_eq!(msg.addrs(), RTA_DST | RTA_GATEWAY);
        assert_eq!(msg.flags(), RTF_UP | RTF_STATIC | RTF_HOST);
    }

    #[test]
    fn test_network_route_has_netmask() {
        let dst: RoutePrefix = "2001:db8::/32".parse().unwrap();
        let msg = RouteMessage::add(&dst, &fake_link("tun0")).unwrap();
        assert!(msg.has_netmask());
        assert_eq!(msg.addrs() & RTA_NETMASK, RTA_NETMASK);
        assert_eq!(msg.flags() & RTF_HOST, 0);
        assert_eq!(msg.flags(), RTF_UP | RTF_STATIC);
    }

    #[test]
    fn test_default_route_rejected() {
        let dst: RoutePrefix = "0.0.0.0/0".parse().unwrap();
        assert!(matches!(
            RouteMessage::add(&dst, &fake_link("tun0")),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_encode_ipv4_network() {
        let gw = fake_link("tun0");
        let dst: RoutePrefix = "198.51.100.0/24".parse().unwrap();
        let msg = RouteMessage::add(&dst, &gw).unwrap();
        let buf = msg.encode(7).unwrap();

        assert_eq!(buf.len(), msg.msg_len());
        assert_eq!(u16::from_ne_bytes([buf[0], buf[1]]) as usize, buf.len());
        assert_eq!(buf[2], RTM_VERSION);
        assert_eq!(buf[3], RTM_ADD);
        assert_eq!(read_i32(&buf, 8), RTF_UP | RTF_STATIC);
        assert_eq!(read_i32(&buf, 12), RTA_DST | RTA_GATEWAY | RTA_NETMASK);
        assert_eq!(read_i32(&buf, 20), 7);

        // destination
        let dst_sa = &buf[RT_MSGHDR_LEN..RT_MSGHDR_LEN + 16];
        assert_eq!(dst_sa[0], 16);
        assert_eq!(dst_sa[1], AF_INET);
        assert_eq!(&dst_sa[4..8], &[198, 51, 100, 0]);

        // gateway, padded
        let gw_off = RT_MSGHDR_LEN + 16;
        let gw_len = gw.as_bytes().len();
        assert_eq!(&buf[gw_off..gw_off + gw_len], gw.as_bytes());

        // netmask last
        let mask_off = gw_off + sa_size(gw_len);
        let mask_sa = &buf[mask_off..mask_off + 16];
        assert_eq!(mask_sa[1], AF_INET);
        assert_eq!(&mask_sa[4..8], &[255, 255, 255, 0]);
        assert_eq!(mask_off + 16, buf.len());
    }

    #[test]
    fn test_encode_ipv6_host() {
        let dst: RoutePrefix = "2001:db8::5".parse().unwrap();
        let msg = RouteMessage::add(&dst, &fake_link("tun1")).unwrap();
        let buf = msg.encode(1).unwrap();
        let dst_sa = &buf[RT_MSGHDR_LEN..RT_MSGHDR_LEN + SOCKADDR_IN6_LEN];
        assert_eq!(dst_sa[0], SOCKADDR_IN6_LEN as u8);
        assert_eq!(dst_sa[1], AF_INET6);
        assert_eq!(&dst_sa[8..24], &dst.octets()[..]);
        assert_eq!(read_i32(&buf, 12), RTA_DST | RTA_GATEWAY);
    }
}
