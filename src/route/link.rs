//! Link-layer identity of an interface, used as a route gateway.

use crate::error::{Error, Result};

use super::message::AF_LINK;

/// Fixed part of `struct sockaddr_dl` ahead of `sdl_data`.
const SOCKADDR_DL_HEADER_LEN: usize = 8;

/// Raw `sockaddr_dl` of an interface, exactly `sdl_len` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddress(Vec<u8>);

impl LinkAddress {
    /// Take a `sockaddr_dl` as the kernel reported it.
    ///
    /// Returns `None` unless the bytes are tagged `AF_LINK` and hold at
    /// least `sdl_len` bytes.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() < SOCKADDR_DL_HEADER_LEN || raw[1] != AF_LINK {
            return None;
        }
        let sdl_len = raw[0] as usize;
        if sdl_len < SOCKADDR_DL_HEADER_LEN || sdl_len > raw.len() {
            return None;
        }
        Some(Self(raw[..sdl_len].to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `sdl_index`.
    pub fn index(&self) -> u16 {
        u16::from_ne_bytes([self.0[2], self.0[3]])
    }
}

/// Looks up the link-layer address of an interface by name.
pub trait LinkResolver {
    /// Fails with [`Error::LookupFailed`] when the interface has none.
    fn link_address(&self, interface: &str) -> Result<LinkAddress>;
}

/// Resolver walking `getifaddrs(3)` for the `AF_LINK` entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct IfAddrsResolver;

#[cfg(target_os = "freebsd")]
impl LinkResolver for IfAddrsResolver {
    fn link_address(&self, interface: &str) -> Result<LinkAddress> {
        use std::ffi::CStr;
        use std::{io, ptr, slice};

        /// Frees the list on every return path.
        struct IfAddrs(*mut libc::ifaddrs);

        impl Drop for IfAddrs {
            fn drop(&mut self) {
                unsafe { libc::freeifaddrs(self.0) };
            }
        }

        let mut ifap: *mut libc::ifaddrs = ptr::null_mut();
        if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        let list = IfAddrs(ifap);

        let mut ifa = list.0;
        while !ifa.is_null() {
            let entry = unsafe { &*ifa };
            ifa = entry.ifa_next;

            if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
                continue;
            }
            let sa = unsafe { &*entry.ifa_addr };
            if sa.sa_family as u8 != AF_LINK {
                continue;
            }
            let name = unsafe { CStr::from_ptr(entry.ifa_name) };
            if name.to_bytes() != interface.as_bytes() {
                continue;
            }

            let raw =
                unsafe { slice::from_raw_parts(entry.ifa_addr as *const u8, sa.sa_len as usize) };
            if let Some(link) = LinkAddress::from_bytes(raw) {
                return Ok(link);
            }
        }

        Err(Error::LookupFailed(interface.to_string()))
    }
}

#[cfg(not(target_os = "freebsd"))]
impl LinkResolver for IfAddrsResolver {
    fn link_address(&self, _interface: &str) -> Result<LinkAddress> {
        Err(Error::NotSupported("AF_LINK address lookup"))
    }
}
