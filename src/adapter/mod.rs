//! TUN interface allocation.
//!
//! One [`TunAllocator`] contract with a concrete implementation per
//! platform model:
//!
//! * Linux clones an interface from `/dev/net/tun` ([`CloneDeviceAllocator`]).
//!   The interface disappears when its descriptor is closed.
//! * FreeBSD create the interface with `SIOCIFCREATE2` and open
//!   its device node ([`IfCreateAllocator`]). The interface outlives the
//!   process and must be destroyed explicitly.
//!
//! [`NativeAllocator`] names the implementation for the build target.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use libc::{c_char, c_void};

use crate::error::{Error, Result, Stage};

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "freebsd")]
mod bsd;

#[cfg(target_os = "linux")]
pub use linux::CloneDeviceAllocator;

#[cfg(target_os = "freebsd")]
pub use bsd::IfCreateAllocator;

/// Allocator for the build target.
#[cfg(target_os = "linux")]
pub type NativeAllocator = CloneDeviceAllocator;

/// Allocator for the build target.
#[cfg(target_os = "freebsd")]
pub type NativeAllocator = IfCreateAllocator;

/// Allocator for the build target.
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub type NativeAllocator = UnsupportedAllocator;

/// Size of `ifr_name`, including the terminating NUL.
pub const IFNAMSIZ: usize = 16;

/// Link framing of an allocated interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    PointToPoint,
    Broadcast,
}

/// Creates and destroys tun interfaces.
pub trait TunAllocator {
    /// Create a new tun interface.
    ///
    /// With `None` the platform picks the name. A name that is already in
    /// use is an error. Any failing step aborts the call and no interface is
    /// left behind.
    fn create(&self, requested_name: Option<&str>) -> Result<TunnelInterface>;

    /// Tear an interface down.
    ///
    /// Failures carry [`Stage::Destroy`] and are not fatal to the session.
    fn destroy(&self, interface: TunnelInterface) -> Result<()>;
}

/// One allocated tun interface and its frame descriptor.
#[derive(Debug)]
pub struct TunnelInterface {
    name: String,
    fd: OwnedFd,
    mode: InterfaceMode,
    up: bool,
}

impl TunnelInterface {
    pub(crate) fn new(name: String, fd: OwnedFd, mode: InterfaceMode, up: bool) -> Self {
        Self { name, fd, mode, up }
    }

    /// Interface name as assigned by the kernel.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> InterfaceMode {
        self.mode
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Read one frame (family header + packet).
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    }

    /// Write one frame (family header + packet).
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                buf.as_ptr() as *const c_void,
                buf.len(),
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    }
}

impl AsRawFd for TunnelInterface {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for TunnelInterface {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// Allocator for targets with neither tun model.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedAllocator;

impl TunAllocator for UnsupportedAllocator {
    fn create(&self, _requested_name: Option<&str>) -> Result<TunnelInterface> {
        Err(Error::NotSupported("tun interface creation"))
    }

    fn destroy(&self, _interface: TunnelInterface) -> Result<()> {
        Ok(())
    }
}

/// Check a caller-supplied interface name.
pub fn validate_name(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name.len() < IFNAMSIZ
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b'/');
    if !valid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Open a throwaway `AF_INET` datagram socket for interface ioctls.
///
/// The socket is closed when the returned handle drops.
#[cfg_attr(not(any(target_os = "linux", target_os = "freebsd")), allow(dead_code))]
pub(crate) fn control_socket(stage: Stage) -> Result<OwnedFd> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(Error::unavailable(stage, io::Error::last_os_error()));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Copy an interface name into an `ifr_name` buffer, NUL-terminated.
#[cfg_attr(not(any(target_os = "linux", target_os = "freebsd")), allow(dead_code))]
pub(crate) fn copy_name(buf: &mut [c_char; IFNAMSIZ], name: &str) {
    for (i, byte) in name.bytes().take(IFNAMSIZ - 1).enumerate() {
        buf[i] = byte as c_char;
    }
}

/// Read the name the kernel wrote back into `ifr_name`.
#[cfg_attr(not(any(target_os = "linux", target_os = "freebsd")), allow(dead_code))]
pub(crate) fn name_from_ifr(buf: &[c_char; IFNAMSIZ]) -> String {
    buf.iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8 as char)
        .collect()
}
