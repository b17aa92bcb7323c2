//! Submission of route messages to the kernel.

use crate::error::Result;
#[cfg(not(target_os = "freebsd"))]
use crate::error::Error;

/// Destination for serialized route messages.
pub trait RouteSink {
    /// Whether messages can be submitted at all on this platform.
    fn is_supported(&self) -> bool {
        true
    }

    /// Deliver one message; returns the number of bytes accepted.
    fn submit(&self, message: &[u8]) -> Result<usize>;
}

/// `PF_ROUTE` raw socket, opened and closed for each message.
///
/// Replies from the kernel are never read.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoutingSocket;

#[cfg(target_os = "freebsd")]
impl RouteSink for RoutingSocket {
    fn submit(&self, message: &[u8]) -> Result<usize> {
        use std::io;
        use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

        use crate::error::{Error, Stage};

        let fd = unsafe { libc::socket(libc::PF_ROUTE, libc::SOCK_RAW, 0) };
        if fd < 0 {
            return Err(Error::unavailable(
                Stage::RoutingSocket,
                io::Error::last_os_error(),
            ));
        }
        let sock = unsafe { OwnedFd::from_raw_fd(fd) };

        let n = unsafe {
            libc::write(
                sock.as_raw_fd(),
                message.as_ptr() as *const libc::c_void,
                message.len(),
            )
        };
        if n < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        Ok(n as usize)
    }
}

#[cfg(not(target_os = "freebsd"))]
impl RouteSink for RoutingSocket {
    fn is_supported(&self) -> bool {
        false
    }

    fn submit(&self, _message: &[u8]) -> Result<usize> {
        Err(Error::NotSupported("routing socket"))
    }
}
