//! Static route installation through a tun interface.
//!
//! Each [`RouteInstaller::add`] call resolves the interface's link-layer
//! address, builds one `RTM_ADD` message and writes it to a fresh routing
//! socket. Routes are not tracked afterwards and nothing is rolled back.
//! Only platforms with a `PF_ROUTE` socket support this; elsewhere `add`
//! returns [`Error::NotSupported`].

mod link;
mod message;
mod socket;

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info};

use crate::adapter::TunnelInterface;
use crate::error::{Error, Result};
use crate::prefix::RoutePrefix;

pub use link::{IfAddrsResolver, LinkAddress, LinkResolver};
pub use message::{
    sa_size, RouteMessage, AF_INET, AF_INET6, AF_LINK, RTA_DST, RTA_GATEWAY, RTA_NETMASK,
    RTF_HOST, RTF_STATIC, RTF_UP, RTM_ADD, RTM_VERSION, RT_MSGHDR_LEN,
};
pub use socket::{RouteSink, RoutingSocket};

/// Installs routes directing prefixes into an interface.
///
/// Owns the message sequence counter; keep one installer for the life of
/// the process so sequence numbers keep increasing.
#[derive(Debug)]
pub struct RouteInstaller<R = IfAddrsResolver, S = RoutingSocket> {
    resolver: R,
    sink: S,
    seq: AtomicU32,
}

impl RouteInstaller {
    /// Installer using `getifaddrs` and the kernel routing socket.
    pub fn new() -> Self {
        Self::with_parts(IfAddrsResolver, RoutingSocket)
    }
}

impl Default for RouteInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: LinkResolver, S: RouteSink> RouteInstaller<R, S> {
    pub fn with_parts(resolver: R, sink: S) -> Self {
        Self {
            resolver,
            sink,
            seq: AtomicU32::new(0),
        }
    }

    /// Route `destination` into `interface`.
    pub fn add_via(&self, interface: &TunnelInterface, destination: &RoutePrefix) -> Result<()> {
        self.add(interface.name(), destination)
    }

    /// Route `destination` into the interface called `interface`.
    ///
    /// Nothing is written unless the interface's link address resolves and
    /// the message builds. A short write is reported as
    /// [`Error::TransactionIncomplete`]; the route may or may not exist.
    pub fn add(&self, interface: &str, destination: &RoutePrefix) -> Result<()> {
        if !self.sink.is_supported() {
            return Err(Error::NotSupported("route installation"));
        }

        let gateway = self.resolver.link_address(interface)?;
        let message = RouteMessage::add(destination, &gateway)?;

        let seq = self.next_seq();
        let bytes = message.encode(seq)?;
        debug!(
            "RTM_ADD seq={} flags={:#x} addrs={:#x} len={}",
            seq,
            message.flags(),
            message.addrs(),
            bytes.len()
        );

        let written = self.sink.submit(&bytes)?;
        if written != bytes.len() {
            return Err(Error::TransactionIncomplete {
                written,
                expected: bytes.len(),
            });
        }

        info!("Added route: {} via interface {}", destination, interface);
        Ok(())
    }

    /// Last sequence number handed out, 0 before the first message.
    pub fn last_seq(&self) -> u32 {
        self.seq.load(Ordering::SeqCst)
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }
}
