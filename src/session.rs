//! A tunnel session: one interface plus the routes pointing into it.

use tracing::{info, warn};

use crate::adapter::{NativeAllocator, TunAllocator, TunnelInterface};
use crate::config::TunnelConfig;
use crate::error::{Error, Result};
use crate::frame::NativeCodec;
use crate::route::{IfAddrsResolver, LinkResolver, RouteInstaller, RouteSink, RoutingSocket};

/// Owns the interface for the duration of a session.
///
/// Dropping the session destroys the interface; failures there are logged
/// and otherwise ignored.
pub struct Session<A: TunAllocator = NativeAllocator, R = IfAddrsResolver, S = RoutingSocket> {
    allocator: A,
    installer: RouteInstaller<R, S>,
    name: String,
    interface: Option<TunnelInterface>,
}

impl Session {
    /// Open a session with the platform allocator and routing socket.
    pub fn open(config: &TunnelConfig) -> Result<Self> {
        Self::open_with(NativeAllocator::default(), RouteInstaller::new(), config)
    }
}

impl<A: TunAllocator, R: LinkResolver, S: RouteSink> Session<A, R, S> {
    /// Create the interface and install every enabled route.
    ///
    /// If a route fails the interface is torn down again and the route
    /// error returned. When the platform has no routing socket the
    /// interface is kept, no routes are installed and a warning is logged.
    pub fn open_with(
        allocator: A,
        installer: RouteInstaller<R, S>,
        config: &TunnelConfig,
    ) -> Result<Self> {
        let interface = allocator.create(config.interface.as_deref())?;
        let mut session = Self {
            allocator,
            installer,
            name: interface.name().to_string(),
            interface: Some(interface),
        };

        for route in &config.routes {
            if !config.family_enabled(route.family()) {
                warn!("Skipping route {}: {} is not enabled", route, route.family());
                continue;
            }

            match session.installer.add(&session.name, route) {
                Ok(()) => {}
                Err(Error::NotSupported(what)) => {
                    warn!("Not installing routes: {} is not supported", what);
                    break;
                }
                Err(e) => {
                    session.teardown();
                    return Err(e);
                }
            }
        }

        info!("Session open on {}", session.name());
        Ok(session)
    }

    /// The open interface, for reading and writing frames.
    pub fn interface(&self) -> Result<&TunnelInterface> {
        self.interface
            .as_ref()
            .ok_or_else(|| Error::precondition(format!("session on {} is closed", self.name)))
    }

    /// Interface name as assigned at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame codec matching the interface's header layout.
    pub fn codec(&self) -> NativeCodec {
        NativeCodec::default()
    }

    /// Destroy the interface, returning any teardown error.
    pub fn close(mut self) -> Result<()> {
        match self.interface.take() {
            Some(interface) => self.allocator.destroy(interface),
            None => Ok(()),
        }
    }
}

impl<A: TunAllocator, R, S> Session<A, R, S> {
    fn teardown(&mut self) {
        if let Some(interface) = self.interface.take() {
            let name = interface.name().to_string();
            if let Err(e) = self.allocator.destroy(interface) {
                warn!("Failed to destroy {}: {}", name, e);
            }
        }
    }
}

impl<A: TunAllocator, R, S> Drop for Session<A, R, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
