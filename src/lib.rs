//! TUN interface lifecycle, frame headers and static routes.

pub mod adapter;
pub mod config;
pub mod error;
pub mod family;
pub mod frame;
pub mod netmask;
pub mod prefix;
pub mod route;
pub mod session;

// Re-export main types
pub use adapter::{InterfaceMode, NativeAllocator, TunAllocator, TunnelInterface};
pub use config::TunnelConfig;
pub use error::{Error, Result, Stage};
pub use family::AddressFamily;
pub use frame::{AfHeaderCodec, FrameCodec, NativeCodec, PacketInfoCodec};
pub use prefix::RoutePrefix;
pub use route::RouteInstaller;
pub use session::Session;

// Default configuration constants
pub const DEFAULT_CONFIG_FILE: &str = "tunif.json";
