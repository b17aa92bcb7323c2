//! Error types for tun interface and route management.

use std::fmt;

use thiserror::Error;

use crate::family::AddressFamily;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The system call step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the throwaway `AF_INET` datagram socket used for ioctls.
    ControlSocket,
    /// Opening the tun clone device or the per-interface device node.
    DeviceOpen,
    /// `TUNSETIFF` / `SIOCIFCREATE2`.
    Create,
    /// `TUNSIFMODE`.
    SetMode,
    /// `TUNSIFHEAD`.
    SetHead,
    /// `SIOCSIFFLAGS` with `IFF_UP`.
    Up,
    /// `SIOCIFDESTROY`.
    Destroy,
    /// Opening the `PF_ROUTE` socket.
    RoutingSocket,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ControlSocket => "control socket open",
            Stage::DeviceOpen => "device open",
            Stage::Create => "interface create ioctl",
            Stage::SetMode => "point-to-point mode ioctl",
            Stage::SetHead => "address family header ioctl",
            Stage::Up => "interface up",
            Stage::Destroy => "interface destroy ioctl",
            Stage::RoutingSocket => "routing socket open",
        };
        f.write_str(s)
    }
}

/// Main error type for tunnel interface operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A control socket or device node could not be opened.
    #[error("{stage} failed: {source}")]
    ResourceUnavailable {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// A create/configure ioctl was rejected by the kernel.
    #[error("{stage} failed: {source}")]
    CreationFailed {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// Only IPv4 and IPv6 can be framed or routed.
    #[error("Unsupported address family: {0}")]
    UnsupportedFamily(AddressFamily),

    /// No link-layer address was found for the interface.
    #[error("No link-layer address found for interface {0}")]
    LookupFailed(String),

    /// The routing socket accepted fewer bytes than the message length.
    #[error("Route message partially written: {written} of {expected} bytes")]
    TransactionIncomplete { written: usize, expected: usize },

    /// Prefix length outside of the family's range.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Interface name empty, too long or not ASCII.
    #[error("Invalid interface name: {0:?}")]
    InvalidName(String),

    /// Unparseable `addr/len` string.
    #[error("Invalid route prefix: {0}")]
    InvalidPrefix(String),

    /// Frame shorter than the 4-byte family header.
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    /// Output buffer cannot hold the header plus the packet.
    #[error("Frame buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The operation has no implementation on this platform.
    #[error("Not supported on this platform: {0}")]
    NotSupported(&'static str),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// A socket or device node could not be opened at `stage`.
    pub(crate) fn unavailable(stage: Stage, source: std::io::Error) -> Self {
        Self::ResourceUnavailable { stage, source }
    }

    /// An ioctl at `stage` failed; captures `errno`.
    pub(crate) fn ioctl(stage: Stage) -> Self {
        Self::CreationFailed {
            stage,
            source: std::io::Error::last_os_error(),
        }
    }

    /// Create a new precondition error.
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::PreconditionViolation(msg.into())
    }

    /// The stage that failed, for socket and ioctl errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::ResourceUnavailable { stage, .. } | Self::CreationFailed { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// Whether the failure should end the session.
    ///
    /// Teardown failures are reported as warnings; everything else aborts
    /// the operation in progress.
    pub fn is_fatal(&self) -> bool {
        self.stage() != Some(Stage::Destroy)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
