//! Address-family framing for packets crossing the tun descriptor.
//!
//! Every read from or write to the descriptor is one frame: a 4-byte
//! header naming the payload's address family followed by the raw IP
//! packet. The header layout depends on the platform:
//!
//! * Linux prepends `struct tun_pi`: 16-bit flags then a big-endian
//!   EtherType.
//! * BSD with `TUNSIFHEAD` prepends the `AF_*` value as a big-endian
//!   32-bit integer.
//!
//! Callers should rely only on the header being 4 bytes long and on
//! decode/encode round-tripping through the same codec.

use tracing::warn;

use crate::error::{Error, Result};
use crate::family::AddressFamily;

/// Length of the family header at the start of each frame.
pub const HEADER_LEN: usize = 4;

/// Encoding and decoding of the 4-byte family header.
pub trait FrameCodec {
    /// Read the family from the head of `frame`.
    ///
    /// Unknown values and frames shorter than the header decode to
    /// [`AddressFamily::Unrecognized`] rather than failing.
    fn decode_family(&self, frame: &[u8]) -> AddressFamily;

    /// Write the header for `family` into the first 4 bytes of `frame`.
    fn encode_family(&self, frame: &mut [u8], family: AddressFamily) -> Result<()>;

    /// The payload following the header (zero-copy).
    #[inline]
    fn payload<'a>(&self, frame: &'a [u8]) -> Option<&'a [u8]> {
        frame.get(HEADER_LEN..)
    }

    /// Prepend a header to `packet` inside `buffer` (zero-copy).
    ///
    /// Returns the slice of `buffer` holding the complete frame.
    fn wrap<'a>(
        &self,
        family: AddressFamily,
        packet: &[u8],
        buffer: &'a mut [u8],
    ) -> Result<&'a [u8]> {
        let total_len = HEADER_LEN + packet.len();
        if buffer.len() < total_len {
            return Err(Error::BufferTooSmall {
                needed: total_len,
                available: buffer.len(),
            });
        }
        self.encode_family(buffer, family)?;
        buffer[HEADER_LEN..total_len].copy_from_slice(packet);
        Ok(&buffer[..total_len])
    }
}

fn check_len(frame: &[u8]) -> Result<()> {
    if frame.len() < HEADER_LEN {
        return Err(Error::FrameTooShort(frame.len()));
    }
    Ok(())
}

/// Linux `tun_pi` header: flags(2) + EtherType(2), network byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketInfoCodec;

impl FrameCodec for PacketInfoCodec {
    fn decode_family(&self, frame: &[u8]) -> AddressFamily {
        if frame.len() < HEADER_LEN {
            return AddressFamily::Unrecognized;
        }
        let ether_type = u16::from_be_bytes([frame[2], frame[3]]);
        let family = AddressFamily::from_ether_type(ether_type);
        if !family.is_recognized() {
            warn!("Unknown ether frame type {:#06x} received", ether_type);
        }
        family
    }

    fn encode_family(&self, frame: &mut [u8], family: AddressFamily) -> Result<()> {
        let ether_type = family
            .ether_type()
            .ok_or(Error::UnsupportedFamily(family))?;
        check_len(frame)?;
        frame[0..2].copy_from_slice(&0u16.to_be_bytes());
        frame[2..4].copy_from_slice(&ether_type.to_be_bytes());
        Ok(())
    }
}

/// BSD `TUNSIFHEAD` header: the `AF_*` value as a big-endian u32.
#[derive(Debug, Clone, Copy)]
pub struct AfHeaderCodec {
    inet: u32,
    inet6: u32,
}

impl AfHeaderCodec {
    /// Codec using explicit `AF_INET`/`AF_INET6` values.
    ///
    /// `AF_INET6` differs between BSDs (28 on FreeBSD, 30 on macOS, 24 on
    /// NetBSD/OpenBSD).
    pub const fn with_values(inet: u32, inet6: u32) -> Self {
        Self { inet, inet6 }
    }
}

impl Default for AfHeaderCodec {
    /// Codec using the host's family values.
    fn default() -> Self {
        Self::with_values(
            AddressFamily::Ipv4.value(),
            AddressFamily::Ipv6.value(),
        )
    }
}

impl FrameCodec for AfHeaderCodec {
    fn decode_family(&self, frame: &[u8]) -> AddressFamily {
        if frame.len() < HEADER_LEN {
            return AddressFamily::Unrecognized;
        }
        let af = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
        if af == self.inet {
            AddressFamily::Ipv4
        } else if af == self.inet6 {
            AddressFamily::Ipv6
        } else {
            warn!("Unknown address family {} received", af);
            AddressFamily::Unrecognized
        }
    }

    fn encode_family(&self, frame: &mut [u8], family: AddressFamily) -> Result<()> {
        let af = match family {
            AddressFamily::Ipv4 => self.inet,
            AddressFamily::Ipv6 => self.inet6,
            AddressFamily::Unrecognized => return Err(Error::UnsupportedFamily(family)),
        };
        check_len(frame)?;
        frame[0..4].copy_from_slice(&af.to_be_bytes());
        Ok(())
    }
}

/// Header layout of the frames produced by this platform's allocator.
#[cfg(target_os = "linux")]
pub type NativeCodec = PacketInfoCodec;

/// Header layout of the frames produced by this platform's allocator.
#[cfg(not(target_os = "linux"))]
pub type NativeCodec = AfHeaderCodec;
