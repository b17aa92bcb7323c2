//! Linux tun interfaces cloned from `/dev/net/tun`.

use std::ffi::CString;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use libc::{c_char, c_short, c_void, ioctl, IFF_TUN};
use tracing::{debug, info};

use super::{
    control_socket, copy_name, name_from_ifr, validate_name, InterfaceMode, TunAllocator,
    TunnelInterface, IFNAMSIZ,
};
use crate::error::{Error, Result, Stage};

/// Path of the tun clone device.
const CLONE_DEVICE: &str = "/dev/net/tun";

/// TUNSETIFF ioctl number.
const TUNSETIFF: libc::c_ulong = 0x400454ca;

/// SIOCGIFFLAGS - Get interface flags.
const SIOCGIFFLAGS: libc::c_ulong = 0x8913;

/// SIOCSIFFLAGS - Set interface flags.
const SIOCSIFFLAGS: libc::c_ulong = 0x8914;

/// IFF_UP - Interface is up.
const IFF_UP: c_short = 0x1;

/// Interface request structure.
#[repr(C)]
struct IfReq {
    ifr_name: [c_char; IFNAMSIZ],
    ifr_flags: c_short,
    _pad: [u8; 22],
}

impl IfReq {
    fn new(name: &str, flags: c_short) -> Self {
        let mut ifr = IfReq {
            ifr_name: [0; IFNAMSIZ],
            ifr_flags: flags,
            _pad: [0; 22],
        };
        copy_name(&mut ifr.ifr_name, name);
        ifr
    }
}

/// Allocator for the Linux clone-device model.
///
/// Interfaces are created without `IFF_NO_PI`, so every frame carries the
/// 4-byte `tun_pi` header decoded by [`crate::frame::PacketInfoCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CloneDeviceAllocator;

impl CloneDeviceAllocator {
    pub fn new() -> Self {
        Self
    }
}

impl TunAllocator for CloneDeviceAllocator {
    fn create(&self, requested_name: Option<&str>) -> Result<TunnelInterface> {
        let requested = requested_name.map(validate_name).transpose()?;

        // TUNSETIFF attaches to an existing persistent interface instead of
        // failing, so check first.
        if let Some(name) = requested {
            if interface_exists(name)? {
                return Err(Error::CreationFailed {
                    stage: Stage::Create,
                    source: io::Error::from_raw_os_error(libc::EEXIST),
                });
            }
        }

        let ctl = control_socket(Stage::ControlSocket)?;

        let fd: OwnedFd = OpenOptions::new()
            .read(true)
            .write(true)
            .open(CLONE_DEVICE)
            .map_err(|e| Error::unavailable(Stage::DeviceOpen, e))?
            .into();

        let mut ifr = IfReq::new(requested.unwrap_or(""), IFF_TUN as c_short);
        if unsafe { ioctl(fd.as_raw_fd(), TUNSETIFF as _, &mut ifr as *mut _ as *mut c_void) } < 0
        {
            return Err(Error::ioctl(Stage::Create));
        }

        let name = name_from_ifr(&ifr.ifr_name);
        info!("Created TUN device: {}", name);

        set_up(&ctl, &name)?;
        info!("Interface {} is up", name);

        Ok(TunnelInterface::new(
            name,
            fd,
            InterfaceMode::PointToPoint,
            true,
        ))
    }

    fn destroy(&self, interface: TunnelInterface) -> Result<()> {
        // The kernel removes the interface once the descriptor closes.
        debug!("Closing TUN device: {}", interface.name());
        drop(interface);
        Ok(())
    }
}

fn interface_exists(name: &str) -> Result<bool> {
    let c_name = CString::new(name).map_err(|_| Error::InvalidName(name.to_string()))?;
    Ok(unsafe { libc::if_nametoindex(c_name.as_ptr()) } != 0)
}

/// Set `IFF_UP`, keeping the flags already on the interface.
fn set_up(ctl: &OwnedFd, name: &str) -> Result<()> {
    let mut ifr = IfReq::new(name, 0);

    unsafe {
        if ioctl(ctl.as_raw_fd(), SIOCGIFFLAGS as _, &mut ifr as *mut _ as *mut c_void) < 0 {
            return Err(Error::ioctl(Stage::Up));
        }

        ifr.ifr_flags |= IFF_UP;

        if ioctl(ctl.as_raw_fd(), SIOCSIFFLAGS as _, &mut ifr as *mut _ as *mut c_void) < 0 {
            return Err(Error::ioctl(Stage::Up));
        }
    }

    Ok(())
}
