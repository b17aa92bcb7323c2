//! FreeBSD tun interfaces created with `SIOCIFCREATE2`.

use std::fs::OpenOptions;
use std::mem::size_of;
use std::os::fd::{AsRawFd, OwnedFd};

use libc::{c_char, c_int, c_short, c_ulong, c_void, ioctl};
use tracing::{info, warn};

use super::{
    control_socket, copy_name, name_from_ifr, validate_name, InterfaceMode, TunAllocator,
    TunnelInterface, IFNAMSIZ,
};
use crate::error::{Error, Result, Stage};

/// Cloner name; the kernel appends the next free unit number.
const CLONER: &str = "tun";

const IOC_IN: c_ulong = 0x8000_0000;
const IOC_INOUT: c_ulong = 0xc000_0000;

/// `_IOC(inout, group, num, len)` from `<sys/ioccom.h>`.
const fn ioc(inout: c_ulong, group: u8, num: u8, len: usize) -> c_ulong {
    inout | (((len as c_ulong) & 0x1fff) << 16) | ((group as c_ulong) << 8) | num as c_ulong
}

const SIOCSIFFLAGS: c_ulong = ioc(IOC_IN, b'i', 16, size_of::<IfReq>());
const SIOCGIFFLAGS: c_ulong = ioc(IOC_INOUT, b'i', 17, size_of::<IfReq>());
const SIOCIFDESTROY: c_ulong = ioc(IOC_IN, b'i', 121, size_of::<IfReq>());
const SIOCIFCREATE2: c_ulong = ioc(IOC_INOUT, b'i', 124, size_of::<IfReq>());
const TUNSIFMODE: c_ulong = ioc(IOC_IN, b't', 94, size_of::<c_int>());
const TUNSIFHEAD: c_ulong = ioc(IOC_IN, b't', 96, size_of::<c_int>());

const IFF_UP: c_short = 0x1;
const IFF_POINTOPOINT: c_int = 0x10;

/// `struct ifreq` with the flags member of the union.
#[repr(C)]
struct IfReq {
    ifr_name: [c_char; IFNAMSIZ],
    ifr_flags: c_short,
    ifr_flagshigh: c_short,
    _pad: [u8; 12],
}

impl IfReq {
    fn new(name: &str) -> Self {
        let mut ifr = IfReq {
            ifr_name: [0; IFNAMSIZ],
            ifr_flags: 0,
            ifr_flagshigh: 0,
            _pad: [0; 12],
        };
        copy_name(&mut ifr.ifr_name, name);
        ifr
    }
}

/// Allocator for the BSD route-socket/ioctl model.
///
/// The device is switched to point-to-point mode and `TUNSIFHEAD` is
/// enabled, so every frame starts with the 4-byte address family read by
/// [`crate::frame::AfHeaderCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IfCreateAllocator;

impl IfCreateAllocator {
    pub fn new() -> Self {
        Self
    }
}

impl TunAllocator for IfCreateAllocator {
    fn create(&self, requested_name: Option<&str>) -> Result<TunnelInterface> {
        let requested = requested_name.map(validate_name).transpose()?;
        let ctl = control_socket(Stage::ControlSocket)?;

        // SIOCIFCREATE2 fails with EEXIST for a name in use.
        let mut ifr = IfReq::new(requested.unwrap_or(CLONER));
        if unsafe { ioctl(ctl.as_raw_fd(), SIOCIFCREATE2, &mut ifr as *mut _ as *mut c_void) } < 0
        {
            return Err(Error::ioctl(Stage::Create));
        }
        let name = name_from_ifr(&ifr.ifr_name);
        info!("Created TUN device: {}", name);

        match configure(&ctl, &name) {
            Ok(fd) => Ok(TunnelInterface::new(
                name,
                fd,
                InterfaceMode::PointToPoint,
                true,
            )),
            Err(e) => {
                if let Err(destroy_err) = destroy_by_name(&ctl, &name) {
                    warn!("Cannot destroy {} after failed setup: {}", name, destroy_err);
                }
                Err(e)
            }
        }
    }

    fn destroy(&self, interface: TunnelInterface) -> Result<()> {
        let name = interface.name().to_string();
        // Close the device before the interface goes away.
        drop(interface);

        let ctl = control_socket(Stage::Destroy)?;
        destroy_by_name(&ctl, &name)?;
        info!("Destroyed TUN device: {}", name);
        Ok(())
    }
}

/// Open the device node and set framing, then bring the interface up.
fn configure(ctl: &OwnedFd, name: &str) -> Result<OwnedFd> {
    let path = format!("/dev/{}", name);
    let fd: OwnedFd = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| Error::unavailable(Stage::DeviceOpen, e))?
        .into();

    let mut mode: c_int = IFF_POINTOPOINT;
    if unsafe { ioctl(fd.as_raw_fd(), TUNSIFMODE, &mut mode as *mut c_int) } < 0 {
        return Err(Error::ioctl(Stage::SetMode));
    }

    let mut on: c_int = 1;
    if unsafe { ioctl(fd.as_raw_fd(), TUNSIFHEAD, &mut on as *mut c_int) } < 0 {
        return Err(Error::ioctl(Stage::SetHead));
    }

    set_up(ctl, name)?;
    info!("Interface {} is up", name);

    Ok(fd)
}

/// Set `IFF_UP`, keeping the flags already on the interface.
fn set_up(ctl: &OwnedFd, name: &str) -> Result<()> {
    let mut ifr = IfReq::new(name);

    unsafe {
        if ioctl(ctl.as_raw_fd(), SIOCGIFFLAGS, &mut ifr as *mut _ as *mut c_void) < 0 {
            return Err(Error::ioctl(Stage::Up));
        }

        ifr.ifr_flags |= IFF_UP;

        if ioctl(ctl.as_raw_fd(), SIOCSIFFLAGS, &mut ifr as *mut _ as *mut c_void) < 0 {
            return Err(Error::ioctl(Stage::Up));
        }
    }

    Ok(())
}

fn destroy_by_name(ctl: &OwnedFd, name: &str) -> Result<()> {
    let mut ifr = IfReq::new(name);
    if unsafe { ioctl(ctl.as_raw_fd(), SIOCIFDESTROY, &mut ifr as *mut _ as *mut c_void) } < 0 {
        return Err(Error::ioctl(Stage::Destroy));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_numbers() {
        assert_eq!(size_of::<IfReq>(), 32);
        assert_eq!(SIOCSIFFLAGS, 0x8020_6910);
        assert_eq!(SIOCGIFFLAGS, 0xc020_6911);
        assert_eq!(SIOCIFDESTROY, 0x8020_6979);
        assert_eq!(SIOCIFCREATE2, 0xc020_697c);
        assert_eq!(TUNSIFMODE, 0x8004_745e);
        assert_eq!(TUNSIFHEAD, 0x8004_7460);
    }

    /// Needs root.
    #[test]
    #[ignore]
    fn test_create_and_destroy() {
        let alloc = IfCreateAllocator::new();
        let tun = alloc.create(None).unwrap();
        assert!(tun.name().starts_with("tun"));
        alloc.destroy(tun).unwrap();
    }
}
