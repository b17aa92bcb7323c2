//! Integration-style test driving route installation end to end through the
//! public API with a fake link resolver and a capturing route sink, then
//! checking the wire layout of what would have reached the routing socket.

use std::cell::RefCell;

use tunif::route::{
    sa_size, LinkAddress, LinkResolver, RouteSink, AF_INET, AF_INET6, AF_LINK, RTA_DST,
    RTA_GATEWAY, RTA_NETMASK, RTF_HOST, RTF_STATIC, RTF_UP, RTM_ADD, RTM_VERSION, RT_MSGHDR_LEN,
};
use tunif::{Error, RouteInstaller, RoutePrefix, TunnelConfig};

const TUN_SDL_LEN: usize = 54;

/// Resolves every name to the same `sockaddr_dl`.
struct FixedLink;

impl LinkResolver for FixedLink {
    fn link_address(&self, interface: &str) -> tunif::Result<LinkAddress> {
        let mut raw = [0u8; TUN_SDL_LEN];
        raw[0] = TUN_SDL_LEN as u8;
        raw[1] = AF_LINK;
        raw[2..4].copy_from_slice(&4u16.to_ne_bytes());
        raw[5] = interface.len() as u8;
        raw[8..8 + interface.len()].copy_from_slice(interface.as_bytes());
        LinkAddress::from_bytes(&raw).ok_or_else(|| Error::LookupFailed(interface.into()))
    }
}

#[derive(Default)]
struct Capture(RefCell<Vec<Vec<u8>>>);

impl RouteSink for &Capture {
    fn submit(&self, message: &[u8]) -> tunif::Result<usize> {
        self.0.borrow_mut().push(message.to_vec());
        Ok(message.len())
    }
}

fn i32_at(msg: &[u8], off: usize) -> i32 {
    i32::from_ne_bytes(msg[off..off + 4].try_into().unwrap())
}

#[test]
fn configured_routes_reach_the_sink_in_order() {
    let config: TunnelConfig = serde_json::from_str(
        r#"{
            "interface": "tun2",
            "routes": ["198.51.100.0/24", "2001:db8:10::/48", "192.0.2.77"]
        }"#,
    )
    .expect("parse config");

    let capture = Capture::default();
    let installer = RouteInstaller::with_parts(FixedLink, &capture);
    for route in config.enabled_routes() {
        installer.add("tun2", route).expect("install route");
    }

    let messages = capture.0.borrow();
    assert_eq!(messages.len(), 3);

    for (i, msg) in messages.iter().enumerate() {
        assert_eq!(u16::from_ne_bytes([msg[0], msg[1]]) as usize, msg.len());
        assert_eq!(msg[2], RTM_VERSION);
        assert_eq!(msg[3], RTM_ADD);
        assert_eq!(i32_at(msg, 20), i as i32 + 1, "rtm_seq");
        let flags = i32_at(msg, 8);
        assert_eq!(flags & (RTF_UP | RTF_STATIC), RTF_UP | RTF_STATIC);
    }

    // IPv4 network route: dst, gateway, netmask
    let v4 = &messages[0];
    assert_eq!(i32_at(v4, 12), RTA_DST | RTA_GATEWAY | RTA_NETMASK);
    assert_eq!(i32_at(v4, 8) & RTF_HOST, 0);
    let dst = &v4[RT_MSGHDR_LEN..];
    assert_eq!(dst[0], 16);
    assert_eq!(dst[1], AF_INET);
    assert_eq!(&dst[4..8], &[198, 51, 100, 0]);
    let gw = &dst[16..];
    assert_eq!(gw[1], AF_LINK);
    assert_eq!(&gw[8..12], b"tun2");
    let mask = &gw[sa_size(TUN_SDL_LEN)..];
    assert_eq!(mask[1], AF_INET);
    assert_eq!(&mask[4..8], &[255, 255, 255, 0]);
    assert_eq!(
        v4.len(),
        RT_MSGHDR_LEN + 16 + sa_size(TUN_SDL_LEN) + 16
    );

    // IPv6 network route
    let v6 = &messages[1];
    let dst = &v6[RT_MSGHDR_LEN..];
    assert_eq!(dst[0], 28);
    assert_eq!(dst[1], AF_INET6);
    let mask = &dst[sa_size(28) + sa_size(TUN_SDL_LEN)..];
    assert_eq!(mask[1], AF_INET6);
    assert_eq!(&mask[8..14], &[0xff; 6]);
    assert!(mask[14..24].iter().all(|b| *b == 0));

    // IPv4 host route: no netmask
    let host = &messages[2];
    assert_eq!(i32_at(host, 12), RTA_DST | RTA_GATEWAY);
    assert_eq!(i32_at(host, 8) & RTF_HOST, RTF_HOST);
    assert_eq!(host.len(), RT_MSGHDR_LEN + 16 + sa_size(TUN_SDL_LEN));
}

#[test]
fn default_route_is_rejected_before_submission() {
    let capture = Capture::default();
    let installer = RouteInstaller::with_parts(FixedLink, &capture);
    let default_route = RoutePrefix::new("0.0.0.0".parse().unwrap(), 0).unwrap();

    let err = installer.add("tun2", &default_route).unwrap_err();
    assert!(matches!(err, Error::PreconditionViolation(_)));
    assert!(capture.0.borrow().is_empty());
    assert_eq!(installer.last_seq(), 0);
}
