//! Network interface address lookup.

use std::ffi::CStr;
use std::net::Ipv4Addr;

use anyhow::{anyhow, bail, Result};

/// First IPv4 address assigned to interface `name`.
pub fn interface_ipv4(name: &str) -> Result<Ipv4Addr> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        bail!(
            "unable to list network interfaces: {}",
            std::io::Error::last_os_error()
        );
    }

    let mut found = None;
    let mut cursor = head;
    while !cursor.is_null() {
        // getifaddrs returns a valid list until freeifaddrs is called.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
            continue;
        }
        let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
        if family != libc::AF_INET {
            continue;
        }
        let ifname = unsafe { CStr::from_ptr(entry.ifa_name) };
        if ifname.to_bytes() != name.as_bytes() {
            continue;
        }

        let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
        found = Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
        break;
    }

    unsafe { libc::freeifaddrs(head) };
    found.ok_or_else(|| anyhow!("interface {} has no IPv4 address", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_loopback_address() {
        assert_eq!(interface_ipv4("lo").unwrap(), Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_unknown_interface() {
        assert!(interface_ipv4("no-such-interface0").is_err());
    }
}
