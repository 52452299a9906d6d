//! Socket setup (component C): multicast/broadcast UDP sockets and NIC
//! enumeration for the discovery and data-receive paths (§4.C).

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use socket2::{Domain, Protocol, Type};
use tokio::net::UdpSocket;

pub fn new_socket() -> io::Result<socket2::Socket> {
    let socket = socket2::Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;
    Ok(socket)
}

#[cfg(unix)]
fn bind_to_multicast(
    socket: &socket2::Socket,
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<()> {
    // Linux forgets which device a multicast packet arrived on unless this is off.
    #[cfg(target_os = "linux")]
    {
        use std::{mem, os::unix::io::AsRawFd};
        unsafe {
            let optval: libc::c_int = 0;
            let ret = libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_IP,
                libc::IP_MULTICAST_ALL,
                &optval as *const _ as *const libc::c_void,
                mem::size_of_val(&optval) as libc::socklen_t,
            );
            if ret != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }

    let socketaddr = SocketAddr::new(IpAddr::V4(*addr.ip()), addr.port());
    socket.bind(&socket2::SockAddr::from(socketaddr))?;
    socket.join_multicast_v4(addr.ip(), nic_addr)?;
    log::trace!("binding multicast socket to {socketaddr} nic {nic_addr}");
    Ok(())
}

#[cfg(windows)]
fn bind_to_multicast(
    socket: &socket2::Socket,
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<()> {
    socket.join_multicast_v4(addr.ip(), nic_addr)?;
    let socketaddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), addr.port());
    socket.bind(&socket2::SockAddr::from(socketaddr))?;
    log::trace!("binding multicast socket to {socketaddr}");
    Ok(())
}

/// Listening socket for the announce group or a data/report multicast group.
pub fn create_udp_multicast_listen(addr: &SocketAddrV4, nic_addr: &Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = new_socket()?;
    socket.set_reuse_address(true)?;
    bind_to_multicast(&socket, addr, nic_addr)?;
    UdpSocket::from_std(socket.into())
}

/// Connected socket used to send command datagrams to a specific radar.
pub fn create_command_socket(radar_addr: &SocketAddrV4, nic_addr: &Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = new_socket()?;
    let bind_addr = SocketAddr::new(IpAddr::V4(*nic_addr), 0);
    socket.bind(&socket2::SockAddr::from(bind_addr))?;
    socket.connect(&socket2::SockAddr::from(SocketAddr::V4(*radar_addr)))?;
    UdpSocket::from_std(socket.into())
}

pub fn match_ipv4(addr: &Ipv4Addr, bcast: &Ipv4Addr, netmask: &Ipv4Addr) -> bool {
    (addr & netmask) == (bcast & netmask)
}

/// One IPv4-capable NIC, as returned by `enumerate_interfaces` (§4.C).
#[derive(Debug, Clone)]
pub struct Nic {
    pub name: String,
    pub addr: Ipv4Addr,
}

/// List every non-loopback interface with an IPv4 address. A NIC that fails
/// to resolve an address (down, IPv6-only) is skipped rather than treated as
/// fatal — only "no interfaces at all" is an error (§4.C).
pub fn enumerate_interfaces() -> Result<Vec<Nic>, crate::error::RadarError> {
    let interfaces = NetworkInterface::show()
        .map_err(|_| crate::error::RadarError::InterfaceEnumerationFailed)?;

    let mut nics = Vec::new();
    for iface in interfaces {
        for addr in iface.addr {
            if let network_interface::Addr::V4(v4) = addr {
                if v4.ip.is_loopback() {
                    continue;
                }
                nics.push(Nic {
                    name: iface.name.clone(),
                    addr: v4.ip,
                });
                break;
            }
        }
    }

    if nics.is_empty() {
        return Err(crate::error::RadarError::InterfaceEnumerationFailed);
    }
    Ok(nics)
}

/// Resolve a user-supplied interface name or address to a NIC, or fall back
/// to the first usable interface (§4.C).
pub fn resolve_interface(requested: Option<&str>) -> Result<Nic, crate::error::RadarError> {
    let nics = enumerate_interfaces()?;
    match requested {
        None => Ok(nics.into_iter().next().unwrap()),
        Some(want) => nics
            .into_iter()
            .find(|nic| nic.name == want || nic.addr.to_string() == want)
            .ok_or_else(|| crate::error::RadarError::InterfaceNotFound(want.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_ipv4_checks_network_membership() {
        let addr: Ipv4Addr = "192.168.1.42".parse().unwrap();
        let bcast: Ipv4Addr = "192.168.1.255".parse().unwrap();
        let netmask: Ipv4Addr = "255.255.255.0".parse().unwrap();
        assert!(match_ipv4(&addr, &bcast, &netmask));

        let other: Ipv4Addr = "10.0.0.5".parse().unwrap();
        assert!(!match_ipv4(&other, &bcast, &netmask));
    }
}
