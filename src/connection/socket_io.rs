//! Low-level socket setup (spec §4.3): non-blocking connect, `FD_CLOEXEC`,
//! TCP send/receive buffer sizing, and the reserved-port bind retry MOUNT
//! needs. Built on `socket2`, which every low-level networking crate in
//! the retrieval pack that needs this much socket control reaches for
//! (e.g. `Vaiz-nfs3`'s `nfs3_client`) rather than hand-rolling `libc`
//! calls end to end.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::connection::key::ConnectionKey;
use crate::transport::Transport;

/// 512 KiB, spec §4.3 / §5.
const TCP_BUFFER_SIZE: usize = 512 * 1024;

/// The original source retries reserved-port binds downward from 1023;
/// preserved here (SPEC_FULL.md §B.4).
const RESERVED_PORT_RANGE_START: u16 = 1023;
const RESERVED_PORT_RANGE_LOWEST: u16 = 600;

pub enum ConnectOutcome {
    Connected,
    InProgress,
}

/// Creates, configures and non-blocking-connects a socket for `key`.
/// Returns the socket plus whether the connect completed immediately or
/// is still in progress (`EINPROGRESS`). Any other error closes the
/// socket (by dropping it) and propagates.
pub fn connect_nonblocking(
    key: &ConnectionKey,
    bind_reserved_port: bool,
) -> io::Result<(Socket, ConnectOutcome)> {
    let addr: SocketAddr = key
        .socket_addr()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("bad address: {e}")))?;

    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let (ty, proto) = match key.transport {
        Transport::Tcp => (Type::STREAM, Protocol::TCP),
        Transport::Udp => (Type::DGRAM, Protocol::UDP),
    };

    let socket = Socket::new(domain, ty, Some(proto))?;
    socket.set_cloexec(true)?;
    socket.set_nonblocking(true)?;

    if key.transport == Transport::Tcp {
        socket.set_send_buffer_size(TCP_BUFFER_SIZE)?;
        socket.set_recv_buffer_size(TCP_BUFFER_SIZE)?;
    }

    if bind_reserved_port {
        bind_reserved_port_on(&socket, domain)?;
    }

    match socket.connect(&SockAddr::from(addr)) {
        Ok(()) => Ok((socket, ConnectOutcome::Connected)),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok((socket, ConnectOutcome::InProgress)),
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {
            Ok((socket, ConnectOutcome::InProgress))
        }
        Err(e) => Err(e),
    }
}

/// Tries reserved ports (<1024) from `RESERVED_PORT_RANGE_START` downward
/// until one binds, for MOUNT's traditional reserved-port requirement
/// (spec §4.5).
fn bind_reserved_port_on(socket: &Socket, domain: Domain) -> io::Result<()> {
    let wildcard: SocketAddr = if domain == Domain::IPV6 {
        "[::]:0".parse().unwrap()
    } else {
        "0.0.0.0:0".parse().unwrap()
    };
    let mut last_err = None;
    let mut port = RESERVED_PORT_RANGE_START;
    while port >= RESERVED_PORT_RANGE_LOWEST {
        let mut addr = wildcard;
        addr.set_port(port);
        match socket.bind(&SockAddr::from(addr)) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
        port -= 1;
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no reserved port available")))
}

/// Inspects `SO_ERROR` after a `POLLOUT` readiness event fires during
/// `CONNECTING`, returning `Ok(())` on success.
pub fn take_connect_error(socket: &Socket) -> io::Result<()> {
    match socket.take_error()? {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

/// Builds a `libc::pollfd` readiness request for this socket.
pub fn pollfd(socket: &Socket, events: i16) -> libc::pollfd {
    use std::os::unix::io::AsRawFd;
    libc::pollfd {
        fd: socket.as_raw_fd(),
        events,
        revents: 0,
    }
}

/// Thin wrapper over `libc::poll`, spec §4.4's "OS readiness
/// multiplexor". Level-triggered, matching the source's behavior.
pub fn poll(fds: &mut [libc::pollfd], timeout: Duration) -> io::Result<usize> {
    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}
