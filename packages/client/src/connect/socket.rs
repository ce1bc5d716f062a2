//! Dual-stack UDP socket creation
//!
//! Every connection gets its own IPv6 datagram socket with `IPV6_V6ONLY`
//! cleared, bound to the IPv6 wildcard. IPv4 peers are reached through their
//! IPv4-mapped IPv6 form.

use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{self, Result};

/// Socket operations the factory performs before handing a socket over.
pub trait RawDatagramSocket: Send + Sized + 'static {
    fn set_only_v6(&self, only_v6: bool) -> io::Result<()>;

    fn bind(&self, addr: SocketAddr) -> io::Result<()>;

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    fn into_udp_socket(self) -> UdpSocket;
}

impl RawDatagramSocket for Socket {
    fn set_only_v6(&self, only_v6: bool) -> io::Result<()> {
        Socket::set_only_v6(self, only_v6)
    }

    fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        Socket::bind(self, &addr.into())
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        Socket::set_nonblocking(self, nonblocking)
    }

    fn into_udp_socket(self) -> UdpSocket {
        self.into()
    }
}

/// Source of unbound IPv6 datagram sockets.
pub trait SocketAllocator: Send + Sync + 'static {
    type Socket: RawDatagramSocket;

    fn allocate(&self) -> io::Result<Self::Socket>;
}

/// Allocates sockets from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SocketAllocator for SystemAllocator {
    type Socket = Socket;

    fn allocate(&self) -> io::Result<Socket> {
        Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))
    }
}

/// Creates the local endpoint for one connection.
#[derive(Debug, Clone, Default)]
pub struct DualStackSocketFactory<A = SystemAllocator> {
    allocator: A,
}

impl DualStackSocketFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: SocketAllocator> DualStackSocketFactory<A> {
    /// Use a custom allocator, mainly for tests.
    pub fn with_allocator(allocator: A) -> Self {
        Self { allocator }
    }

    /// Allocate a socket bound to `[::]:local_port`, dual-stack and non-blocking.
    ///
    /// Port 0 lets the system choose. A socket that fails any step is closed
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns a bind error if allocation, option setting or binding fails.
    pub fn create(&self, local_port: u16) -> Result<UdpSocket> {
        let socket = self.allocator.allocate().map_err(|e| {
            tracing::debug!(
                target: "quic_connect::connect",
                error = %e,
                "IPv6 datagram socket allocation failed"
            );
            error::bind(e)
        })?;

        let local = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, local_port, 0, 0));

        // socket is dropped, and thereby closed, on every early return below
        let configured = socket
            .set_only_v6(false)
            .and_then(|()| socket.bind(local))
            .and_then(|()| socket.set_nonblocking(true));

        if let Err(e) = configured {
            tracing::debug!(
                target: "quic_connect::connect",
                local = %local,
                error = %e,
                "Failed to prepare dual-stack socket"
            );
            return Err(error::bind(e).with_address(local));
        }

        let socket = socket.into_udp_socket();
        tracing::trace!(
            target: "quic_connect::connect",
            local = ?socket.local_addr().ok(),
            "Dual-stack socket bound"
        );
        Ok(socket)
    }
}
