//! Local endpoint setup
//!
//! Dual-stack socket creation and the datagram transport that ties a socket
//! to a protocol adapter.

pub mod socket;
pub mod transport;

pub use socket::{DualStackSocketFactory, RawDatagramSocket, SocketAllocator, SystemAllocator};
pub use transport::{DatagramTransport, TransportHandle, create_datagram_endpoint};
