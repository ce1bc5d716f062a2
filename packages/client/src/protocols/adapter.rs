//! Protocol adapter contract
//!
//! The adapter sits between the datagram transport and the QUIC connection
//! object. It is owned by the transport for the connection's lifetime and
//! referenced by the session handle the caller holds.

use std::net::SocketAddr;

use futures::future::BoxFuture;

use super::connection::QuicConnection;
use super::stream::StreamHandler;
use crate::connect::TransportHandle;
use crate::error::Result;

/// Bridge between datagram I/O and a QUIC state machine.
pub trait ProtocolAdapter: Send + Sync + 'static {
    /// Called once by the transport before any datagram is delivered.
    fn connection_made(&self, transport: TransportHandle);

    fn datagram_received(&self, data: &mut [u8], from: SocketAddr);

    /// Called once the transport stopped delivering datagrams.
    fn connection_lost(&self) {}

    /// Start the handshake towards `addr`.
    fn connect(&self, addr: SocketAddr) -> Result<()>;

    /// Resolves once the handshake succeeded or failed.
    fn wait_connected(&self) -> BoxFuture<'_, Result<()>>;

    /// Begin a QUIC-level close. Calling it more than once has no further effect.
    fn close(&self);

    /// Resolves once the QUIC-level close completed.
    fn wait_closed(&self) -> BoxFuture<'_, ()>;
}

/// Builds the adapter for a freshly constructed connection object.
pub trait AdapterFactory<C: QuicConnection> {
    type Adapter: ProtocolAdapter;

    fn create(&self, connection: C, stream_handler: Option<StreamHandler>) -> Self::Adapter;
}

/// Adapter factory backed by a closure.
#[derive(Clone)]
pub struct FnAdapterFactory<F>(F);

/// Use `f` as an adapter factory.
///
/// ```no_run
/// use quic_connect_client::protocols::{adapter_factory_fn, StandardAdapter};
/// use quic_connect_client::protocols::quiche::QuicheConnection;
///
/// let factory = adapter_factory_fn(|connection: QuicheConnection, handler| {
///     StandardAdapter::new(connection, handler)
/// });
/// ```
pub fn adapter_factory_fn<F>(f: F) -> FnAdapterFactory<F> {
    FnAdapterFactory(f)
}

impl<C, A, F> AdapterFactory<C> for FnAdapterFactory<F>
where
    C: QuicConnection,
    A: ProtocolAdapter,
    F: Fn(C, Option<StreamHandler>) -> A,
{
    type Adapter = A;

    fn create(&self, connection: C, stream_handler: Option<StreamHandler>) -> A {
        (self.0)(connection, stream_handler)
    }
}
