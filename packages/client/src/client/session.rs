//! Scoped connection handle and the close sequence
//!
//! Teardown always runs as its own task on the client's runtime, so a caller
//! that is cancelled mid-close cannot leave the socket behind.

use std::fmt;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::state::LifecycleState;
use crate::connect::DatagramTransport;
use crate::dns::ResolvedAddress;
use crate::error::{self, Result};
use crate::protocols::ProtocolAdapter;
use crate::telemetry::ConnectStats;

/// Logical close, then wait for it, then release the transport.
struct Teardown {
    adapter: Arc<dyn ProtocolAdapter>,
    transport: DatagramTransport,
    stats: Arc<ConnectStats>,
    remote: ResolvedAddress,
}

impl Teardown {
    async fn run(mut self) -> Result<()> {
        tracing::debug!(
            target: "quic_connect::client",
            remote = %self.remote,
            "Closing connection"
        );

        self.adapter.close();
        self.adapter.wait_closed().await;
        let released = self.transport.close().await;
        self.stats.record_teardown();

        match &released {
            Ok(()) => tracing::debug!(
                target: "quic_connect::client",
                remote = %self.remote,
                "Connection closed"
            ),
            Err(e) => tracing::warn!(
                target: "quic_connect::client",
                remote = %self.remote,
                error = %e,
                "Transport close failed"
            ),
        }
        released
    }
}

/// Live connection returned by `QuicClient::connect`.
///
/// Dereferences to the protocol adapter. Closing is explicit through
/// [`ClientSession::close`]; a session dropped without closing is torn down
/// in the background.
pub struct ClientSession<A: ProtocolAdapter> {
    adapter: Arc<A>,
    teardown: Option<Teardown>,
    runtime: Handle,
    remote: ResolvedAddress,
    local_addr: SocketAddr,
    state: LifecycleState,
}

impl<A: ProtocolAdapter> ClientSession<A> {
    pub(crate) fn new(
        runtime: Handle,
        adapter: Arc<A>,
        transport: DatagramTransport,
        remote: ResolvedAddress,
        stats: Arc<ConnectStats>,
    ) -> Self {
        let local_addr = transport.local_addr();
        let teardown = Teardown {
            adapter: Arc::clone(&adapter) as Arc<dyn ProtocolAdapter>,
            transport,
            stats,
            remote,
        };

        Self {
            adapter,
            teardown: Some(teardown),
            runtime,
            remote,
            local_addr,
            state: LifecycleState::Created,
        }
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        tracing::trace!(
            target: "quic_connect::client",
            from = %self.state,
            to = %state,
            remote = %self.remote,
            "Lifecycle transition"
        );
        self.state = state;
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Destination the connection was opened to.
    #[must_use]
    pub fn remote_address(&self) -> ResolvedAddress {
        self.remote
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run the close sequence and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns a teardown error if releasing the transport failed.
    pub async fn close(mut self) -> Result<()> {
        let Some(teardown) = self.teardown.take() else {
            return Ok(());
        };
        self.set_state(LifecycleState::Closing);

        let outcome = match self.runtime.spawn(teardown.run()).await {
            Ok(result) => result,
            Err(e) => Err(error::teardown(e)),
        };

        self.set_state(LifecycleState::Closed);
        outcome.map_err(|e| e.with_address(self.remote.socket_addr()))
    }
}

impl<A: ProtocolAdapter> Deref for ClientSession<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.adapter
    }
}

impl<A: ProtocolAdapter> Drop for ClientSession<A> {
    fn drop(&mut self) {
        let Some(teardown) = self.teardown.take() else {
            return;
        };

        tracing::debug!(
            target: "quic_connect::client",
            remote = %self.remote,
            state = %self.state,
            "Session dropped without close, tearing down in background"
        );
        self.runtime.spawn(async move {
            // nobody is left to report to
            let _ = teardown.run().await;
        });
    }
}

impl<A: ProtocolAdapter> fmt::Debug for ClientSession<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("remote", &self.remote)
            .field("local_addr", &self.local_addr)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
