//! Connection lifecycle manager
//!
//! `QuicClient` owns everything one connect attempt needs: the runtime it
//! runs on, the address resolver, the socket factory and shared statistics.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::options::ConnectOptions;
use super::session::ClientSession;
use super::state::LifecycleState;
use crate::config::Validator;
use crate::connect::{DualStackSocketFactory, SocketAllocator, SystemAllocator, create_datagram_endpoint};
use crate::dns::{AddressResolver, DynResolver};
use crate::error::{self, Result, TimedOut};
use crate::protocols::quiche::QuicheConnection;
use crate::protocols::{AdapterFactory, ProtocolAdapter, QuicConnection};
use crate::telemetry::ConnectStats;
use crate::tls::apply_server_name;

/// QUIC client establishing one connection per `connect` call.
#[derive(Debug, Clone)]
pub struct QuicClient<S = SystemAllocator> {
    runtime: Handle,
    resolver: AddressResolver,
    socket_factory: DualStackSocketFactory<S>,
    stats: Arc<ConnectStats>,
}

impl QuicClient {
    /// Client running its tasks on `runtime`, resolving through the system resolver.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            resolver: AddressResolver::default(),
            socket_factory: DualStackSocketFactory::new(),
            stats: Arc::new(ConnectStats::new()),
        }
    }

    /// Client bound to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called outside a tokio runtime.
    pub fn current() -> Result<Self> {
        let runtime = Handle::try_current().map_err(error::configuration)?;
        Ok(Self::new(runtime))
    }
}

impl<S: SocketAllocator> QuicClient<S> {
    #[must_use]
    pub fn with_resolver(mut self, resolver: DynResolver) -> Self {
        self.resolver = AddressResolver::new(resolver);
        self
    }

    /// Replace the socket factory, e.g. with one using a custom allocator.
    pub fn with_socket_factory<T: SocketAllocator>(
        self,
        socket_factory: DualStackSocketFactory<T>,
    ) -> QuicClient<T> {
        QuicClient {
            runtime: self.runtime,
            resolver: self.resolver,
            socket_factory,
            stats: self.stats,
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ConnectStats> {
        Arc::clone(&self.stats)
    }

    /// Connect to `host:port` over a quiche connection.
    ///
    /// # Errors
    ///
    /// See [`QuicClient::connect_with`].
    pub async fn connect<F>(
        &self,
        host: &str,
        port: u16,
        options: ConnectOptions<F>,
    ) -> Result<ClientSession<F::Adapter>>
    where
        F: AdapterFactory<QuicheConnection>,
    {
        self.connect_with::<QuicheConnection, F>(host, port, options)
            .await
    }

    /// Connect to `host:port` with connection type `C`.
    ///
    /// The returned session is torn down when closed or dropped.
    ///
    /// # Errors
    ///
    /// - configuration error if `options` carries an invalid configuration
    /// - resolution error if the host yields no address
    /// - bind error if the local socket cannot be set up
    /// - handshake error if waiting for the handshake and it fails or times
    ///   out; the connection has been closed by the time this is returned
    pub async fn connect_with<C, F>(
        &self,
        host: &str,
        port: u16,
        options: ConnectOptions<F>,
    ) -> Result<ClientSession<F::Adapter>>
    where
        C: QuicConnection,
        F: AdapterFactory<C>,
    {
        let ConnectOptions {
            mut configuration,
            adapter_factory,
            session_ticket_handler,
            stream_handler,
            wait_connected,
            local_port,
            handshake_timeout,
        } = options;

        self.stats.record_attempt();
        configuration.validate()?;

        apply_server_name(&mut configuration, host);

        let remote = self.resolver.resolve(host, port).await.inspect_err(|_| {
            self.stats.record_resolution_failure();
        })?;

        let socket = self.socket_factory.create(local_port).inspect_err(|_| {
            self.stats.record_bind_failure();
        })?;

        // the socket is still ours here and closes if construction fails
        let connection = C::new(configuration, session_ticket_handler)?;
        let (transport, adapter) = create_datagram_endpoint(&self.runtime, socket, move || {
            adapter_factory.create(connection, stream_handler)
        })?;

        let mut session = ClientSession::new(
            self.runtime.clone(),
            adapter,
            transport,
            remote,
            Arc::clone(&self.stats),
        );

        tracing::debug!(
            target: "quic_connect::client",
            host = %host,
            remote = %remote,
            local = %session.local_addr(),
            "Connecting"
        );
        session.set_state(LifecycleState::Connecting);

        let destination = remote.socket_addr();
        if let Err(e) = session.adapter().connect(destination) {
            return Err(self.fail(session, e.with_address(destination)).await);
        }

        if wait_connected {
            let outcome = match handshake_timeout {
                Some(limit) => tokio::time::timeout(limit, session.adapter().wait_connected())
                    .await
                    .unwrap_or_else(|_| Err(error::handshake(TimedOut))),
                None => session.adapter().wait_connected().await,
            };

            if let Err(e) = outcome {
                self.stats.record_handshake_failure();
                return Err(self.fail(session, e.with_address(destination)).await);
            }
            session.set_state(LifecycleState::Connected);
            tracing::debug!(
                target: "quic_connect::client",
                remote = %remote,
                "Handshake completed"
            );
        }

        self.stats.record_established();
        Ok(session)
    }

    /// Close a session whose setup failed and hand back the original error.
    async fn fail<A: ProtocolAdapter>(&self, mut session: ClientSession<A>, err: error::Error) -> error::Error {
        tracing::debug!(
            target: "quic_connect::client",
            remote = %session.remote_address(),
            error = %err,
            "Connection setup failed"
        );
        session.set_state(LifecycleState::Failed);

        if let Err(teardown) = session.close().await {
            tracing::warn!(
                target: "quic_connect::client",
                error = %teardown,
                "Teardown after failed setup also failed"
            );
        }
        err
    }

    /// Connect over quiche, run `scope` with the adapter, then tear down.
    ///
    /// # Errors
    ///
    /// See [`QuicClient::connect_scoped_with`].
    pub async fn connect_scoped<F, Scope, Fut, T, E>(
        &self,
        host: &str,
        port: u16,
        options: ConnectOptions<F>,
        scope: Scope,
    ) -> std::result::Result<T, E>
    where
        F: AdapterFactory<QuicheConnection>,
        Scope: FnOnce(Arc<F::Adapter>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<error::Error>,
    {
        self.connect_scoped_with::<QuicheConnection, F, Scope, Fut, T, E>(host, port, options, scope)
            .await
    }

    /// Connect, run `scope` with the adapter, then tear down.
    ///
    /// Teardown runs whatever the scope returns, and also when the scope
    /// panics or the returned future is dropped. A teardown failure is
    /// logged and never replaces the scope's result.
    ///
    /// # Errors
    ///
    /// Connection errors converted into `E`, or whatever `scope` returns.
    pub async fn connect_scoped_with<C, F, Scope, Fut, T, E>(
        &self,
        host: &str,
        port: u16,
        options: ConnectOptions<F>,
        scope: Scope,
    ) -> std::result::Result<T, E>
    where
        C: QuicConnection,
        F: AdapterFactory<C>,
        Scope: FnOnce(Arc<F::Adapter>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<error::Error>,
    {
        let session = self.connect_with::<C, F>(host, port, options).await?;
        let remote = session.remote_address();

        let outcome = scope(Arc::clone(session.adapter())).await;

        if let Err(e) = session.close().await {
            tracing::warn!(
                target: "quic_connect::client",
                remote = %remote,
                error = %e,
                "Teardown failed"
            );
        }
        outcome
    }
}

/// Connect to `host:port` on the current runtime with default collaborators.
///
/// # Errors
///
/// See [`QuicClient::connect_with`]; also fails outside a tokio runtime.
pub async fn connect(
    host: &str,
    port: u16,
    options: ConnectOptions,
) -> Result<ClientSession<crate::protocols::StandardAdapter<QuicheConnection>>> {
    QuicClient::current()?.connect(host, port, options).await
}
