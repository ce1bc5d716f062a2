//! Core `QuicConnect` builder
//!
//! Collects connect options with a fluent interface and hands them to a
//! `QuicClient` when `connect` or `scoped` is called.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quic_connect_client::protocols::AdapterFactory;
use quic_connect_client::{
    ClientSession, ConnectOptions, DynResolver, QuicClient, QuicConfiguration, QuicheConnection,
    SessionTicket, StandardAdapterFactory, StreamReader, StreamWriter,
};

pub use quic_connect_client::{Error, Result};

/// Fluent builder for one QUIC connection.
///
/// Type parameter `F` is the adapter factory; the standard adapter is used
/// unless [`QuicConnect::adapter_factory`] replaces it.
#[derive(Clone)]
pub struct QuicConnect<F = StandardAdapterFactory> {
    /// Client to connect through, the current runtime's default if unset
    pub(crate) client: Option<QuicClient>,
    pub(crate) resolver: Option<DynResolver>,
    pub(crate) options: ConnectOptions<F>,
    /// Debug logging enabled flag
    pub(crate) debug_enabled: bool,
}

impl QuicConnect<StandardAdapterFactory> {
    /// Start building with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: None,
            resolver: None,
            options: ConnectOptions::new(),
            debug_enabled: false,
        }
    }

    /// Start building on top of an existing client, sharing its runtime and statistics.
    #[must_use]
    pub fn with_client(client: &QuicClient) -> Self {
        Self {
            client: Some(client.clone()),
            ..Self::new()
        }
    }
}

impl Default for QuicConnect<StandardAdapterFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> QuicConnect<F> {
    fn map_configuration(mut self, f: impl FnOnce(QuicConfiguration) -> QuicConfiguration) -> Self {
        let configuration = f(self.options.configuration().clone());
        self.options = self.options.with_configuration(configuration);
        self
    }

    /// Replace the whole connection configuration.
    #[must_use]
    pub fn configuration(mut self, configuration: QuicConfiguration) -> Self {
        self.options = self.options.with_configuration(configuration);
        self
    }

    /// Set the server name explicitly instead of deriving it from the host.
    #[must_use]
    pub fn server_name(self, server_name: impl Into<String>) -> Self {
        let server_name = server_name.into();
        self.map_configuration(|configuration| configuration.with_server_name(server_name))
    }

    /// Application protocols offered during the handshake.
    #[must_use]
    pub fn alpn<I, S>(self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let protocols: Vec<String> = protocols.into_iter().map(Into::into).collect();
        self.map_configuration(|configuration| configuration.with_alpn_protocols(protocols))
    }

    #[must_use]
    pub fn local_port(mut self, port: u16) -> Self {
        self.options = self.options.with_local_port(port);
        self
    }

    #[must_use]
    pub fn wait_connected(mut self, wait: bool) -> Self {
        self.options = self.options.with_wait_connected(wait);
        self
    }

    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_handshake_timeout(timeout);
        self
    }

    /// Resume a previous session with `ticket`.
    #[must_use]
    pub fn session_ticket(self, ticket: SessionTicket) -> Self {
        self.map_configuration(|configuration| configuration.with_session_ticket(ticket))
    }

    /// Called with every resumption ticket the server issues.
    #[must_use]
    pub fn on_session_ticket<H>(mut self, handler: H) -> Self
    where
        H: Fn(SessionTicket) + Send + Sync + 'static,
    {
        self.options = self.options.with_session_ticket_handler(Arc::new(handler));
        self
    }

    /// Called with every stream the peer opens.
    #[must_use]
    pub fn on_stream<H>(mut self, handler: H) -> Self
    where
        H: Fn(StreamReader, StreamWriter) + Send + Sync + 'static,
    {
        self.options = self.options.with_stream_handler(Arc::new(handler));
        self
    }

    /// Resolve hosts through `resolver` instead of the client's.
    #[must_use]
    pub fn resolver(mut self, resolver: DynResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Build adapters with `factory`.
    #[must_use]
    pub fn adapter_factory<G>(self, factory: G) -> QuicConnect<G> {
        QuicConnect {
            client: self.client,
            resolver: self.resolver,
            options: self.options.with_adapter_factory(factory),
            debug_enabled: self.debug_enabled,
        }
    }

    /// Log the options at debug level when connecting.
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug_enabled = true;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ConnectOptions<F> {
        &self.options
    }

    fn into_parts(self) -> Result<(QuicClient, ConnectOptions<F>)> {
        let client = match self.client {
            Some(client) => client,
            None => QuicClient::current()?,
        };
        let client = match self.resolver {
            Some(resolver) => client.with_resolver(resolver),
            None => client,
        };

        if self.debug_enabled {
            tracing::debug!(
                target: "quic_connect::api",
                options = ?self.options,
                "Connect options"
            );
        }
        Ok((client, self.options))
    }
}

impl<F> QuicConnect<F>
where
    F: AdapterFactory<QuicheConnection>,
{
    /// Connect to `host:port` and return the live session.
    ///
    /// # Errors
    ///
    /// Resolution, bind, configuration and handshake errors from the client.
    pub async fn connect(self, host: &str, port: u16) -> Result<ClientSession<F::Adapter>> {
        let (client, options) = self.into_parts()?;
        client.connect(host, port, options).await
    }

    /// Connect, run `scope` with the adapter, then close the connection.
    ///
    /// # Errors
    ///
    /// Connection errors converted into `E`, or whatever `scope` returns.
    pub async fn scoped<Scope, Fut, T, E>(
        self,
        host: &str,
        port: u16,
        scope: Scope,
    ) -> std::result::Result<T, E>
    where
        Scope: FnOnce(Arc<F::Adapter>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let (client, options) = self.into_parts()?;
        client.connect_scoped(host, port, options, scope).await
    }
}

impl<F> fmt::Debug for QuicConnect<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuicConnect")
            .field("client", &self.client)
            .field("custom_resolver", &self.resolver.is_some())
            .field("options", &self.options)
            .field("debug_enabled", &self.debug_enabled)
            .finish()
    }
}
