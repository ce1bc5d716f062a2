//! Per-call connection options

use std::fmt;
use std::time::Duration;

use crate::config::QuicConfiguration;
use crate::protocols::{StandardAdapterFactory, StreamHandler};
use crate::tls::SessionTicketHandler;

/// Options for one `connect` call. Every field has a default.
#[derive(Clone)]
pub struct ConnectOptions<F = StandardAdapterFactory> {
    pub(crate) configuration: QuicConfiguration,
    pub(crate) adapter_factory: F,
    pub(crate) session_ticket_handler: Option<SessionTicketHandler>,
    pub(crate) stream_handler: Option<StreamHandler>,
    pub(crate) wait_connected: bool,
    pub(crate) local_port: u16,
    pub(crate) handshake_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            configuration: QuicConfiguration::client(),
            adapter_factory: StandardAdapterFactory,
            session_ticket_handler: None,
            stream_handler: None,
            wait_connected: true,
            local_port: 0,
            handshake_timeout: None,
        }
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F> ConnectOptions<F> {
    /// Replace the configuration. A server name already present is kept as is.
    #[must_use]
    pub fn with_configuration(mut self, configuration: QuicConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Build adapters with `factory` instead of the standard one.
    #[must_use]
    pub fn with_adapter_factory<G>(self, factory: G) -> ConnectOptions<G> {
        ConnectOptions {
            configuration: self.configuration,
            adapter_factory: factory,
            session_ticket_handler: self.session_ticket_handler,
            stream_handler: self.stream_handler,
            wait_connected: self.wait_connected,
            local_port: self.local_port,
            handshake_timeout: self.handshake_timeout,
        }
    }

    #[must_use]
    pub fn with_session_ticket_handler(mut self, handler: SessionTicketHandler) -> Self {
        self.session_ticket_handler = Some(handler);
        self
    }

    /// Invoked with the reader and writer of every stream the peer opens.
    #[must_use]
    pub fn with_stream_handler(mut self, handler: StreamHandler) -> Self {
        self.stream_handler = Some(handler);
        self
    }

    /// Whether `connect` returns only after the handshake finished.
    #[must_use]
    pub fn with_wait_connected(mut self, wait: bool) -> Self {
        self.wait_connected = wait;
        self
    }

    #[must_use]
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Bound the handshake wait. Ignored when not waiting for the handshake.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn configuration(&self) -> &QuicConfiguration {
        &self.configuration
    }

    #[must_use]
    pub fn wait_connected(&self) -> bool {
        self.wait_connected
    }

    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout
    }
}

impl<F> fmt::Debug for ConnectOptions<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("configuration", &self.configuration)
            .field("session_ticket_handler", &self.session_ticket_handler.is_some())
            .field("stream_handler", &self.stream_handler.is_some())
            .field("wait_connected", &self.wait_connected)
            .field("local_port", &self.local_port)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}
