use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// A Result alias where the Err case is `quic_connect_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted by every constructor in this module.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur while establishing or tearing down a
/// QUIC client connection.
#[derive(Clone)]
pub struct Error {
    pub inner: Box<Inner>,
}

#[derive(Clone)]
pub struct Inner {
    pub kind: Kind,
    pub source: Option<Arc<dyn StdError + Send + Sync>>,
    pub host: Option<String>,
    pub address: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Name resolution produced no usable destination
    Resolution,
    /// The local dual-stack socket could not be created or bound
    Bind,
    /// The handshake did not complete
    Handshake,
    /// Closing the connection or the transport failed
    Teardown,
    /// Invalid QUIC configuration
    Configuration,
    /// The connection object or adapter rejected a command
    Connection,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                host: None,
                address: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<BoxError>>(mut self, source: E) -> Error {
        self.inner.source = Some(Arc::from(source.into()));
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.inner.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.inner.address = Some(address);
        self
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Host the failing operation was targeting, if known
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.inner.host.as_deref()
    }

    /// Resolved destination the failing operation was targeting, if known
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.inner.address
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("quic_connect::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref host) = self.inner.host {
            f.field("host", host);
        }

        if let Some(ref address) = self.inner.address {
            f.field("address", address);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Resolution => f.write_str("address resolution error")?,
            Kind::Bind => f.write_str("local socket bind error")?,
            Kind::Handshake => f.write_str("handshake error")?,
            Kind::Teardown => f.write_str("connection teardown error")?,
            Kind::Configuration => f.write_str("invalid QUIC configuration")?,
            Kind::Connection => f.write_str("connection error")?,
        }

        if let Some(ref host) = self.inner.host {
            write!(f, " for {host}")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
