//! QUIC Connect Public API
//!
//! Fluent builder over the connection lifecycle of `quic_connect_client`.
//! Every connection is closed when its scope ends, with the logical QUIC
//! close always preceding the release of the socket.
//!
//! ```no_run
//! # async fn run() -> quic_connect::Result<()> {
//! let page = quic_connect::QuicConnect::new()
//!     .alpn(["hq-interop"])
//!     .scoped("example.com", 443, |adapter| async move {
//!         let (mut reader, writer) = adapter.open_stream(0);
//!         writer.finish(b"GET /\r\n")?;
//!
//!         let mut page = Vec::new();
//!         while let Some(chunk) = reader.read().await {
//!             page.extend_from_slice(&chunk);
//!         }
//!         Ok::<_, quic_connect::Error>(page)
//!     })
//!     .await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

pub use builder::*;

// Re-export important types from client package
pub use quic_connect_client::{
    ClientSession, ConnectOptions, ConnectStatsSnapshot, DnsResolverWithOverrides, DynResolver,
    LifecycleState, QuicClient, QuicConfiguration, ResolvedAddress, SessionTicket,
    StandardAdapter, StreamReader, StreamWriter,
};

/// Start building a connection with default options.
///
/// Shorthand for `QuicConnect::new()`
#[must_use]
pub fn new() -> QuicConnect {
    QuicConnect::new()
}

/// Start building a connection through an existing client.
///
/// # Arguments
/// * `client` - Client whose runtime and statistics the connection uses
#[must_use]
pub fn with_client(client: &QuicClient) -> QuicConnect {
    QuicConnect::with_client(client)
}

/// Connect to `host:port` with default options.
///
/// # Errors
///
/// Resolution, bind, configuration and handshake errors.
pub async fn connect(
    host: &str,
    port: u16,
) -> Result<ClientSession<StandardAdapter<quic_connect_client::QuicheConnection>>> {
    QuicConnect::new().connect(host, port).await
}
