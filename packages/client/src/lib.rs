//! # QUIC Connect Client
//!
//! Client-side connection establishment for QUIC: address resolution with
//! dual-stack normalization, server name derivation, per-connection
//! dual-stack UDP sockets and a lifecycle manager that always tears the
//! connection down, whether the caller returns, fails or is cancelled.
//!
//! ## Features
//!
//! - **First-candidate resolution** over getaddrinfo, hickory or static overrides
//! - **IPv4-mapped IPv6 destinations** so one socket reaches both families
//! - **Scoped sessions** with close, wait-closed and transport release in order
//! - **Pluggable adapters** over any `QuicConnection`, quiche included
//!
//! ## Usage
//!
//! ```no_run
//! use quic_connect_client::{ConnectOptions, QuicClient};
//!
//! # async fn run() -> quic_connect_client::Result<()> {
//! let client = QuicClient::current()?;
//! let session = client
//!     .connect("example.com", 443, ConnectOptions::new())
//!     .await?;
//!
//! let (mut reader, writer) = session.open_stream(0);
//! writer.finish(b"ping")?;
//! while let Some(chunk) = reader.read().await {
//!     println!("received {} bytes", chunk.len());
//! }
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod connect;
pub mod dns;
pub mod error;
pub mod protocols;
pub mod telemetry;
pub mod tls;

// Prelude with canonical types
pub mod prelude;

pub use crate::prelude::*;
pub use client::connect;
