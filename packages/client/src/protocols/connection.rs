//! QUIC connection object contract
//!
//! The QUIC state machine is an external collaborator. The lifecycle core
//! only constructs it, asks it to connect and asks it to close; the adapter
//! feeds it datagrams and timer expirations and drains its events.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;

use crate::config::QuicConfiguration;
use crate::error::Result;
use crate::tls::SessionTicketHandler;

/// Application-visible events produced by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuicEvent {
    /// The handshake completed; the connection can carry application data.
    HandshakeCompleted {
        alpn_protocol: Option<String>,
        session_resumed: bool,
    },
    /// Data arrived on a stream, possibly one the peer just opened.
    StreamDataReceived {
        stream_id: u64,
        data: Bytes,
        end_stream: bool,
    },
    /// The connection is fully closed. No further events follow.
    ConnectionTerminated { error_code: u64, reason: String },
}

/// QUIC state machine driven by a protocol adapter.
///
/// Implementations are sans-I/O: they never touch sockets or clocks
/// themselves, every input carries the current time.
pub trait QuicConnection: Send + 'static {
    /// Build a connection object for one connect attempt.
    ///
    /// `session_ticket_handler` is invoked by the TLS engine whenever the
    /// server issues a resumption ticket.
    fn new(
        configuration: QuicConfiguration,
        session_ticket_handler: Option<SessionTicketHandler>,
    ) -> Result<Self>
    where
        Self: Sized;

    /// Configuration the connection was built with
    fn configuration(&self) -> &QuicConfiguration;

    /// Start the handshake towards `peer` from the local address `local`.
    fn connect(&mut self, peer: SocketAddr, local: SocketAddr, now: Instant) -> Result<()>;

    /// Process one inbound datagram. Undecodable datagrams are dropped.
    fn receive_datagram(&mut self, data: &mut [u8], from: SocketAddr, to: SocketAddr, now: Instant);

    /// Datagrams ready to be sent, each with its destination.
    fn datagrams_to_send(&mut self, now: Instant) -> Vec<(Vec<u8>, SocketAddr)>;

    /// Next instant at which `handle_timer` must be called
    fn timeout(&self) -> Option<Instant>;

    fn handle_timer(&mut self, now: Instant);

    fn next_event(&mut self) -> Option<QuicEvent>;

    fn send_stream_data(&mut self, stream_id: u64, data: &[u8], end_stream: bool) -> Result<()>;

    /// Begin closing. A `ConnectionTerminated` event is emitted once the close
    /// has fully completed.
    fn close(&mut self, error_code: u64, reason: &str);

    fn is_closed(&self) -> bool;
}
