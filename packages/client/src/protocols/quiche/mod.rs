//! quiche-backed QUIC state machine

pub mod connection;

pub use connection::QuicheConnection;
