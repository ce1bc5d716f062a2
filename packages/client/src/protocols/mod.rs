//! QUIC connection objects and the adapters that drive them

pub mod adapter;
pub mod connection;
pub mod quiche;
pub mod standard;
pub mod stream;

pub use adapter::{AdapterFactory, FnAdapterFactory, ProtocolAdapter, adapter_factory_fn};
pub use connection::{QuicConnection, QuicEvent};
pub use standard::{StandardAdapter, StandardAdapterFactory};
pub use stream::{StreamHandler, StreamReader, StreamWriter};
