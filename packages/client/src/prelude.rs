//! Canonical types for establishing QUIC connections

// Lifecycle
pub use crate::client::{ClientSession, ConnectOptions, LifecycleState, QuicClient};

// Configuration
pub use crate::config::{CongestionControl, QuicConfiguration};

// Errors
pub use crate::error::{Error, Result};

// Resolution
pub use crate::dns::{DnsResolverWithOverrides, DynResolver, ResolvedAddress};

// Protocol layer
pub use crate::protocols::quiche::QuicheConnection;
pub use crate::protocols::{
    AdapterFactory, ProtocolAdapter, QuicConnection, QuicEvent, StandardAdapter,
    StandardAdapterFactory, StreamHandler, StreamReader, StreamWriter, adapter_factory_fn,
};

// TLS identity and resumption
pub use crate::tls::{SessionTicket, SessionTicketHandler};

// Statistics
pub use crate::telemetry::{ConnectStats, ConnectStatsSnapshot};
