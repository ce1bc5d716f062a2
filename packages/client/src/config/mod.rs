//! Configuration for QUIC client connections
//!
//! Protocol parameters, validation helpers and defaults.

pub mod quic;
pub mod validation;

pub use quic::{CongestionControl, QuicConfiguration};
pub use validation::{ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, Validator};
