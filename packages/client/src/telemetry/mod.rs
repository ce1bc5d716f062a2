//! Connection statistics

pub mod connect_stats;

pub use connect_stats::{ConnectStats, ConnectStatsSnapshot};
