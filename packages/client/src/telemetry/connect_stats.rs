//! Connection lifecycle counters
//!
//! Cache-padded atomic counters shared by every connection a `QuicClient`
//! establishes.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Lock-free counters for connection attempts and their outcomes.
#[derive(Debug, Default)]
pub struct ConnectStats {
    /// `connect` calls that started
    pub attempts: CachePadded<AtomicU64>,
    pub resolution_failures: CachePadded<AtomicU64>,
    pub bind_failures: CachePadded<AtomicU64>,
    /// Handshakes that failed or timed out while the caller waited
    pub handshake_failures: CachePadded<AtomicU64>,
    /// Sessions handed to the caller
    pub established: CachePadded<AtomicU64>,
    /// Close sequences that ran to completion
    pub teardowns: CachePadded<AtomicU64>,
}

/// Point-in-time copy of `ConnectStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectStatsSnapshot {
    pub attempts: u64,
    pub resolution_failures: u64,
    pub bind_failures: u64,
    pub handshake_failures: u64,
    pub established: u64,
    pub teardowns: u64,
}

impl ConnectStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_resolution_failure(&self) {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_bind_failure(&self) {
        self.bind_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_handshake_failure(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_established(&self) {
        self.established.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> ConnectStatsSnapshot {
        ConnectStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            bind_failures: self.bind_failures.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
            established: self.established.load(Ordering::Relaxed),
            teardowns: self.teardowns.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = ConnectStats::new();
        stats.record_attempt();
        stats.record_attempt();
        stats.record_resolution_failure();
        stats.record_established();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.resolution_failures, 1);
        assert_eq!(snapshot.established, 1);
        assert_eq!(snapshot.teardowns, 0);

        stats.record_teardown();
        assert_eq!(stats.snapshot().teardowns, 1);
    }
}
