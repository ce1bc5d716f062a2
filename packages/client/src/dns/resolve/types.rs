//! Core DNS types for resolution
//!
//! Defines `Name` and `DnsResult` used throughout the resolution system.

use std::net::SocketAddr;

use arrayvec::ArrayVec;

/// Maximum number of candidates kept from one lookup
pub const MAX_CANDIDATES: usize = 8;

/// DNS name representation for hostname resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_string())
    }
}

/// Candidates returned by one lookup, in resolver order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsResult {
    pub addrs: ArrayVec<SocketAddr, MAX_CANDIDATES>,
}

impl DnsResult {
    #[must_use]
    pub fn new() -> Self {
        Self {
            addrs: ArrayVec::new(),
        }
    }

    /// First candidate, the only one the connect path ever attempts
    #[must_use]
    pub fn first(&self) -> Option<SocketAddr> {
        self.addrs.first().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.addrs.iter()
    }
}

impl FromIterator<SocketAddr> for DnsResult {
    /// Keeps the first `MAX_CANDIDATES` addresses and ignores the rest.
    fn from_iter<I: IntoIterator<Item = SocketAddr>>(iter: I) -> Self {
        Self {
            addrs: iter.into_iter().take(MAX_CANDIDATES).collect(),
        }
    }
}

impl From<SocketAddr> for DnsResult {
    fn from(addr: SocketAddr) -> Self {
        std::iter::once(addr).collect()
    }
}
