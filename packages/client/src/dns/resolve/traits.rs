//! DNS resolution traits and type aliases

use std::future::Future;
use std::pin::Pin;

use super::types::{DnsResult, Name};
use crate::error::BoxError;

/// An iterator of resolved socket addresses.
pub type Addrs = DnsResult;

/// Future returned by a resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, BoxError>> + Send>>;

/// Resolves a host name to datagram destinations.
///
/// Implementations return candidates in their preferred order; callers
/// treat an empty result as a failed lookup.
pub trait Resolve: Send + Sync + 'static {
    fn resolve(&self, name: Name, port: u16) -> Resolving;
}
