//! System getaddrinfo-based DNS resolver

use std::time::Duration;

use super::traits::{Resolve, Resolving};
use super::types::{DnsResult, Name};
use crate::error::{BoxError, TimedOut};

/// Resolver backed by the operating system's `getaddrinfo`, run on tokio's
/// blocking pool.
#[derive(Debug, Clone)]
pub struct GaiResolver {
    timeout: Option<Duration>,
}

impl GaiResolver {
    #[must_use]
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Bound the lookup; an expired lookup fails with a timeout error.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for GaiResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name, port: u16) -> Resolving {
        let timeout = self.timeout;

        Box::pin(async move {
            let lookup = tokio::net::lookup_host((name.as_str(), port));
            let addrs = match timeout {
                Some(limit) => tokio::time::timeout(limit, lookup)
                    .await
                    .map_err(|_| TimedOut)??,
                None => lookup.await?,
            };

            let result: DnsResult = addrs.collect();
            tracing::trace!(
                target: "quic_connect::dns",
                host = %name,
                candidates = result.len(),
                "getaddrinfo lookup finished"
            );
            Ok::<_, BoxError>(result)
        })
    }
}
