//! DNS resolver with hostname overrides
//!
//! Static host table consulted before the wrapped resolver, for testing and
//! custom routing scenarios.

use std::net::SocketAddr;
use std::sync::Arc;

use hashbrown::HashMap;

use super::traits::{Resolve, Resolving};
use super::types::{DnsResult, Name};
use crate::error::BoxError;

/// Resolver answering configured hosts from a fixed table.
///
/// Override entries with port 0 take the port requested by the caller.
#[derive(Clone)]
pub struct DnsResolverWithOverrides {
    dns_resolver: Arc<dyn Resolve>,
    overrides: Arc<HashMap<String, DnsResult>>,
}

impl DnsResolverWithOverrides {
    pub fn new(dns_resolver: Arc<dyn Resolve>, overrides: HashMap<String, Vec<SocketAddr>>) -> Self {
        let overrides: HashMap<String, DnsResult> = overrides
            .into_iter()
            .map(|(host, addrs)| (host.to_ascii_lowercase(), addrs.into_iter().collect()))
            .collect();

        Self {
            dns_resolver,
            overrides: Arc::new(overrides),
        }
    }
}

impl std::fmt::Debug for DnsResolverWithOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolverWithOverrides")
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name, port: u16) -> Resolving {
        if let Some(addrs) = self.overrides.get(&name.as_str().to_ascii_lowercase()) {
            let result: DnsResult = addrs
                .iter()
                .map(|addr| {
                    let mut addr = *addr;
                    if addr.port() == 0 {
                        addr.set_port(port);
                    }
                    addr
                })
                .collect();
            return Box::pin(async move { Ok::<_, BoxError>(result) });
        }

        self.dns_resolver.resolve(name, port)
    }
}
