//! DNS resolution via the [hickory-resolver](https://github.com/hickory-dns/hickory-dns) crate

use std::net::SocketAddr;
use std::sync::Arc;

use hickory_resolver::TokioResolver;
use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use once_cell::sync::OnceCell;

use super::traits::{Resolve, Resolving};
use super::types::{DnsResult, Name};
use crate::error::BoxError;

/// Wrapper around an async hickory `Resolver`, which implements the `Resolve` trait.
#[derive(Debug, Default, Clone)]
pub struct HickoryResolver {
    /// Construction is delayed until the first lookup.
    state: Arc<OnceCell<TokioResolver>>,
}

impl HickoryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: Name, port: u16) -> Resolving {
        let resolver = self.clone();

        Box::pin(async move {
            let resolver = resolver.state.get_or_init(new_resolver);
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let result: DnsResult = lookup.iter().map(|ip| SocketAddr::new(ip, port)).collect();

            tracing::trace!(
                target: "quic_connect::dns",
                host = %name,
                candidates = result.len(),
                "hickory lookup finished"
            );
            Ok::<_, BoxError>(result)
        })
    }
}

/// Create a new resolver with the default upstream configuration. Options
/// are overridden to look up both IPv4 and IPv6 addresses, since the
/// dual-stack socket can reach either.
fn new_resolver() -> TokioResolver {
    let mut opts = ResolverOpts::default();
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

    TokioResolver::builder_with_config(
        ResolverConfig::default(),
        TokioConnectionProvider::default(),
    )
    .with_options(opts)
    .build()
}
