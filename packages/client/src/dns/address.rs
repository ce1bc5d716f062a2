//! Destination address resolution
//!
//! Turns `host:port` into the single dual-stack destination a connection
//! attempt uses.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, SocketAddrV6};

use super::resolve::{DynResolver, Name, Resolve};
use crate::error::{self, NoAddresses, Result};

/// Destination in IPv6 dual-stack form.
///
/// IPv4 candidates are stored as their IPv4-mapped IPv6 address
/// (`::ffff:a.b.c.d`) with flow and scope set to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    ip: Ipv6Addr,
    port: u16,
    flow: u32,
    scope: u32,
}

impl ResolvedAddress {
    #[must_use]
    pub fn ip(&self) -> Ipv6Addr {
        self.ip
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn flow(&self) -> u32 {
        self.flow
    }

    #[must_use]
    pub fn scope(&self) -> u32 {
        self.scope
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(self.ip, self.port, self.flow, self.scope))
    }
}

impl From<SocketAddr> for ResolvedAddress {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self {
                ip: v4.ip().to_ipv6_mapped(),
                port: v4.port(),
                flow: 0,
                scope: 0,
            },
            SocketAddr::V6(v6) => Self {
                ip: *v6.ip(),
                port: v6.port(),
                flow: v6.flowinfo(),
                scope: v6.scope_id(),
            },
        }
    }
}

impl From<ResolvedAddress> for SocketAddr {
    fn from(addr: ResolvedAddress) -> Self {
        addr.socket_addr()
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

/// Resolves a connection target to exactly one destination.
///
/// Only the first candidate the resolver returns is used; there is no
/// fallback to later candidates and no retry.
#[derive(Debug, Clone, Default)]
pub struct AddressResolver {
    resolver: DynResolver,
}

impl AddressResolver {
    #[must_use]
    pub fn new(resolver: DynResolver) -> Self {
        Self { resolver }
    }

    /// Resolve `host:port` to a dual-stack destination.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if the lookup fails or yields no candidate.
    pub async fn resolve(&self, host: &str, port: u16) -> Result<ResolvedAddress> {
        let lookup_host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = lookup_host.parse::<IpAddr>() {
            return Ok(ResolvedAddress::from(SocketAddr::new(ip, port)));
        }

        let candidates = self
            .resolver
            .resolve(Name::from(lookup_host), port)
            .await
            .map_err(|e| error::resolution(e).with_host(host))?;

        let Some(first) = candidates.first() else {
            tracing::warn!(
                target: "quic_connect::dns",
                host = %host,
                port,
                "Resolution returned no candidates"
            );
            return Err(error::resolution(NoAddresses).with_host(host));
        };

        let resolved = ResolvedAddress::from(first);
        tracing::debug!(
            target: "quic_connect::dns",
            host = %host,
            candidates = candidates.len(),
            destination = %resolved,
            "Resolved destination"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::dns::resolve::{DnsResult, Resolving};
    use crate::error::BoxError;

    struct Fixed(Vec<SocketAddr>);

    impl Resolve for Fixed {
        fn resolve(&self, _name: Name, _port: u16) -> Resolving {
            let result: DnsResult = self.0.iter().copied().collect();
            Box::pin(async move { Ok::<_, BoxError>(result) })
        }
    }

    fn resolver(addrs: Vec<SocketAddr>) -> AddressResolver {
        AddressResolver::new(DynResolver::new(Arc::new(Fixed(addrs))))
    }

    #[test]
    fn ipv4_is_mapped_with_zero_flow_and_scope() {
        let addr = ResolvedAddress::from(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
            4433,
        ));
        assert_eq!(addr.ip().to_string(), "::ffff:203.0.113.5");
        assert_eq!(addr.port(), 4433);
        assert_eq!(addr.flow(), 0);
        assert_eq!(addr.scope(), 0);
    }

    #[test]
    fn ipv6_keeps_flow_and_scope() {
        let v6 = SocketAddrV6::new("fe80::1".parse().expect("valid IPv6"), 443, 7, 3);
        let addr = ResolvedAddress::from(SocketAddr::V6(v6));
        assert_eq!(addr.socket_addr(), SocketAddr::V6(v6));
    }

    #[tokio::test]
    async fn first_candidate_wins() {
        let resolver = resolver(vec![
            "198.51.100.7:4433".parse().expect("valid address"),
            "[2001:db8::7]:4433".parse().expect("valid address"),
        ]);
        let resolved = resolver
            .resolve("example.test", 4433)
            .await
            .expect("resolution should succeed");
        assert_eq!(resolved.to_string(), "[::ffff:198.51.100.7]:4433");
    }

    #[tokio::test]
    async fn literal_skips_lookup() {
        let resolved = resolver(Vec::new())
            .resolve("[2001:db8::5]", 4433)
            .await
            .expect("literal needs no lookup");
        assert_eq!(resolved.to_string(), "[2001:db8::5]:4433");

        let resolved = resolver(Vec::new())
            .resolve("203.0.113.5", 4433)
            .await
            .expect("literal needs no lookup");
        assert_eq!(resolved.to_string(), "[::ffff:203.0.113.5]:4433");
    }

    #[tokio::test]
    async fn zero_candidates_is_resolution_error() {
        let err = resolver(Vec::new())
            .resolve("nothing.test", 4433)
            .await
            .expect_err("empty lookup must fail");
        assert!(err.is_resolution());
        assert_eq!(err.host(), Some("nothing.test"));
    }
}
