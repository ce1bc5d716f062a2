//! DNS resolution backends
//!
//! Pluggable resolvers behind the dyn-compatible `Resolve` trait: the system
//! resolver, hickory, and a static override table.

pub mod gai;
pub mod hickory;
pub mod overrides;
pub mod resolvers;
pub mod traits;
pub mod types;

pub use gai::GaiResolver;
pub use hickory::HickoryResolver;
pub use overrides::DnsResolverWithOverrides;
pub use resolvers::DynResolver;
pub use traits::{Addrs, Resolve, Resolving};
pub use types::{DnsResult, MAX_CANDIDATES, Name};

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use hashbrown::HashMap;

    use super::*;
    use crate::error::BoxError;

    struct Unreachable;

    impl Resolve for Unreachable {
        fn resolve(&self, name: Name, _port: u16) -> Resolving {
            Box::pin(async move { Err::<DnsResult, BoxError>(format!("unexpected lookup for {name}").into()) })
        }
    }

    #[test]
    fn dns_result_keeps_at_most_eight_candidates() {
        let result: DnsResult = (1..=12u8)
            .map(|n| SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, n)), 443))
            .collect();
        assert_eq!(result.len(), MAX_CANDIDATES);
        assert_eq!(
            result.first(),
            Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 443))
        );
    }

    #[tokio::test]
    async fn overrides_answer_before_inner_resolver() {
        let mut table = HashMap::new();
        table.insert(
            "Example.Test".to_string(),
            vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)), 0)],
        );
        let resolver = DnsResolverWithOverrides::new(Arc::new(Unreachable), table);

        let result = resolver
            .resolve(Name::from("example.test"), 4433)
            .await
            .expect("override lookup should succeed");
        assert_eq!(
            result.first(),
            Some("203.0.113.5:4433".parse().expect("valid socket address"))
        );
    }

    #[tokio::test]
    async fn unknown_hosts_fall_through() {
        let resolver = DnsResolverWithOverrides::new(Arc::new(Unreachable), HashMap::new());
        assert!(resolver.resolve(Name::from("other.test"), 443).await.is_err());
    }

    #[tokio::test]
    async fn gai_resolves_ip_literals_without_network() {
        let result = GaiResolver::new()
            .resolve(Name::from("127.0.0.1"), 4433)
            .await
            .expect("literal lookup should succeed");
        assert_eq!(
            result.first(),
            Some("127.0.0.1:4433".parse().expect("valid socket address"))
        );
    }
}
