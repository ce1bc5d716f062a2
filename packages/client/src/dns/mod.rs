//! DNS resolution

pub mod address;
pub mod resolve;

pub use address::{AddressResolver, ResolvedAddress};
pub use resolve::{
    Addrs, DnsResolverWithOverrides, DnsResult, DynResolver, GaiResolver, HickoryResolver, Name,
    Resolve, Resolving,
};
