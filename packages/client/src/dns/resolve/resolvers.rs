//! Shared resolver handle

use std::sync::Arc;

use super::gai::GaiResolver;
use super::traits::{Resolve, Resolving};
use super::types::Name;

/// Cheaply clonable handle to any `Resolve` implementation.
#[derive(Clone)]
pub struct DynResolver {
    resolver: Arc<dyn Resolve>,
}

impl std::fmt::Debug for DynResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynResolver").finish_non_exhaustive()
    }
}

impl DynResolver {
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }

    #[must_use]
    pub fn gai() -> Self {
        Self::new(Arc::new(GaiResolver::new()))
    }

    /// Shared reference to the wrapped resolver
    #[must_use]
    pub fn inner(&self) -> Arc<dyn Resolve> {
        Arc::clone(&self.resolver)
    }
}

impl Default for DynResolver {
    fn default() -> Self {
        Self::gai()
    }
}

impl Resolve for DynResolver {
    fn resolve(&self, name: Name, port: u16) -> Resolving {
        self.resolver.resolve(name, port)
    }
}
