//! Backend registries
//!
//! A registry is the host-owned slot a backend is installed into. Call sites
//! allocate through whatever backend is active, so swapping strategies never
//! touches them. [`PoolRegistry`] is the boundary registration talks to;
//! [`BackendRegistry`] is the default implementation, one per pool kind.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::{MemoryBackend, SharedMemoryBackend};
use crate::error::{MemoryError, MemoryResult, PoolKind};

/// Accepts a backend and makes it the active allocator for one pool kind
pub trait PoolRegistry<B: ?Sized>: Send + Sync {
    /// Pool kind this registry serves
    fn pool(&self) -> PoolKind;

    /// Install `backend` and make it active
    ///
    /// On error nothing is installed.
    fn init_api(&self, backend: Arc<B>) -> MemoryResult<()>;
}

/// Registry of private-pool backends
pub type PkgRegistry = BackendRegistry<dyn MemoryBackend>;

/// Registry of shared-pool backends
pub type ShmRegistry = BackendRegistry<dyn SharedMemoryBackend>;

/// Named backends with one active selection
pub struct BackendRegistry<B: ?Sized> {
    pool: PoolKind,

    /// Registered backends by name
    backends: DashMap<String, Arc<B>>,

    /// Name of the active backend
    active: RwLock<Option<String>>,
}

impl<B: ?Sized> BackendRegistry<B> {
    /// Creates an empty registry for `pool`
    #[must_use]
    pub fn new(pool: PoolKind) -> Self {
        Self {
            pool,
            backends: DashMap::new(),
            active: RwLock::new(None),
        }
    }

    /// Name of the active backend
    pub fn active_name(&self) -> Option<String> {
        self.active.read().clone()
    }

    /// The active backend
    pub fn active(&self) -> Option<Arc<B>> {
        let name = self.active.read();
        name.as_deref()
            .and_then(|name| self.backends.get(name).map(|entry| Arc::clone(entry.value())))
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// `true` when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl<B: ?Sized + Send + Sync> BackendRegistry<B> {
    fn install(&self, name: &str, backend: Arc<B>) -> MemoryResult<()> {
        if name.trim().is_empty() {
            return Err(MemoryError::registration(
                name,
                self.pool,
                "backend name must not be empty",
            ));
        }

        if self.backends.insert(name.to_string(), backend).is_some() {
            debug!(backend = name, pool = %self.pool, "replacing registered memory backend");
        }
        *self.active.write() = Some(name.to_string());
        debug!(backend = name, pool = %self.pool, "memory backend active");
        Ok(())
    }
}

impl PoolRegistry<dyn MemoryBackend> for PkgRegistry {
    fn pool(&self) -> PoolKind {
        self.pool
    }

    fn init_api(&self, backend: Arc<dyn MemoryBackend>) -> MemoryResult<()> {
        let name = backend.name().to_string();
        self.install(&name, backend)
    }
}

impl PoolRegistry<dyn SharedMemoryBackend> for ShmRegistry {
    fn pool(&self) -> PoolKind {
        self.pool
    }

    fn init_api(&self, backend: Arc<dyn SharedMemoryBackend>) -> MemoryResult<()> {
        let name = backend.name().to_string();
        self.install(&name, backend)
    }
}

impl Default for PkgRegistry {
    fn default() -> Self {
        Self::new(PoolKind::Private)
    }
}

impl Default for ShmRegistry {
    fn default() -> Self {
        Self::new(PoolKind::Shared)
    }
}

impl<B: ?Sized> core::fmt::Debug for BackendRegistry<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("pool", &self.pool)
            .field("backends", &self.backends.len())
            .field("active", &*self.active.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SysMalloc;

    #[test]
    fn test_registry_basic_functionality() {
        let registry = PkgRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.active().is_none());

        registry
            .init_api(Arc::new(SysMalloc::new("sys_malloc")))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_name().as_deref(), Some("sys_malloc"));

        let backend = registry.active().expect("backend active");
        let ptr = backend.allocate(64).expect("active backend allocates");
        unsafe { backend.free(ptr) };
    }

    #[test]
    fn test_latest_registration_is_active() {
        let registry = PkgRegistry::default();
        registry.init_api(Arc::new(SysMalloc::new("first"))).unwrap();
        registry.init_api(Arc::new(SysMalloc::new("second"))).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.active().unwrap().name(), "second");
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = PkgRegistry::default();
        registry.init_api(Arc::new(SysMalloc::new("sys_malloc"))).unwrap();
        registry.init_api(Arc::new(SysMalloc::new("sys_malloc"))).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = PkgRegistry::default();
        let err = registry.init_api(Arc::new(SysMalloc::new(""))).unwrap_err();
        assert!(matches!(err, MemoryError::Registration { pool: PoolKind::Private, .. }));
        assert!(registry.is_empty());
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_pool_kinds() {
        assert_eq!(PkgRegistry::default().pool(), PoolKind::Private);
        assert_eq!(ShmRegistry::default().pool(), PoolKind::Shared);
    }
}
