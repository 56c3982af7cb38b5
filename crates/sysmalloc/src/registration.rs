//! Bringing the system backend into service
//!
//! Registration builds a backend for one pool kind and hands it to that
//! pool's registry. The shared path first makes sure the pool lock exists, so
//! a lock failure never leaves a half-wired backend registered.

use std::sync::Arc;

use tracing::{debug, error};

use crate::backend::{MemoryBackend, SharedMemoryBackend, SysMalloc, SysShm};
use crate::config::SysMallocConfig;
use crate::error::MemoryResult;
use crate::lock::PoolLock;
use crate::platform::{LibcAllocator, PlatformAllocator};
use crate::registry::PoolRegistry;

/// Register the system backend as `name` with the private-pool registry
pub fn register_private<R>(name: &str, registry: &R) -> MemoryResult<()>
where
    R: PoolRegistry<dyn MemoryBackend> + ?Sized,
{
    let backend = SysMalloc::with_config(SysMallocConfig::named(name), LibcAllocator::new())?;
    register_private_with(backend, registry)
}

/// Register a preconfigured system backend with the private-pool registry
pub fn register_private_with<P, R>(backend: SysMalloc<P>, registry: &R) -> MemoryResult<()>
where
    P: PlatformAllocator + 'static,
    R: PoolRegistry<dyn MemoryBackend> + ?Sized,
{
    backend.config().validate()?;
    let name = backend.name().to_string();
    registry.init_api(Arc::new(backend))?;
    debug!(backend = %name, pool = %registry.pool(), "memory backend registered");
    Ok(())
}

/// Register the system backend as `name` with the shared-pool registry
///
/// `lock` is created if it does not exist yet and bound to the backend's
/// lock entries. Any failure is fatal for the shared pool.
pub fn register_shared<R>(name: &str, lock: Arc<dyn PoolLock>, registry: &R) -> MemoryResult<()>
where
    R: PoolRegistry<dyn SharedMemoryBackend> + ?Sized,
{
    let backend = SysMalloc::with_config(SysMallocConfig::named(name), LibcAllocator::new())?;
    register_shared_with(backend, lock, registry)
}

/// Register a preconfigured system backend with the shared-pool registry
pub fn register_shared_with<P, R>(
    backend: SysMalloc<P>,
    lock: Arc<dyn PoolLock>,
    registry: &R,
) -> MemoryResult<()>
where
    P: PlatformAllocator + 'static,
    R: PoolRegistry<dyn SharedMemoryBackend> + ?Sized,
{
    backend.config().validate()?;
    let name = backend.name().to_string();

    if let Err(err) = lock.create() {
        error!(backend = %name, error = %err, "cannot initialize the core shm lock");
        return Err(err);
    }

    let shm: Arc<dyn SharedMemoryBackend> = Arc::new(SysShm::new(backend, lock));
    if let Err(err) = registry.init_api(shm) {
        error!(backend = %name, error = %err, "cannot initialize the core shm api");
        return Err(err);
    }

    debug!(backend = %name, pool = %registry.pool(), "memory backend registered");
    Ok(())
}
