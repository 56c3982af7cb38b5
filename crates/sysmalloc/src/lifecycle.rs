//! Process-wide entry points
//!
//! Hosts that speak the integer protocol call these once per pool kind at
//! startup and [`destroy_shm_lock`] at shutdown. They use the single
//! process-wide shared lock; tests and embedders that need isolation call
//! [`crate::registration`] directly with their own lock.

use std::sync::{Arc, LazyLock};

use crate::backend::{MemoryBackend, SharedMemoryBackend};
use crate::config::SYS_MALLOC_NAME;
use crate::error::status_code;
use crate::lock::{PoolLock, ShmLock};
use crate::registration::{register_private, register_shared};
use crate::registry::PoolRegistry;

static SHM_LOCK: LazyLock<Arc<ShmLock>> = LazyLock::new(|| Arc::new(ShmLock::new()));

/// The process-wide shared memory lock
pub fn shm_lock() -> Arc<dyn PoolLock> {
    Arc::clone(&*SHM_LOCK) as Arc<dyn PoolLock>
}

/// Install `sys_malloc` as the private-pool backend
///
/// Returns `0` on success, a negative value on failure.
pub fn init_pkg_manager<R>(registry: &R) -> i32
where
    R: PoolRegistry<dyn MemoryBackend> + ?Sized,
{
    status_code(&register_private(SYS_MALLOC_NAME, registry))
}

/// Counterpart of [`init_pkg_manager`]; the system backend holds nothing to release
pub fn destroy_pkg_manager() {}

/// Install `sys_malloc` as the shared-pool backend, creating the shared lock
///
/// Returns `0` on success, a negative value on failure. A failure means the
/// shared pool is unusable and dependent initialization must stop.
pub fn init_shm_manager<R>(registry: &R) -> i32
where
    R: PoolRegistry<dyn SharedMemoryBackend> + ?Sized,
{
    status_code(&register_shared(SYS_MALLOC_NAME, shm_lock(), registry))
}

/// Tear down the process-wide shared lock
///
/// Safe to call before any shared registration and safe to call twice.
pub fn destroy_shm_lock() {
    SHM_LOCK.destroy();
}
