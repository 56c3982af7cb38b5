//! # nebula-sysmalloc
//!
//! Pass-through memory backend for Nebula's private and shared memory pools.
//!
//! A host routes every allocation through a backend installed in a registry,
//! so the allocation strategy can change without touching call sites. This
//! crate provides the backend that forwards straight to the platform
//! allocator, plus the lifecycle of the lock that guards the shared pool.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_sysmalloc::prelude::*;
//!
//! let pkg = PkgRegistry::default();
//! let shm = ShmRegistry::default();
//!
//! assert_eq!(nebula_sysmalloc::init_pkg_manager(&pkg), 0);
//! assert_eq!(nebula_sysmalloc::init_shm_manager(&shm), 0);
//!
//! let backend = shm.active().unwrap();
//! let block = {
//!     let _guard = ShmGuard::new(backend.as_ref());
//!     backend.allocate_zeroed(64).unwrap()
//! };
//! unsafe { backend.free(block) };
//! ```
//!
//! ## Contract notes
//!
//! - Allocation failure is `None`, never an error, never retried.
//! - `reallocate` keeps the old block on failure; `reallocate_or_free`
//!   frees it.
//! - `resize` frees then allocates: contents are **not** preserved.
//! - `info` is always zero and `available` is a fixed sentinel: the platform
//!   allocator exposes no statistics.
//! - The shared pool lock is not taken by allocation entries; hosts bracket
//!   critical sections with `glock`/`gunlock` or a guard.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod platform;
pub mod registration;
pub mod registry;

pub use crate::config::{AVAILABLE_SENTINEL, SYS_MALLOC_NAME, SysMallocConfig};
pub use crate::error::{MemoryError, MemoryResult, PoolKind, status_code};
pub use crate::lifecycle::{
    destroy_pkg_manager, destroy_shm_lock, init_pkg_manager, init_shm_manager, shm_lock,
};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::backend::{
        MemInfo, MemoryBackend, ModuleStats, SharedMemoryBackend, ShmGuard, SysMalloc, SysShm,
    };
    pub use crate::config::SysMallocConfig;
    pub use crate::error::{MemoryError, MemoryResult, PoolKind};
    pub use crate::lock::{LockGuard, LockState, PoolLock, ShmLock};
    pub use crate::platform::{LibcAllocator, PlatformAllocator};
    pub use crate::registration::{register_private, register_shared};
    pub use crate::registry::{BackendRegistry, PkgRegistry, PoolRegistry, ShmRegistry};
}
