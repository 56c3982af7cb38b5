//! Memory backend contract
//!
//! A backend is everything a host needs to route its allocations through a
//! particular strategy. [`MemoryBackend`] is the private-pool shape;
//! [`SharedMemoryBackend`] extends it with the operations a shared pool needs
//! (resize, lock entries, lock-free variants used inside a held section).
//!
//! Implementations:
//! - [`SysMalloc`]: pass-through to the platform allocator, private pool
//! - [`SysShm`]: the same primitives plus the shared-pool lock

mod shared;
mod system;

use core::ptr::NonNull;

pub use shared::{ShmGuard, SysShm};
pub use system::SysMalloc;

/// Allocator statistics snapshot
///
/// A backend that cannot measure its pool reports the zero value; callers read
/// [`MemInfo::is_unsupported`] as "no statistics", not "nothing in use".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// Total pool size in bytes
    pub total_size: usize,
    /// Bytes not handed out
    pub free_size: usize,
    /// Bytes handed out to callers
    pub used_size: usize,
    /// Bytes handed out including allocator overhead
    pub real_used: usize,
    /// High-water mark of `real_used`
    pub max_used: usize,
    /// Number of free fragments
    pub free_frags: usize,
    /// Number of fragments overall
    pub total_frags: usize,
}

impl MemInfo {
    /// `true` when the snapshot carries no data at all
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        *self == Self::default()
    }
}

/// Root of the per-module statistics a backend may report
///
/// Opaque: no backend in this crate tracks per-module usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ModuleStats {}

/// Operations every backend provides to the private-pool registry
///
/// The absent result (`None`) signals allocation failure; backends do not
/// retry and do not log it.
pub trait MemoryBackend: Send + Sync {
    /// Backend name, identical for both pool kinds
    fn name(&self) -> &str;

    /// Allocate at least `size` uninitialized bytes
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Allocate at least `size` bytes, all zero
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block
    ///
    /// # Safety
    ///
    /// `ptr` must come from this backend and must not be freed twice.
    unsafe fn free(&self, ptr: NonNull<u8>);

    /// Resize preserving contents; on failure `ptr` stays owned by the caller
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must come from this backend. On success it is invalid.
    unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>>;

    /// Resize preserving contents; on failure `ptr` has been freed
    ///
    /// Ownership of `ptr` always transfers to the backend.
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must come from this backend. It is invalid after the
    /// call whatever the outcome.
    unsafe fn reallocate_or_free(
        &self,
        ptr: Option<NonNull<u8>>,
        size: usize,
    ) -> Option<NonNull<u8>>;

    /// Dump pool status to the log
    fn status(&self);

    /// Run the pool consistency check
    fn check(&self);

    /// Overwrite `out` with the current statistics
    fn info(&self, out: &mut MemInfo);

    /// Estimated free capacity in bytes
    fn available(&self) -> usize;

    /// Dump per-fragment summaries to the log
    fn sums(&self);

    /// Collect per-module statistics, `None` when not supported
    fn get_stats(&self) -> Option<ModuleStats>;

    /// Release a root produced by [`MemoryBackend::get_stats`]
    fn free_stats(&self, root: Option<ModuleStats>);
}

/// Operations a backend provides to the shared-pool registry
///
/// The host brackets every critical section with [`glock`](Self::glock) /
/// [`gunlock`](Self::gunlock) (or an [`ShmGuard`]); the allocation entries do
/// not lock on their own.
pub trait SharedMemoryBackend: MemoryBackend {
    /// Free the old block, then allocate a fresh one
    ///
    /// Unlike [`reallocate`](MemoryBackend::reallocate), contents are **not**
    /// preserved: the returned block holds unspecified bytes.
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must come from this backend. It is invalid after the
    /// call whatever the outcome.
    unsafe fn resize(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>>;

    /// Allocate while the caller already holds the shared lock
    fn allocate_unlocked(&self, size: usize) -> Option<NonNull<u8>> {
        self.allocate(size)
    }

    /// Free while the caller already holds the shared lock
    ///
    /// # Safety
    ///
    /// Same contract as [`MemoryBackend::free`].
    unsafe fn free_unlocked(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }

    /// Acquire the shared-pool lock, blocking until it is available
    fn glock(&self);

    /// Release the shared-pool lock
    fn gunlock(&self);
}
