//! System allocator backend
//!
//! Every primitive is a direct call into the platform allocator. The backend
//! keeps no bookkeeping, so it cannot report usage, enforce quotas or detect
//! corruption.

use core::ptr::NonNull;

use tracing::warn;

use super::{MemInfo, MemoryBackend, ModuleStats};
use crate::config::SysMallocConfig;
use crate::error::MemoryResult;
use crate::platform::{LibcAllocator, PlatformAllocator};

/// Pass-through backend over a [`PlatformAllocator`]
///
/// Not synchronized: the private pool relies on whatever discipline the host
/// already imposes, and the platform allocator is itself thread-safe.
#[derive(Debug, Clone)]
pub struct SysMalloc<P: PlatformAllocator = LibcAllocator> {
    config: SysMallocConfig,
    platform: P,
}

impl SysMalloc<LibcAllocator> {
    /// Backend over the C library allocator, registered as `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: SysMallocConfig::named(name),
            platform: LibcAllocator::new(),
        }
    }
}

impl Default for SysMalloc<LibcAllocator> {
    fn default() -> Self {
        Self {
            config: SysMallocConfig::default(),
            platform: LibcAllocator::new(),
        }
    }
}

impl<P: PlatformAllocator> SysMalloc<P> {
    /// Backend over a custom platform allocator
    pub fn with_config(config: SysMallocConfig, platform: P) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self { config, platform })
    }

    /// Configuration the backend was built from
    pub fn config(&self) -> &SysMallocConfig {
        &self.config
    }

    /// Underlying platform allocator
    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: PlatformAllocator> MemoryBackend for SysMalloc<P> {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[inline]
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.platform.malloc(size)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.platform.malloc(size)?;
        // SAFETY: ptr is a fresh block of at least `size` writable bytes.
        unsafe { ptr.as_ptr().write_bytes(0, size) };
        Some(ptr)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees ptr came from this backend's platform.
        unsafe { self.platform.free(ptr) }
    }

    #[inline]
    unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.platform.realloc(ptr, size) }
    }

    unsafe fn reallocate_or_free(
        &self,
        ptr: Option<NonNull<u8>>,
        size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        let resized = unsafe { self.platform.realloc(ptr, size) };
        if resized.is_none()
            && let Some(old) = ptr
        {
            // SAFETY: a failed realloc leaves `old` live and owned by us.
            unsafe { self.platform.free(old) };
        }
        resized
    }

    fn status(&self) {}

    fn check(&self) {}

    fn info(&self, out: &mut MemInfo) {
        *out = MemInfo::default();
    }

    fn available(&self) -> usize {
        self.config.available
    }

    fn sums(&self) {}

    fn get_stats(&self) -> Option<ModuleStats> {
        warn!(
            backend = %self.config.name,
            "No statistics for the system memory manager"
        );
        None
    }

    fn free_stats(&self, _root: Option<ModuleStats>) {}
}

impl<P: PlatformAllocator> SysMalloc<P> {
    /// Free the old block, then allocate a fresh one
    ///
    /// Contents are **not** preserved. The backend has no way to learn the
    /// old block's size, so it cannot copy; the shared pool exposes this as
    /// [`SharedMemoryBackend::resize`](super::SharedMemoryBackend::resize).
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must come from this backend. It is invalid after the
    /// call whatever the outcome.
    pub unsafe fn resize(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        if let Some(old) = ptr {
            // SAFETY: caller hands ownership of `old` to us.
            unsafe { self.platform.free(old) };
        }
        self.platform.malloc(size)
    }
}
