//! Platform allocator seam
//!
//! The backend never calls `malloc` directly; it goes through
//! [`PlatformAllocator`] so the allocation primitives can be exercised against
//! instrumented or failing allocators.

use core::ptr::NonNull;
use std::sync::Arc;

/// Raw `malloc` / `free` / `realloc` triple
///
/// Blocks are untyped and carry no layout: `free` and `realloc` only need the
/// pointer, the platform tracks sizes itself. Every returned block is aligned
/// for any fundamental type.
pub trait PlatformAllocator: Send + Sync {
    /// Allocate `size` uninitialized bytes, `None` when exhausted
    fn malloc(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block
    ///
    /// # Safety
    ///
    /// - `ptr` must have been returned by this allocator's `malloc`/`realloc`
    /// - `ptr` must not be used after this call
    /// - Must not be called more than once for the same pointer
    unsafe fn free(&self, ptr: NonNull<u8>);

    /// Resize a block, preserving `min(old, size)` bytes
    ///
    /// `None` for `ptr` behaves as `malloc`. A `size` of zero still yields a
    /// minimal live block rather than freeing `ptr`. On failure the original
    /// block is left untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// - `ptr`, if present, must have been returned by this allocator
    /// - On success `ptr` becomes invalid (use the returned pointer instead)
    unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>>;
}

/// The C library allocator
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcAllocator;

impl LibcAllocator {
    /// Creates a new `LibcAllocator`
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl PlatformAllocator for LibcAllocator {
    #[inline]
    fn malloc(&self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: malloc has no preconditions; a null result is mapped to None.
        NonNull::new(unsafe { libc::malloc(size) }.cast::<u8>())
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees ptr came from this allocator and is freed once.
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        let raw = ptr.map_or(core::ptr::null_mut(), |p| p.as_ptr().cast());
        // glibc's realloc(p, 0) frees p and returns NULL, which would read as a
        // failure that left p live. Never ask for zero bytes.
        // SAFETY: raw is null or a live block from libc (caller contract).
        NonNull::new(unsafe { libc::realloc(raw, size.max(1)) }.cast::<u8>())
    }
}

impl<P: PlatformAllocator + ?Sized> PlatformAllocator for Arc<P> {
    #[inline]
    fn malloc(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).malloc(size)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).free(ptr) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).realloc(ptr, size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malloc_free() {
        let platform = LibcAllocator::new();
        let ptr = platform.malloc(64).expect("malloc(64)");
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 64);
            platform.free(ptr);
        }
    }

    #[test]
    fn test_realloc_preserves_prefix() {
        let platform = LibcAllocator::new();
        unsafe {
            let ptr = platform.malloc(4).expect("malloc(4)");
            ptr.as_ptr().cast::<u32>().write_unaligned(0x1234_5678);

            let grown = platform.realloc(Some(ptr), 4096).expect("realloc");
            assert_eq!(grown.as_ptr().cast::<u32>().read_unaligned(), 0x1234_5678);
            platform.free(grown);
        }
    }

    #[test]
    fn test_realloc_from_none_allocates() {
        let platform = LibcAllocator::new();
        unsafe {
            let ptr = platform.realloc(None, 32).expect("realloc(NULL, 32)");
            platform.free(ptr);
        }
    }

    #[test]
    fn test_realloc_to_zero_keeps_a_live_block() {
        let platform = LibcAllocator::new();
        unsafe {
            let ptr = platform.malloc(16).expect("malloc(16)");
            let shrunk = platform.realloc(Some(ptr), 0).expect("realloc(p, 0)");
            platform.free(shrunk);
        }
    }

    #[test]
    fn test_thread_safety_markers() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LibcAllocator>();
        assert_sync::<LibcAllocator>();
    }
}
