//! Instrumented platform allocators shared by the integration tests

#![allow(dead_code)]

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use nebula_sysmalloc::platform::{LibcAllocator, PlatformAllocator};
use parking_lot::Mutex;

/// libc allocator that records frees and fails on demand
#[derive(Default)]
pub struct RecordingPlatform {
    pub fail_malloc: AtomicBool,
    pub fail_realloc: AtomicBool,
    pub mallocs: AtomicUsize,
    frees: Mutex<Vec<usize>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exhausted() -> Self {
        let platform = Self::default();
        platform.fail_malloc.store(true, Ordering::SeqCst);
        platform
    }

    pub fn set_fail_malloc(&self, fail: bool) {
        self.fail_malloc.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_realloc(&self, fail: bool) {
        self.fail_realloc.store(fail, Ordering::SeqCst);
    }

    /// Number of times `ptr` was handed to `free`
    pub fn free_count(&self, ptr: NonNull<u8>) -> usize {
        let addr = ptr.as_ptr() as usize;
        self.frees.lock().iter().filter(|&&a| a == addr).count()
    }

    pub fn total_frees(&self) -> usize {
        self.frees.lock().len()
    }
}

impl PlatformAllocator for RecordingPlatform {
    fn malloc(&self, size: usize) -> Option<NonNull<u8>> {
        if self.fail_malloc.load(Ordering::SeqCst) {
            return None;
        }
        self.mallocs.fetch_add(1, Ordering::SeqCst);
        LibcAllocator.malloc(size)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        self.frees.lock().push(ptr.as_ptr() as usize);
        unsafe { LibcAllocator.free(ptr) }
    }

    unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        if self.fail_realloc.load(Ordering::SeqCst) {
            return None;
        }
        unsafe { LibcAllocator.realloc(ptr, size) }
    }
}

/// libc allocator that never reuses an address while it is alive
///
/// Freed blocks are parked until the platform is dropped, so every `malloc`
/// returns an address distinct from anything freed before.
#[derive(Default)]
pub struct QuarantinePlatform {
    parked: Mutex<Vec<usize>>,
}

impl QuarantinePlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformAllocator for QuarantinePlatform {
    fn malloc(&self, size: usize) -> Option<NonNull<u8>> {
        LibcAllocator.malloc(size)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        self.parked.lock().push(ptr.as_ptr() as usize);
    }

    unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        unsafe { LibcAllocator.realloc(ptr, size) }
    }
}

impl Drop for QuarantinePlatform {
    fn drop(&mut self) {
        for addr in self.parked.get_mut().drain(..) {
            if let Some(ptr) = NonNull::new(addr as *mut u8) {
                unsafe { LibcAllocator.free(ptr) };
            }
        }
    }
}
