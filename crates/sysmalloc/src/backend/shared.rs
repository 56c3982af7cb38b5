//! Shared-pool flavour of the system allocator backend

use core::ptr::NonNull;
use std::sync::Arc;

use super::{MemInfo, MemoryBackend, ModuleStats, SharedMemoryBackend, SysMalloc};
use crate::lock::PoolLock;
use crate::platform::{LibcAllocator, PlatformAllocator};

/// [`SysMalloc`] wired to the shared-pool lock
///
/// Allocation entries forward to the platform allocator exactly as in the
/// private pool; `glock`/`gunlock` drive the lock handed in at registration.
pub struct SysShm<P: PlatformAllocator = LibcAllocator> {
    inner: SysMalloc<P>,
    lock: Arc<dyn PoolLock>,
}

impl<P: PlatformAllocator> SysShm<P> {
    /// Wrap a backend with the lock guarding its pool
    pub fn new(inner: SysMalloc<P>, lock: Arc<dyn PoolLock>) -> Self {
        Self { inner, lock }
    }

    /// The lock bound to this backend
    pub fn lock(&self) -> &Arc<dyn PoolLock> {
        &self.lock
    }

    /// The unsynchronized backend underneath
    pub fn inner(&self) -> &SysMalloc<P> {
        &self.inner
    }
}

impl<P: PlatformAllocator> core::fmt::Debug for SysShm<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SysShm")
            .field("name", &self.inner.name())
            .field("lock", &self.lock.state())
            .finish()
    }
}

impl<P: PlatformAllocator> MemoryBackend for SysShm<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[inline]
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.inner.allocate(size)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        self.inner.allocate_zeroed(size)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.free(ptr) }
    }

    #[inline]
    unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.reallocate(ptr, size) }
    }

    #[inline]
    unsafe fn reallocate_or_free(
        &self,
        ptr: Option<NonNull<u8>>,
        size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.reallocate_or_free(ptr, size) }
    }

    fn status(&self) {
        self.inner.status();
    }

    fn check(&self) {
        self.inner.check();
    }

    fn info(&self, out: &mut MemInfo) {
        self.inner.info(out);
    }

    fn available(&self) -> usize {
        self.inner.available()
    }

    fn sums(&self) {
        self.inner.sums();
    }

    fn get_stats(&self) -> Option<ModuleStats> {
        self.inner.get_stats()
    }

    fn free_stats(&self, root: Option<ModuleStats>) {
        self.inner.free_stats(root);
    }
}

impl<P: PlatformAllocator> SharedMemoryBackend for SysShm<P> {
    #[inline]
    unsafe fn resize(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.resize(ptr, size) }
    }

    fn glock(&self) {
        self.lock.acquire();
    }

    fn gunlock(&self) {
        self.lock.release();
    }
}

/// Scoped critical section over a shared backend's lock entries
///
/// Works on `dyn SharedMemoryBackend`, which is how hosts hold registered
/// backends.
#[must_use = "the shared pool is unlocked as soon as the guard is dropped"]
pub struct ShmGuard<'a, B: SharedMemoryBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: SharedMemoryBackend + ?Sized> ShmGuard<'a, B> {
    /// Enter the critical section
    pub fn new(backend: &'a B) -> Self {
        backend.glock();
        Self { backend }
    }

    /// The locked backend
    pub fn backend(&self) -> &B {
        self.backend
    }
}

impl<B: SharedMemoryBackend + ?Sized> Drop for ShmGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.gunlock();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::lock::{LockState, ShmLock};

    #[derive(Default)]
    struct CountingLock {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl PoolLock for CountingLock {
        fn create(&self) -> crate::MemoryResult<()> {
            Ok(())
        }

        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }

        fn destroy(&self) {}

        fn state(&self) -> LockState {
            LockState::Created
        }
    }

    #[test]
    fn test_lock_entries_drive_the_bound_lock() {
        let lock = Arc::new(CountingLock::default());
        let shm = SysShm::new(SysMalloc::default(), lock.clone());

        shm.glock();
        shm.gunlock();
        {
            let _guard = ShmGuard::new(&shm);
        }

        assert_eq!(lock.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(lock.released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_guard_over_trait_object() {
        let lock = Arc::new(ShmLock::new());
        lock.create().unwrap();
        let shm: Arc<dyn SharedMemoryBackend> = Arc::new(SysShm::new(SysMalloc::default(), lock));

        let guard = ShmGuard::new(shm.as_ref());
        let ptr = guard.backend().allocate_unlocked(32).expect("allocate_unlocked");
        unsafe { guard.backend().free_unlocked(ptr) };
    }

    #[test]
    fn test_resize_returns_usable_block() {
        let shm = SysShm::new(SysMalloc::default(), Arc::new(ShmLock::new()));
        unsafe {
            let ptr = shm.allocate(16).expect("allocate");
            let resized = shm.resize(Some(ptr), 4096).expect("resize");
            resized.as_ptr().write_bytes(0xEE, 4096);
            shm.free(resized);
        }
    }

    #[test]
    fn test_name_matches_private_backend() {
        let shm = SysShm::new(SysMalloc::new("sys_malloc"), Arc::new(ShmLock::new()));
        assert_eq!(shm.name(), shm.inner().name());
        assert_eq!(shm.name(), "sys_malloc");
    }
}
