//! Shared-pool lock and its lifecycle
//!
//! The shared pool is guarded by one process-wide mutex that is created
//! lazily the first time a shared backend is registered and torn down at
//! shutdown. [`PoolLock`] is the seam registration depends on, so a fake lock
//! can stand in for [`ShmLock`] in tests.
//!
//! # State machine
//!
//! ```text
//!              create()                destroy()
//! Uncreated ─────────────▶ Created ─────────────▶ Destroyed
//!     ▲  │                  │   ▲                     │
//!     └──┘ destroy()        └───┘ create()            │ create()
//!          (no-op)              (no-op)               ▼
//!                                                  Created
//! ```
//!
//! The mutex lives in storage obtained from the platform allocator and is
//! initialized once. Destroy keeps that storage and a later `create` revives
//! the same mutex. Destroying a lock that is still held is refused, so a
//! holder can always release what it acquired.

use core::ptr::NonNull;

use parking_lot::lock_api::RawMutex as _;
use parking_lot::{Mutex, RawMutex};
use tracing::{debug, error, warn};

use crate::error::{MemoryError, MemoryResult};
use crate::platform::{LibcAllocator, PlatformAllocator};

/// Lifecycle state of a [`PoolLock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// No storage, never initialized
    Uncreated,
    /// Initialized and usable
    Created,
    /// Torn down; storage kept for a later `create`
    Destroyed,
}

/// Mutual exclusion for a shared memory pool
pub trait PoolLock: Send + Sync {
    /// Create the lock; a no-op success when it already exists
    fn create(&self) -> MemoryResult<()>;

    /// Block until exclusive ownership is obtained
    fn acquire(&self);

    /// Release ownership obtained by [`acquire`](Self::acquire)
    fn release(&self);

    /// Tear the lock down; a no-op unless it is `Created` and not held
    fn destroy(&self);

    /// Current lifecycle state
    fn state(&self) -> LockState;
}

/// Scoped ownership of a [`PoolLock`]
///
/// Acquires on construction and releases on drop, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, L: PoolLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: PoolLock + ?Sized> LockGuard<'a, L> {
    /// Acquire `lock` for the lifetime of the guard
    pub fn new(lock: &'a L) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl<L: PoolLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

struct LockSlot {
    state: LockState,
    storage: Option<NonNull<RawMutex>>,
}

// SAFETY: the storage pointer is only dereferenced as a `RawMutex`, which is
// Send + Sync, and the slot itself is only reached through a `Mutex`.
unsafe impl Send for LockSlot {}

/// The process-wide shared memory lock
///
/// `P` supplies the lock's storage; production uses the C allocator, tests
/// substitute one that can run out.
pub struct ShmLock<P: PlatformAllocator = LibcAllocator> {
    platform: P,
    slot: Mutex<LockSlot>,
}

impl ShmLock<LibcAllocator> {
    /// Creates an uncreated lock backed by the C allocator
    #[must_use]
    pub fn new() -> Self {
        Self::with_platform(LibcAllocator::new())
    }
}

impl Default for ShmLock<LibcAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PlatformAllocator> ShmLock<P> {
    /// Creates an uncreated lock whose storage comes from `platform`
    pub fn with_platform(platform: P) -> Self {
        Self {
            platform,
            slot: Mutex::new(LockSlot {
                state: LockState::Uncreated,
                storage: None,
            }),
        }
    }

    /// Acquire the lock for the lifetime of the returned guard
    pub fn guard(&self) -> LockGuard<'_, Self> {
        LockGuard::new(self)
    }

    /// The mutex, if the lock is `Created`
    fn raw(&self) -> Option<&RawMutex> {
        let slot = self.slot.lock();
        if slot.state != LockState::Created {
            return None;
        }
        // SAFETY: storage is initialized while Created and is only released in
        // Drop, so it outlives `&self`.
        slot.storage.map(|storage| unsafe { &*storage.as_ptr() })
    }
}

impl<P: PlatformAllocator> PoolLock for ShmLock<P> {
    fn create(&self) -> MemoryResult<()> {
        let mut slot = self.slot.lock();
        if slot.state == LockState::Created {
            debug!("shared memory lock already initialized");
            return Ok(());
        }

        // Kept storage already holds a live mutex. Writing INIT over it would
        // drop the state of a thread that still holds or waits on it.
        if slot.storage.is_none() {
            let size = size_of::<RawMutex>();
            let Some(raw) = self.platform.malloc(size) else {
                error!(severity = "critical", size, "could not allocate lock");
                return Err(MemoryError::lock_storage(size));
            };
            debug_assert_eq!(raw.as_ptr() as usize % align_of::<RawMutex>(), 0);
            let storage = raw.cast::<RawMutex>();
            // SAFETY: storage is fresh, suitably sized and aligned for a
            // RawMutex, and nothing else references it yet.
            unsafe { storage.as_ptr().write(RawMutex::INIT) };
            slot.storage = Some(storage);
        }
        slot.state = LockState::Created;
        debug!("shared memory lock initialized");
        Ok(())
    }

    fn acquire(&self) {
        match self.raw() {
            Some(raw) => raw.lock(),
            None => error!("acquire on a shared memory lock that is not initialized"),
        }
    }

    fn release(&self) {
        let Some(raw) = self.raw() else {
            error!("release on a shared memory lock that is not initialized");
            return;
        };
        if !raw.is_locked() {
            warn!("release on a shared memory lock that is not held");
            return;
        }
        // SAFETY: the lock is held; the host pairs every release with an acquire.
        unsafe { raw.unlock() };
    }

    fn destroy(&self) {
        let mut slot = self.slot.lock();
        if slot.state != LockState::Created {
            return;
        }
        // SAFETY: storage is initialized while Created and outlives this call.
        let held = slot
            .storage
            .is_some_and(|storage| unsafe { (*storage.as_ptr()).is_locked() });
        if held {
            warn!("refusing to destroy a shared memory lock that is still held");
            return;
        }
        debug!("destroying the shared memory lock");
        slot.state = LockState::Destroyed;
    }

    fn state(&self) -> LockState {
        self.slot.lock().state
    }
}

impl<P: PlatformAllocator> Drop for ShmLock<P> {
    fn drop(&mut self) {
        if let Some(storage) = self.slot.get_mut().storage.take() {
            // SAFETY: storage came from this platform and nothing borrows it
            // once the lock itself is being dropped.
            unsafe { self.platform.free(storage.cast()) };
        }
    }
}

impl<P: PlatformAllocator> core::fmt::Debug for ShmLock<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShmLock")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
