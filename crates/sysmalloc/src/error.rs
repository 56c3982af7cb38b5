//! Error types for nebula-sysmalloc
//!
//! Allocation exhaustion is never an error here: the allocation primitives
//! report it as `None`. Errors only come out of the lock lifecycle,
//! registration and configuration.

use thiserror::Error;

// ============================================================================
// Main Error Types
// ============================================================================

/// Errors raised while bringing a memory backend into service
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Lock Errors ---
    #[error("Could not allocate shared memory lock storage ({size} bytes)")]
    LockStorage { size: usize },

    // --- Registration Errors ---
    #[error("Cannot register backend '{backend}' with the {pool} pool: {reason}")]
    Registration {
        backend: String,
        pool: PoolKind,
        reason: String,
    },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Which memory pool an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Process-local pool, no synchronization
    Private,
    /// Pool visible across execution contexts, guarded by the shared lock
    Shared,
}

impl core::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockStorage { .. } => "MEM:LOCK:STORAGE",
            Self::Registration { .. } => "MEM:REGISTRY:REJECTED",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
        }
    }

    /// Integer status reported to hosts that speak the `0 / negative` protocol
    ///
    /// Always negative.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::LockStorage { .. } => -2,
            Self::Registration { .. } => -3,
            Self::InvalidConfig { .. } => -4,
        }
    }

    /// Whether the failure leaves the target pool unusable
    ///
    /// Lock failures are fatal: the shared pool cannot be used without its lock.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LockStorage { .. } | Self::Registration { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create lock storage exhaustion error
    pub fn lock_storage(size: usize) -> Self {
        Self::LockStorage { size }
    }

    /// Create registration rejected error
    pub fn registration(backend: &str, pool: PoolKind, reason: &str) -> Self {
        Self::Registration {
            backend: backend.to_string(),
            pool,
            reason: reason.to_string(),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory backend operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Map a registration result onto the host's integer protocol
///
/// `0` on success, a negative value on failure.
#[must_use]
pub fn status_code(result: &MemoryResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.status_code(),
    }
}

// ============================================================================
// Tests
// ============================================================================
