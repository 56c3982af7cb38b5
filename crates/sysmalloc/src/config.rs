//! Backend configuration

use crate::error::{MemoryError, MemoryResult};

/// Name every `sys_malloc` backend registers under unless configured otherwise
pub const SYS_MALLOC_NAME: &str = "sys_malloc";

/// Capacity reported by `available()`
///
/// The platform allocator exposes no free-memory figure, so the backend
/// answers with this fixed value instead of a measurement. It is never zero:
/// hosts treat zero as "allocation will fail".
pub const AVAILABLE_SENTINEL: usize = 1024 * 1024 * 1024;

/// Configuration for the system allocator backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysMallocConfig {
    /// Backend name, identical for the private and shared pools
    pub name: String,

    /// Value returned by `available()` for the lifetime of the backend
    pub available: usize,
}

impl Default for SysMallocConfig {
    fn default() -> Self {
        Self {
            name: SYS_MALLOC_NAME.to_string(),
            available: AVAILABLE_SENTINEL,
        }
    }
}

impl SysMallocConfig {
    /// Default configuration under a different backend name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Override the reported availability figure
    #[must_use = "builder methods must be chained or built"]
    pub fn with_available(mut self, available: usize) -> Self {
        self.available = available;
        self
    }

    /// Check the configuration before a backend is built from it
    pub fn validate(&self) -> MemoryResult<()> {
        if self.name.trim().is_empty() {
            return Err(MemoryError::invalid_config("backend name must not be empty"));
        }
        if self.available == 0 {
            return Err(MemoryError::invalid_config(
                "available capacity must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SysMallocConfig::default();
        assert_eq!(config.name, "sys_malloc");
        assert_eq!(config.available, 1 << 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SysMallocConfig::named("sys_shm").with_available(4096);
        assert_eq!(config.name, "sys_shm");
        assert_eq!(config.available, 4096);
    }

    #[test]
    fn test_validation() {
        assert!(SysMallocConfig::named("  ").validate().is_err());
        assert!(SysMallocConfig::default().with_available(0).validate().is_err());
    }
}
