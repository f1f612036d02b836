//! Configuration errors.

use std::fmt;

/// Errors from [`StringCacheBuilder::build`](crate::StringCacheBuilder::build).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested table size cannot be used for bucket addressing, which
    /// masks the low bits of a hash and therefore needs a nonzero power of
    /// two.
    TableSizeNotPowerOfTwo(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TableSizeNotPowerOfTwo(size) => {
                write!(f, "table size must be a nonzero power of two, got {size}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
