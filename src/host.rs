//! The host environment the cache runs against.
//!
//! The cache never owns string storage. It brokers opaque [`Handle`]s minted
//! by a host runtime (a JVM across a native boundary, or the in-process
//! [`HeapHost`](crate::HeapHost)) and tracks which handle is canonical for a
//! given value. Every allocation, reference-count change, and equality check
//! goes through the traits here.
//!
//! Reference discipline: `create` and both `acquire` calls each mint one
//! reference the receiver must eventually [`release`](HostEnv::release).
//! Handles returned by [`StringCache::intern_utf16`] and
//! [`StringCache::intern_bytes`] are owned by the caller; handles stored in
//! the table are owned by the cache and released on eviction, clear, or
//! teardown.
//!
//! [`StringCache::intern_utf16`]: crate::StringCache::intern_utf16
//! [`StringCache::intern_bytes`]: crate::StringCache::intern_bytes

use std::num::NonZeroU64;

use crate::hash::CodeUnit;

/// An opaque reference to one host-owned string.
///
/// The cache never inspects the value behind a handle; it only stores,
/// compares, and returns the token. Zero is reserved so an empty table slot
/// can be a single all-zero word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Wrap a nonzero host token.
    #[inline]
    pub fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Wrap a raw host token, or `None` if it is the reserved zero value.
    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self::new)
    }

    /// The raw token value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// Reference-count operations every host provides, independent of string
/// encoding.
pub trait HostEnv {
    /// Mint a durable reference to `handle`, one that stays valid until
    /// released, for storing in the table.
    ///
    /// Returns `None` when the host cannot grant one; the caller must treat
    /// the string as uncacheable, not as an error.
    fn acquire_durable(&self, handle: Handle) -> Option<Handle>;

    /// Mint a short-lived reference to `handle` for returning to the caller.
    ///
    /// Returns `None` when the host's local reference budget is exhausted;
    /// the caller falls back to creating a fresh string.
    fn acquire_local(&self, handle: Handle) -> Option<Handle>;

    /// Give back one reference minted by `create` or either `acquire`.
    fn release(&self, handle: Handle);
}

/// String operations for one code-unit encoding.
///
/// A host that stores both UTF-16 and byte strings implements this trait
/// twice, once per unit type, over one shared [`HostEnv`].
pub trait StringEnv<U: CodeUnit>: HostEnv {
    /// Error for a failed creation. Creation failure is the one host fault
    /// the cache propagates to its caller instead of absorbing.
    type Error;

    /// Allocate a host string with exactly these code units and return a
    /// reference the caller owns.
    fn create(&self, units: &[U]) -> Result<Handle, Self::Error>;

    /// Whether the string behind `handle` has exactly these code units.
    fn value_equals(&self, handle: Handle, units: &[U]) -> bool;
}
