//! A concurrent, fixed-capacity interning cache for host-owned strings.
//!
//! Runtimes that mint immutable strings across an ownership boundary pay an
//! allocation every time the same value crosses. [`StringCache`] maps raw
//! character data to one canonical host handle so repeated requests for a
//! value-equal string share a single instance. One cache keeps two
//! direct-mapped tables, one for UTF-16 strings and one for byte strings,
//! and counts hits, misses, evictions, and length-based skips.
//!
//! # Architecture
//!
//! ```text
//! +---------------------------------------------------+
//! |                    StringCache                    |
//! |                                                   |
//! |  +--------------------+  +--------------------+   |
//! |  | SlotTable (UTF-16) |  | SlotTable (bytes)  |   |
//! |  |   256 x Slot       |  |   256 x Slot       |   |
//! |  +--------------------+  +--------------------+   |
//! |     Slot = one atomic word:                       |
//! |       { handle | hash tag | pin count }           |
//! |                                                   |
//! |  CacheCounters { hits misses evictions skips }    |
//! +---------------------------------------------------+
//!        |                                  ^
//!        v                                  |
//!   HostEnv / StringEnv   create, acquire_durable,
//!                         acquire_local, release,
//!                         value_equals
//! ```
//!
//! The cache owns no string storage. All allocation, reference counting,
//! and equality checking is delegated to a host through the traits in
//! [`host`]; [`HeapHost`] is a ready-made in-process host.
//!
//! # Concurrency
//!
//! Interning takes no lock. A reader pins a slot's entry with a
//! compare-and-swap before borrowing its handle; a writer can replace an
//! entry only with a compare-and-swap whose expected value is unpinned, so
//! a successful eviction proves no reader still holds the outgoing handle.
//! Losing a race is never an error: the loser returns a correct, uncached
//! handle and leaves the slot to the winner. Population is best-effort by
//! design.
//!
//! # Example
//!
//! ```
//! use pincache::{HeapHost, HostEnv, StringCache, StringEnv};
//!
//! let host = HeapHost::new();
//! let cache = StringCache::new();
//!
//! let first = cache.intern_bytes(&host, b"interned").unwrap();
//! let again = cache.intern_bytes(&host, b"interned").unwrap();
//! assert!(host.value_equals(again, b"interned".as_slice()));
//! assert_eq!(cache.hits(), 1);
//!
//! // Callers own returned handles; the cache owns what it stored.
//! host.release(first);
//! host.release(again);
//! cache.teardown(&host);
//! assert_eq!(host.live_refs(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod error;
mod hash;
mod heap_host;
pub mod host;
mod metrics;
mod slot;
mod table;

pub use error::ConfigError;
pub use hash::{CodeUnit, hash_bytes, hash_utf16};
pub use heap_host::{AllocFailed, HeapHost};
pub use host::{Handle, HostEnv, StringEnv};
pub use metrics::CounterSnapshot;

use log::{debug, warn};

use crate::entry::CacheEntry;
use crate::metrics::CacheCounters;
use crate::slot::Slot;
use crate::table::SlotTable;

/// Default number of slots in each of the two tables.
pub const DEFAULT_TABLE_SIZE: usize = 256;

/// Default length, in code units, at which a string bypasses the cache.
pub const DEFAULT_MAX_CACHED_LEN: usize = 1024;

/// A concurrent interning cache over host-owned strings.
///
/// Construct one with [`StringCache::new`] for the default geometry or
/// through [`StringCache::builder`]. Any number of threads may intern
/// concurrently. Retire the cache with [`StringCache::teardown`] so the
/// stored handles go back to the host; a cache dropped while still
/// populated logs a warning and leaks its references.
#[derive(Debug)]
pub struct StringCache {
    utf16: SlotTable,
    bytes: SlotTable,
    counters: CacheCounters,
    max_cached_len: usize,
}

impl StringCache {
    /// A cache with [`DEFAULT_TABLE_SIZE`] slots per table and the
    /// [`DEFAULT_MAX_CACHED_LEN`] length threshold.
    pub fn new() -> StringCache {
        StringCache {
            utf16: SlotTable::new(DEFAULT_TABLE_SIZE),
            bytes: SlotTable::new(DEFAULT_TABLE_SIZE),
            counters: CacheCounters::new(),
            max_cached_len: DEFAULT_MAX_CACHED_LEN,
        }
    }

    /// A builder for a cache with custom geometry.
    pub fn builder() -> StringCacheBuilder {
        StringCacheBuilder::new()
    }

    /// Intern a UTF-16 string.
    ///
    /// Returns a handle the caller owns and must eventually release to the
    /// host. The handle's string is value-equal to `units`; whether it came
    /// from the table, newly populated it, or bypassed it entirely shows up
    /// only in the counters.
    ///
    /// # Errors
    ///
    /// Propagates the host's error when a fresh string cannot be created.
    /// Failed reference acquisitions are absorbed instead: the call falls
    /// back to an uncached string.
    #[inline]
    pub fn intern_utf16<E: StringEnv<u16>>(
        &self,
        env: &E,
        units: &[u16],
    ) -> Result<Handle, E::Error> {
        self.intern_units(env, &self.utf16, units)
    }

    /// Intern a byte string.
    ///
    /// Byte strings live in their own table: a byte string and a UTF-16
    /// string spelling the same text are distinct entries. Ownership and
    /// errors are as for [`intern_utf16`](StringCache::intern_utf16).
    #[inline]
    pub fn intern_bytes<E: StringEnv<u8>>(
        &self,
        env: &E,
        bytes: &[u8],
    ) -> Result<Handle, E::Error> {
        self.intern_units(env, &self.bytes, bytes)
    }

    /// Release every currently unpinned entry back to the host.
    ///
    /// Best-effort: entries pinned by an in-flight intern, or slots that
    /// lose a race mid-sweep, are skipped and stay cached. Clearing is not
    /// an eviction and leaves the counters untouched.
    pub fn clear<E: HostEnv>(&self, env: &E) {
        let mut released = 0usize;
        for slot in self.utf16.iter().chain(self.bytes.iter()) {
            if let Some(handle) = slot.try_clear() {
                env.release(handle);
                released += 1;
            }
        }
        debug!("cache clear released {released} cached strings");
    }

    /// Retire the cache, releasing every cached handle.
    ///
    /// Taking the cache by value proves no other thread can be mid-intern,
    /// so the sweep is unconditional where [`clear`](StringCache::clear) is
    /// best-effort.
    pub fn teardown<E: HostEnv>(mut self, env: &E) {
        let mut released = 0usize;
        for slot in self.utf16.iter_mut().chain(self.bytes.iter_mut()) {
            if let Some(handle) = slot.take() {
                env.release(handle);
                released += 1;
            }
        }
        debug!("cache teardown released {released} cached strings");
    }

    /// Intern calls served from the table.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.counters.hits()
    }

    /// Intern calls that created a fresh string.
    #[inline]
    pub fn misses(&self) -> u64 {
        self.counters.misses()
    }

    /// Entries displaced from their slot by a colliding miss.
    #[inline]
    pub fn evictions(&self) -> u64 {
        self.counters.evictions()
    }

    /// Intern calls that bypassed the table on length.
    #[inline]
    pub fn skips(&self) -> u64 {
        self.counters.skips()
    }

    /// A consistent-enough snapshot of all four counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Number of slots in each table.
    pub fn table_size(&self) -> usize {
        self.utf16.size()
    }

    /// Length, in code units, at which interning bypasses the cache.
    pub fn max_cached_len(&self) -> usize {
        self.max_cached_len
    }

    fn intern_units<U, E>(
        &self,
        env: &E,
        table: &SlotTable,
        units: &[U],
    ) -> Result<Handle, E::Error>
    where
        U: CodeUnit,
        E: StringEnv<U>,
    {
        if units.len() >= self.max_cached_len {
            // Long strings churn slots without ever amortizing; hand them
            // straight to the host.
            self.counters.record_skip();
            return env.create(units);
        }

        let hash = hash::hash_units(units);
        let slot = table.slot_for(hash);

        let witness = match self.try_hit(env, slot, hash, units) {
            Ok(local) => return Ok(local),
            Err(witness) => witness,
        };
        self.intern_miss(env, slot, witness, hash, units)
    }

    /// The optimistic path: pin the slot's entry, borrow a local reference
    /// to it, and check true equality.
    ///
    /// `Err` carries the slot state the miss path must use as its CAS
    /// expectation. After a pinned fallthrough that witness still includes
    /// this call's own pin, so the miss path will leave the slot alone
    /// rather than displace an entry other readers are converging on.
    fn try_hit<U, E>(
        &self,
        env: &E,
        slot: &Slot,
        hash: u32,
        units: &[U],
    ) -> Result<Handle, CacheEntry>
    where
        U: CodeUnit,
        E: StringEnv<U>,
    {
        let (pinned, cached) = slot.try_pin(slot.load(), hash)?;

        // The pin keeps `cached` alive while the host mints a fresh
        // reference to it.
        let local = env.acquire_local(cached);
        let witness = slot.unpin(pinned);

        let Some(local) = local else {
            // Local reference budget exhausted; recover through a fresh
            // creation on the miss path.
            return Err(witness);
        };

        if env.value_equals(local, units) {
            self.counters.record_hit();
            return Ok(local);
        }

        // Full hash match, different contents. The entry stays put and the
        // call falls through as a miss.
        env.release(local);
        Err(witness)
    }

    fn intern_miss<U, E>(
        &self,
        env: &E,
        slot: &Slot,
        witness: CacheEntry,
        hash: u32,
        units: &[U],
    ) -> Result<Handle, E::Error>
    where
        U: CodeUnit,
        E: StringEnv<U>,
    {
        self.counters.record_miss();

        let local = env.create(units)?;

        // Without a durable reference the string cannot outlive the caller,
        // so it stays uncached.
        let Some(durable) = env.acquire_durable(local) else {
            return Ok(local);
        };

        if witness.pins == 0 {
            match slot.try_replace(witness, CacheEntry::occupied(durable, hash)) {
                Ok(old) => {
                    if let Some(evicted) = old.handle {
                        // The expectation carried pins == 0, so no reader
                        // can still reach the displaced handle.
                        env.release(evicted);
                        self.counters.record_eviction();
                    }
                }
                Err(_) => env.release(durable),
            }
        } else {
            env.release(durable);
        }

        Ok(local)
    }
}

impl Default for StringCache {
    fn default() -> StringCache {
        StringCache::new()
    }
}

impl Drop for StringCache {
    fn drop(&mut self) {
        let leaked = self
            .utf16
            .iter()
            .chain(self.bytes.iter())
            .filter(|slot| slot.load().is_occupied())
            .count();
        if leaked > 0 {
            warn!("string cache dropped without teardown; {leaked} host references leak");
        }
    }
}

/// Builder for a [`StringCache`] with non-default geometry.
///
/// ```
/// use pincache::StringCache;
///
/// let cache = StringCache::builder()
///     .table_size(1024)
///     .max_cached_len(256)
///     .build()
///     .unwrap();
/// assert_eq!(cache.table_size(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct StringCacheBuilder {
    table_size: usize,
    max_cached_len: usize,
}

impl StringCacheBuilder {
    /// A builder starting from the default geometry.
    pub fn new() -> StringCacheBuilder {
        StringCacheBuilder {
            table_size: DEFAULT_TABLE_SIZE,
            max_cached_len: DEFAULT_MAX_CACHED_LEN,
        }
    }

    /// Set the number of slots in each table. Must be a nonzero power of
    /// two; [`build`](StringCacheBuilder::build) rejects anything else.
    pub fn table_size(mut self, slots: usize) -> Self {
        self.table_size = slots;
        self
    }

    /// Set the length, in code units, at which interning bypasses the
    /// cache.
    pub fn max_cached_len(mut self, units: usize) -> Self {
        self.max_cached_len = units;
        self
    }

    /// Build the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TableSizeNotPowerOfTwo`] when the requested
    /// table size cannot be used for mask-based addressing.
    pub fn build(self) -> Result<StringCache, ConfigError> {
        if !self.table_size.is_power_of_two() {
            return Err(ConfigError::TableSizeNotPowerOfTwo(self.table_size));
        }
        debug!(
            "string cache built: {} slots per table, max cached length {} units, lock-free slots: {}",
            self.table_size,
            self.max_cached_len,
            Slot::is_lock_free(),
        );
        Ok(StringCache {
            utf16: SlotTable::new(self.table_size),
            bytes: SlotTable::new(self.table_size),
            counters: CacheCounters::new(),
            max_cached_len: self.max_cached_len,
        })
    }
}

impl Default for StringCacheBuilder {
    fn default() -> StringCacheBuilder {
        StringCacheBuilder::new()
    }
}
