//! Intern outcome counters.
//!
//! Every intern call lands in exactly one of hit, miss, or skip; evictions
//! count displaced entries on top of the miss that caused them. Updates are
//! relaxed: the counters are observational and never gate a cache decision,
//! so cross-counter reads may be momentarily inconsistent under load.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared by all interning threads.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    skips: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> CacheCounters {
        CacheCounters::default()
    }

    /// A cached handle was returned.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A fresh string had to be created.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A miss displaced an older entry from its slot.
    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// An over-length string bypassed the table entirely.
    #[inline]
    pub fn record_skip(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skips(&self) -> u64 {
        self.skips.load(Ordering::Relaxed)
    }

    /// Read all four counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            skips: self.skips(),
        }
    }
}

/// Counter values read at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Intern calls served from the table.
    pub hits: u64,
    /// Intern calls that created a fresh string.
    pub misses: u64,
    /// Entries displaced from their slot by a miss.
    pub evictions: u64,
    /// Intern calls that bypassed the table on length.
    pub skips: u64,
}

impl CounterSnapshot {
    /// Hit rate over the calls that consulted the table, as a percentage.
    /// Skips never consult the table and are excluded. Returns 0.0 when no
    /// lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        100.0 * self.hits as f64 / lookups as f64
    }

    /// Counter deltas between this snapshot and an earlier one, saturating
    /// at zero if `earlier` is actually newer.
    pub fn diff(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            evictions: self.evictions.saturating_sub(earlier.evictions),
            skips: self.skips.saturating_sub(earlier.skips),
        }
    }
}
