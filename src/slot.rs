//! One cache slot and its compare-and-swap protocols.
//!
//! A [`Slot`] is a single [`AtomicU128`] holding a packed
//! [`CacheEntry`]. Readers pin, writers replace, and maintenance clears, all
//! through CAS transitions on that one word. There is no lock and no retry
//! obligation anywhere: when a CAS loses, the loser walks away with a
//! correct result and the slot keeps whatever the winner installed.
//!
//! Ownership rule: the thread whose CAS removes an occupied entry (replace,
//! clear, or teardown) owns the outgoing handle and must release it to the
//! host. No other thread may release a handle it found in a slot.

use portable_atomic::{AtomicU128, Ordering};

use crate::entry::CacheEntry;
use crate::host::Handle;

/// A single slot: one atomic word a string maps to by hash.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    cell: AtomicU128,
}

impl Slot {
    /// An empty slot.
    pub fn new() -> Slot {
        Slot {
            cell: AtomicU128::new(CacheEntry::EMPTY.pack()),
        }
    }

    /// Whether slot words compare-and-swap natively on this target rather
    /// than through the striped-lock fallback.
    pub fn is_lock_free() -> bool {
        AtomicU128::is_lock_free()
    }

    /// Optimistic snapshot of the slot.
    ///
    /// Relaxed is enough here: every decision made from the snapshot is
    /// validated by a later CAS before it takes effect.
    #[inline]
    pub fn load(&self) -> CacheEntry {
        CacheEntry::unpack(self.cell.load(Ordering::Relaxed))
    }

    /// Pin the slot's entry if it still carries `tag` and a handle.
    ///
    /// On success the returned entry holds this reader's pin and the handle
    /// cannot be released until [`unpin`](Slot::unpin). The loop tolerates
    /// pin-count churn from other readers but gives up as soon as the slot
    /// stops matching `tag`, returning the current entry for the caller's
    /// miss path.
    pub fn try_pin(
        &self,
        mut seen: CacheEntry,
        tag: u32,
    ) -> Result<(CacheEntry, Handle), CacheEntry> {
        loop {
            let handle = match seen.handle {
                Some(handle) if seen.tag == tag => handle,
                _ => return Err(seen),
            };
            let pinned = seen.pinned();
            match self.cell.compare_exchange_weak(
                seen.pack(),
                pinned.pack(),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok((pinned, handle)),
                Err(current) => seen = CacheEntry::unpack(current),
            }
        }
    }

    /// Drop the pin taken by a successful [`try_pin`](Slot::try_pin).
    ///
    /// Returns the entry as it was just before the decrement, own pin
    /// included. Callers that fall through to a miss keep that witness as
    /// the expected value for [`try_replace`](Slot::try_replace); since it
    /// carries `pins >= 1`, a fallthrough never repopulates the slot.
    pub fn unpin(&self, mut seen: CacheEntry) -> CacheEntry {
        loop {
            let unpinned = seen.unpinned();
            match self.cell.compare_exchange_weak(
                seen.pack(),
                unpinned.pack(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return seen,
                Err(current) => seen = CacheEntry::unpack(current),
            }
        }
    }

    /// Install `next` over the expected, unpinned `witness` in one strong
    /// CAS.
    ///
    /// On success the caller owns the handle of the returned prior entry,
    /// if any. On failure the slot changed since the witness was taken and
    /// the caller keeps its own references instead.
    pub fn try_replace(
        &self,
        witness: CacheEntry,
        next: CacheEntry,
    ) -> Result<CacheEntry, CacheEntry> {
        debug_assert_eq!(witness.pins, 0);
        match self.cell.compare_exchange(
            witness.pack(),
            next.pack(),
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => Ok(witness),
            Err(current) => Err(CacheEntry::unpack(current)),
        }
    }

    /// Empty the slot if it is occupied and unpinned right now.
    ///
    /// Returns the handle the caller now owns, or `None` if the slot was
    /// empty, pinned, or lost a race. No retry; clearing is best-effort by
    /// contract.
    pub fn try_clear(&self) -> Option<Handle> {
        let seen = self.load();
        let handle = seen.handle?;
        if seen.pins != 0 {
            return None;
        }
        match self.cell.compare_exchange(
            seen.pack(),
            CacheEntry::EMPTY.pack(),
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => Some(handle),
            Err(_) => None,
        }
    }

    /// Take the slot's handle under exclusive access, leaving it empty.
    ///
    /// `&mut self` proves no reader or writer is mid-protocol, so pins are
    /// ignored and no CAS is needed.
    pub fn take(&mut self) -> Option<Handle> {
        let entry = CacheEntry::unpack(*self.cell.get_mut());
        *self.cell.get_mut() = CacheEntry::EMPTY.pack();
        entry.handle
    }
}
