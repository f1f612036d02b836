//! Fixed-capacity slot tables with power-of-two addressing.

use crate::slot::Slot;

/// A fixed array of slots addressed by the low bits of a string's hash.
///
/// The table never grows and never probes: each hash maps to exactly one
/// slot, and a new string that maps to an occupied slot displaces the old
/// entry rather than searching for room.
#[derive(Debug)]
pub(crate) struct SlotTable {
    slots: Vec<Slot>,
    mask: usize,
}

impl SlotTable {
    /// Allocate `size` empty slots. `size` must be a nonzero power of two;
    /// the builder validates this before construction.
    pub fn new(size: usize) -> SlotTable {
        debug_assert!(size.is_power_of_two());
        let slots = (0..size).map(|_| Slot::new()).collect();
        SlotTable {
            slots,
            mask: size - 1,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// The slot `hash` maps to.
    #[inline]
    pub fn slot_for(&self, hash: u32) -> &Slot {
        &self.slots[hash as usize & self.mask]
    }

    /// Visit every slot, for maintenance sweeps.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Visit every slot with exclusive access, for teardown.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots.iter_mut()
    }
}
