//! The packed slot word.
//!
//! A slot's entire state lives in one 128-bit word so that every state
//! transition is a single compare-and-swap:
//!
//! ```text
//! bits   0..64   handle      raw host token, 0 = empty slot
//! bits  64..96   tag         full 32-bit hash of the cached string
//! bits  96..128  pins        readers currently holding the entry
//! ```
//!
//! The empty slot is the all-zero word. Packing the pin count next to the
//! handle is what makes eviction safe: a writer's compare-and-swap carries
//! `pins == 0` in its expected value, so it cannot succeed while any reader
//! still holds the outgoing handle.

use crate::host::Handle;

const TAG_SHIFT: u32 = 64;
const PINS_SHIFT: u32 = 96;
const HANDLE_MASK: u128 = (1 << TAG_SHIFT) - 1;

/// One slot's decoded state: the cached handle, its hash tag, and the number
/// of readers pinning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    /// The cached string, or `None` for an empty slot.
    pub handle: Option<Handle>,
    /// Hash of the cached string. Meaningless while `handle` is `None`.
    pub tag: u32,
    /// Readers currently between pin and unpin on this entry.
    pub pins: u32,
}

impl CacheEntry {
    /// The empty slot.
    pub const EMPTY: CacheEntry = CacheEntry {
        handle: None,
        tag: 0,
        pins: 0,
    };

    /// An unpinned entry caching `handle` under `tag`.
    #[inline]
    pub fn occupied(handle: Handle, tag: u32) -> CacheEntry {
        CacheEntry {
            handle: Some(handle),
            tag,
            pins: 0,
        }
    }

    /// Whether the slot holds a string.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.handle.is_some()
    }

    /// This entry with one more pin.
    #[inline]
    pub fn pinned(self) -> CacheEntry {
        debug_assert!(self.is_occupied());
        CacheEntry {
            pins: self.pins + 1,
            ..self
        }
    }

    /// This entry with one pin removed.
    #[inline]
    pub fn unpinned(self) -> CacheEntry {
        debug_assert!(self.pins > 0);
        CacheEntry {
            pins: self.pins - 1,
            ..self
        }
    }

    /// Encode into the slot word.
    #[inline]
    pub fn pack(self) -> u128 {
        let handle = self.handle.map_or(0, Handle::raw);
        u128::from(handle)
            | (u128::from(self.tag) << TAG_SHIFT)
            | (u128::from(self.pins) << PINS_SHIFT)
    }

    /// Decode from the slot word.
    #[inline]
    pub fn unpack(word: u128) -> CacheEntry {
        CacheEntry {
            handle: Handle::from_raw((word & HANDLE_MASK) as u64),
            tag: (word >> TAG_SHIFT) as u32,
            pins: (word >> PINS_SHIFT) as u32,
        }
    }
}
