//! String hashing shared with the host runtime.
//!
//! Cache lookups must agree with the host about what a string hashes to, so
//! the recurrence here is the JVM one: `h = 31 * h + unit` over the string's
//! code units, wrapping at 32 bits. A host that caches `String.hashCode`
//! values can hand them straight to the table and get the same bucket this
//! module would compute.
//!
//! Two encodings are supported. UTF-16 input hashes each 16-bit unit as-is;
//! byte input hashes each byte zero-extended, which matches the UTF-16 hash
//! for ASCII data.

mod sealed {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u8 {}
}

/// A code unit the hasher accepts: `u16` for UTF-16 strings, `u8` for raw
/// byte strings.
///
/// The trait is sealed; the two implementations cover both string encodings
/// the cache keeps tables for.
pub trait CodeUnit: sealed::Sealed + Copy {
    /// The unit's contribution to the hash, zero-extended to 32 bits.
    fn widen(self) -> u32;
}

impl CodeUnit for u16 {
    #[inline]
    fn widen(self) -> u32 {
        u32::from(self)
    }
}

impl CodeUnit for u8 {
    #[inline]
    fn widen(self) -> u32 {
        u32::from(self)
    }
}

/// Hash a slice of code units with the shared recurrence.
#[inline]
pub fn hash_units<U: CodeUnit>(units: &[U]) -> u32 {
    let mut hash = 0u32;
    for unit in units {
        hash = hash.wrapping_mul(31).wrapping_add(unit.widen());
    }
    hash
}

/// Hash a UTF-16 string.
#[inline]
pub fn hash_utf16(units: &[u16]) -> u32 {
    hash_units(units)
}

/// Hash a byte string.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    hash_units(bytes)
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_known_values_match_reference_hash() {
        assert_eq!(hash_bytes(b""), 0);
        assert_eq!(hash_bytes(b"a"), 97);
        assert_eq!(hash_bytes(b"ab"), 3105);
        assert_eq!(hash_bytes(b"abc"), 96_354);
        assert_eq!(hash_bytes(b"hello"), 99_162_322);
    }

    #[test]
    fn test_wrapping_matches_reference_overflow() {
        // The reference value is the minimum of the signed 32-bit range,
        // reinterpreted as unsigned.
        assert_eq!(hash_bytes(b"polygenelubricants"), 0x8000_0000);
    }

    #[test]
    fn test_ascii_hashes_agree_across_encodings() {
        assert_eq!(hash_utf16(&utf16("hello")), hash_bytes(b"hello"));
        assert_eq!(hash_utf16(&utf16("")), hash_bytes(b""));
    }

    #[test]
    fn test_wide_units_hash_by_unit_value() {
        assert_eq!(hash_utf16(&[0x0416]), 0x0416);
        assert_eq!(hash_utf16(&[0x0416, 0x0061]), 31 * 0x0416 + 0x0061);
    }

    #[test]
    fn test_distinct_two_unit_strings_can_share_a_hash() {
        // Classic colliding pair under the 31x recurrence.
        assert_eq!(hash_bytes(b"Aa"), hash_bytes(b"BB"));
        assert_ne!(b"Aa", b"BB");
    }
}
