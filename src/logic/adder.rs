//! Ripple-carry adders.
//!
//! The 16-bit adder is two 8-bit adders chained on a single carry wire.
//! All operands are treated as unsigned; two's-complement interpretation
//! of the result is left to the caller.

use crate::logic::Word;

/// Add two bytes with a carry-in, returning (sum, carry_out).
#[inline]
pub fn add8_with_carry(a: u8, b: u8, c: bool) -> (u8, bool) {
    let (partial, c1) = a.overflowing_add(b);
    let (sum, c2) = partial.overflowing_add(c as u8);
    (sum, c1 | c2)
}

/// Add two 16-bit words with a carry-in, returning (sum, carry_out).
///
/// `sum = (a + b + c) mod 2^16` and `carry` is set iff `a + b + c >= 2^16`.
pub fn add16_with_carry(a: Word, b: Word, c: bool) -> (Word, bool) {
    let (low, mid_carry) = add8_with_carry(a.low_byte(), b.low_byte(), c);
    let (high, carry) = add8_with_carry(a.high_byte(), b.high_byte(), mid_carry);
    (Word::from_bytes(high, low), carry)
}

/// Add two 16-bit words, discarding the carry.
#[inline]
pub fn add16(a: Word, b: Word) -> Word {
    add16_with_carry(a, b, false).0
}

/// Increment a 16-bit word by one, wrapping at 2^16.
#[inline]
pub fn inc16(a: Word) -> Word {
    add16_with_carry(a, Word::ZERO, true).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(a: u16, b: u16, c: bool) -> (u16, bool) {
        let total = a as u32 + b as u32 + c as u32;
        ((total % 65536) as u16, total >= 65536)
    }

    #[test]
    fn test_add8_exhaustive_carry() {
        for a in 0..=255u8 {
            for b in [0u8, 1, 127, 128, 254, 255] {
                for c in [false, true] {
                    let total = a as u16 + b as u16 + c as u16;
                    assert_eq!(add8_with_carry(a, b, c), (total as u8, total >= 256));
                }
            }
        }
    }

    #[test]
    fn test_carry_crosses_byte_boundary() {
        let (sum, carry) = add16_with_carry(Word::new(0x00FF), Word::new(0x0001), false);
        assert_eq!(sum.bits(), 0x0100);
        assert!(!carry);

        let (sum, carry) = add16_with_carry(Word::new(0x00FF), Word::ZERO, true);
        assert_eq!(sum.bits(), 0x0100);
        assert!(!carry);
    }

    #[test]
    fn test_carry_out() {
        let (sum, carry) = add16_with_carry(Word::new(0xFFFF), Word::ZERO, true);
        assert_eq!(sum.bits(), 0);
        assert!(carry);

        let (sum, carry) = add16_with_carry(Word::new(0xFFFF), Word::new(0xFFFF), true);
        assert_eq!(sum.bits(), 0xFFFF);
        assert!(carry);

        let (sum, carry) = add16_with_carry(Word::new(0x8000), Word::new(0x8000), false);
        assert_eq!(sum.bits(), 0);
        assert!(carry);
    }

    #[test]
    fn test_signed_reinterpretation() {
        // 5 + (-3) = 2, carry set as an unsigned side effect
        let (sum, carry) = add16_with_carry(Word::from_i16(5), Word::from_i16(-3), false);
        assert_eq!(sum.to_i16(), 2);
        assert!(carry);
    }

    #[test]
    fn test_inc16_wraps() {
        assert_eq!(inc16(Word::new(41)).bits(), 42);
        assert_eq!(inc16(Word::new(0xFFFF)).bits(), 0);
    }

    proptest! {
        #[test]
        fn prop_matches_unsigned_addition(a in any::<u16>(), b in any::<u16>(), c in any::<bool>()) {
            let (sum, carry) = add16_with_carry(Word::new(a), Word::new(b), c);
            prop_assert_eq!((sum.bits(), carry), reference(a, b, c));
        }

        #[test]
        fn prop_commutative(a in any::<u16>(), b in any::<u16>(), c in any::<bool>()) {
            prop_assert_eq!(
                add16_with_carry(Word::new(a), Word::new(b), c),
                add16_with_carry(Word::new(b), Word::new(a), c)
            );
        }
    }
}
