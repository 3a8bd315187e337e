//! Elementary gates and bus parts.
//!
//! Every function here is stateless. Higher-level chips call these rather
//! than using operators directly so that the wiring reads like a schematic.

use crate::logic::Word;

/// Inverter.
#[inline]
pub fn not(a: bool) -> bool {
    !a
}

/// Two-input AND.
#[inline]
pub fn and(a: bool, b: bool) -> bool {
    a & b
}

/// Two-input OR.
#[inline]
pub fn or(a: bool, b: bool) -> bool {
    a | b
}

/// Bitwise inverter over a 16-bit bus.
#[inline]
pub fn not16(a: Word) -> Word {
    Word::new(!a.bits())
}

/// Bitwise AND over two 16-bit buses.
#[inline]
pub fn and16(a: Word, b: Word) -> Word {
    Word::new(a.bits() & b.bits())
}

/// 16-bit two-way multiplexer: `a` when `sel` is low, `b` when high.
#[inline]
pub fn mux16(a: Word, b: Word, sel: bool) -> Word {
    if sel { b } else { a }
}

/// 16-bit buffer. Passes the bus through unchanged.
#[inline]
pub fn buffer16(a: Word) -> Word {
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_tables() {
        for a in [false, true] {
            assert_eq!(not(a), !a);
            for b in [false, true] {
                assert_eq!(and(a, b), a && b);
                assert_eq!(or(a, b), a || b);
            }
        }
    }

    #[test]
    fn test_bus_gates() {
        let a = Word::new(0b1100_1010_0101_0011);
        let b = Word::new(0b1010_1010_1010_1010);
        assert_eq!(not16(a).bits(), !a.bits());
        assert_eq!(and16(a, b).bits(), a.bits() & b.bits());
        assert_eq!(buffer16(a), a);
    }

    #[test]
    fn test_mux16_select() {
        let a = Word::new(1);
        let b = Word::new(2);
        assert_eq!(mux16(a, b, false), a);
        assert_eq!(mux16(a, b, true), b);
    }
}
