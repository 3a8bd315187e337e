//! The arithmetic/logic function unit.
//!
//! Six control bits pre-process both operands, pick addition or bitwise
//! AND, and optionally negate the result:
//!
//! ```text
//! zx: x := 0        zy: y := 0        f:  out := f ? x + y : x & y
//! nx: x := !x       ny: y := !y       no: out := !out
//! ```
//!
//! Eighteen of the 64 combinations are the documented computations; the
//! remaining patterns still produce a well-defined result.

use crate::logic::{adder, gates, Word};
use serde::{Serialize, Deserialize};

/// The six ALU control bits, packed as `zx nx zy ny f no` (zx = bit 5).
///
/// This is exactly the layout of instruction bits 11..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlBits(u8);

impl ControlBits {
    /// Create from a 6-bit pattern.
    ///
    /// # Panics
    /// Panics if the value does not fit in 6 bits.
    pub fn new(bits: u8) -> Self {
        assert!(bits < 0b100_0000, "ALU control pattern {:#b} wider than 6 bits", bits);
        Self(bits)
    }

    /// Create from the individual flags.
    pub fn from_flags(zx: bool, nx: bool, zy: bool, ny: bool, f: bool, no: bool) -> Self {
        Self(
            (zx as u8) << 5 | (nx as u8) << 4 | (zy as u8) << 3
                | (ny as u8) << 2 | (f as u8) << 1 | no as u8,
        )
    }

    /// Get the packed pattern.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn zx(self) -> bool { self.0 & 0b100000 != 0 }
    #[inline]
    pub const fn nx(self) -> bool { self.0 & 0b010000 != 0 }
    #[inline]
    pub const fn zy(self) -> bool { self.0 & 0b001000 != 0 }
    #[inline]
    pub const fn ny(self) -> bool { self.0 & 0b000100 != 0 }
    #[inline]
    pub const fn f(self) -> bool { self.0 & 0b000010 != 0 }
    #[inline]
    pub const fn no(self) -> bool { self.0 & 0b000001 != 0 }
}

/// Result bus and status flags of one ALU evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluOutput {
    /// The computed value.
    pub out: Word,
    /// Set when `out` is zero.
    pub zr: bool,
    /// Set when `out` is negative (bit 15).
    pub ng: bool,
}

/// Evaluate the ALU on operands `x`, `y`.
pub fn compute(x: Word, y: Word, ctrl: ControlBits) -> AluOutput {
    let x = gates::mux16(x, Word::ZERO, ctrl.zx());
    let x = gates::mux16(x, gates::not16(x), ctrl.nx());
    let y = gates::mux16(y, Word::ZERO, ctrl.zy());
    let y = gates::mux16(y, gates::not16(y), ctrl.ny());

    let out = gates::mux16(gates::and16(x, y), adder::add16(x, y), ctrl.f());
    let out = gates::mux16(out, gates::not16(out), ctrl.no());

    AluOutput {
        out,
        zr: out.is_zero(),
        ng: out.is_negative(),
    }
}
