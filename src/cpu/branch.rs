//! Branch-condition evaluator.
//!
//! A compute instruction carries three jump bits `j2 j1 j0` in bits 2..0.
//! Each bit selects one region of the ALU result: negative, zero, positive.
//! The jump is taken if the result falls in any selected region.

use crate::logic::gates;
use serde::{Serialize, Deserialize};

/// The 3-bit jump condition of a compute instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JumpCondition(u8);

impl JumpCondition {
    pub const NONE: JumpCondition = JumpCondition(0b000);
    pub const JGT: JumpCondition = JumpCondition(0b001);
    pub const JEQ: JumpCondition = JumpCondition(0b010);
    pub const JGE: JumpCondition = JumpCondition(0b011);
    pub const JLT: JumpCondition = JumpCondition(0b100);
    pub const JNE: JumpCondition = JumpCondition(0b101);
    pub const JLE: JumpCondition = JumpCondition(0b110);
    pub const JMP: JumpCondition = JumpCondition(0b111);

    /// Mnemonics indexed by bit pattern.
    const MNEMONICS: [&'static str; 8] = ["", "JGT", "JEQ", "JGE", "JLT", "JNE", "JLE", "JMP"];

    /// Create from a 3-bit pattern.
    ///
    /// # Panics
    /// Panics if the value does not fit in 3 bits.
    pub fn new(bits: u8) -> Self {
        assert!(bits < 0b1000, "jump condition {:#b} wider than 3 bits", bits);
        Self(bits)
    }

    /// Get the packed pattern.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Jump if negative.
    #[inline]
    pub const fn j2(self) -> bool {
        self.0 & 0b100 != 0
    }

    /// Jump if zero.
    #[inline]
    pub const fn j1(self) -> bool {
        self.0 & 0b010 != 0
    }

    /// Jump if positive.
    #[inline]
    pub const fn j0(self) -> bool {
        self.0 & 0b001 != 0
    }

    /// Assembly mnemonic, `None` for the never-jump condition.
    pub fn mnemonic(self) -> Option<&'static str> {
        match self.0 {
            0 => None,
            bits => Some(Self::MNEMONICS[bits as usize]),
        }
    }

    /// Parse an assembly mnemonic (`JGT` .. `JMP`).
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::MNEMONICS
            .iter()
            .skip(1)
            .position(|m| *m == text)
            .map(|i| Self(i as u8 + 1))
    }
}

/// Decide whether the program counter loads A this cycle.
///
/// Never jumps on an address-load instruction.
pub fn should_jump(is_compute: bool, cond: JumpCondition, zr: bool, ng: bool) -> bool {
    let positive = gates::and(gates::not(zr), gates::not(ng));
    let taken = gates::or(
        gates::or(gates::and(cond.j2(), ng), gates::and(cond.j1(), zr)),
        gates::and(cond.j0(), positive),
    );
    gates::and(is_compute, taken)
}
