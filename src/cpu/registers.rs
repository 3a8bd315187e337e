//! Hack CPU storage primitives.
//!
//! The Hack CPU has 3 storage elements:
//! - A: 16-bit address/data register
//! - D: 16-bit data register
//! - PC: 15-bit program counter
//!
//! Each one only changes at a clock edge (`tick`), and only to a value that
//! was computed before the edge.

use crate::logic::{adder, Address, Word};
use serde::{Serialize, Deserialize};

/// A 16-bit register with a load enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Register {
    value: Word,
}

impl Register {
    /// Create a register holding `value`.
    pub const fn new(value: Word) -> Self {
        Self { value }
    }

    /// Current output.
    #[inline]
    pub const fn out(&self) -> Word {
        self.value
    }

    /// Clock edge: latch `input` if `load` is asserted, otherwise hold.
    #[inline]
    pub fn tick(&mut self, input: Word, load: bool) {
        if load {
            self.value = input;
        }
    }
}

/// The 15-bit program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramCounter {
    value: Address,
}

impl ProgramCounter {
    /// Create a counter holding `value`.
    pub const fn new(value: Address) -> Self {
        Self { value }
    }

    /// Current output.
    #[inline]
    pub const fn out(&self) -> Address {
        self.value
    }

    /// Next value of a counter currently at `current`.
    ///
    /// Priority: reset (0) > load (`input`) > inc (`current + 1`) > hold.
    /// Incrementing wraps at 2^15.
    pub fn next(current: Address, input: Address, load: bool, inc: bool, reset: bool) -> Address {
        if reset {
            Address::ZERO
        } else if load {
            input
        } else if inc {
            Address::truncate(adder::inc16(current.to_word()))
        } else {
            current
        }
    }

    /// Clock edge: move to [`ProgramCounter::next`].
    #[inline]
    pub fn tick(&mut self, input: Address, load: bool, inc: bool, reset: bool) {
        self.value = Self::next(self.value, input, load, inc, reset);
    }
}

/// The committed CPU state carried from one cycle to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    /// A: address register, also usable as a data register.
    pub a: Word,
    /// D: data register.
    pub d: Word,
    /// PC: address of the instruction to fetch.
    pub pc: Address,
}

impl Registers {
    /// All registers zeroed.
    pub const fn new() -> Self {
        Self {
            a: Word::ZERO,
            d: Word::ZERO,
            pc: Address::ZERO,
        }
    }
}
