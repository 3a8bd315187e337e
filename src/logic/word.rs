//! Fixed-width binary words.
//!
//! This module provides the two bus widths used by the Hack machine:
//! - `Word`: 16-bit value for instructions, registers and memory cells
//! - `Address`: 15-bit value for the program counter and memory addresses

use std::fmt;
use serde::{Serialize, Deserialize};

/// A 16-bit word.
///
/// Used for:
/// - Instructions fetched from ROM
/// - The A and D registers
/// - RAM cells and the ALU buses
///
/// Bits are numbered from least significant (0) to most significant (15).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(u16);

/// A 15-bit address.
///
/// Used for:
/// - The program counter
/// - The memory-address output of the CPU
/// - Indexing ROM and RAM
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u16);

// ============================================================================
// Word Implementation
// ============================================================================

impl Word {
    /// Number of bits in a Word.
    pub const WIDTH: usize = 16;

    /// All bits clear.
    pub const ZERO: Word = Word(0);

    /// All bits set (-1 in two's complement).
    pub const ONES: Word = Word(0xFFFF);

    /// Create a word from its raw bit pattern.
    #[inline]
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Get the raw bit pattern.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Create from a signed value (two's complement).
    #[inline]
    pub const fn from_i16(value: i16) -> Self {
        Self(value as u16)
    }

    /// Interpret as a signed value (two's complement).
    #[inline]
    pub const fn to_i16(self) -> i16 {
        self.0 as i16
    }

    /// Get a single bit by index (0 = LSB).
    ///
    /// # Panics
    /// Panics if index is 16 or more.
    #[inline]
    pub fn bit(self, index: usize) -> bool {
        assert!(index < Self::WIDTH, "bit index {} out of range for Word", index);
        (self.0 >> index) & 1 == 1
    }

    /// Extract `len` bits starting at bit `lo`.
    ///
    /// # Panics
    /// Panics if the field does not fit inside 16 bits.
    #[inline]
    pub fn field(self, lo: usize, len: usize) -> u16 {
        assert!(
            len > 0 && lo + len <= Self::WIDTH,
            "field [{}, {}) out of range for Word", lo, lo + len
        );
        (self.0 >> lo) & (((1u32 << len) - 1) as u16)
    }

    /// Low byte (bits 0-7).
    #[inline]
    pub const fn low_byte(self) -> u8 {
        self.0 as u8
    }

    /// High byte (bits 8-15).
    #[inline]
    pub const fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Concatenate a high and a low byte.
    #[inline]
    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self(((high as u16) << 8) | low as u16)
    }

    /// Check if every bit is clear.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check the sign bit (bit 15).
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 & 0x8000 != 0
    }
}

impl From<u16> for Word {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:016b} = {})", self.0, self.to_i16())
    }
}

impl fmt::Display for Word {
    /// Formats as 16 binary digits, MSB first (the `.hack` text form).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016b}", self.0)
    }
}

// ============================================================================
// Address Implementation
// ============================================================================

impl Address {
    /// Number of bits in an Address.
    pub const WIDTH: usize = 15;

    /// Largest representable address.
    pub const MAX: u16 = 0x7FFF;

    /// Address zero.
    pub const ZERO: Address = Address(0);

    /// Create an address.
    ///
    /// # Panics
    /// Panics if the value does not fit in 15 bits.
    #[inline]
    pub fn new(value: u16) -> Self {
        assert!(
            value <= Self::MAX,
            "value {} out of range for Address [0, {}]",
            value, Self::MAX
        );
        Self(value)
    }

    /// Create an address from the low 15 bits of a word, dropping bit 15.
    #[inline]
    pub const fn truncate(word: Word) -> Self {
        Self(word.0 & Self::MAX)
    }

    /// Get the numeric value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Use as an index into ROM or RAM.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Zero-extend to a 16-bit word.
    #[inline]
    pub const fn to_word(self) -> Word {
        Word(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
