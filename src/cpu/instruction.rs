//! Symbolic view of Hack instructions.
//!
//! Every 16-bit word is a valid instruction. Bit 15 selects the format:
//!
//! ```text
//! address-load:  0vvv vvvv vvvv vvvv    A := v (15-bit literal)
//! compute:       1xxa cccc ccdd djjj    dest := comp; jump
//! ```
//!
//! The bits marked `x` are ignored by the CPU and emitted as `1` by the
//! assembler. The CPU's decode network works on raw bits directly; this
//! module is what the assembler, disassembler and debugger use.

use crate::cpu::branch::JumpCondition;
use crate::logic::{Address, ControlBits, Word};
use serde::{Serialize, Deserialize};
use std::fmt;

/// Destination flags of a compute instruction (`d1 d2 d3` = A, D, M).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dest(u8);

impl Dest {
    pub const NONE: Dest = Dest(0b000);
    pub const M: Dest = Dest(0b001);
    pub const D: Dest = Dest(0b010);
    pub const A: Dest = Dest(0b100);

    /// Create from a 3-bit pattern.
    ///
    /// # Panics
    /// Panics if the value does not fit in 3 bits.
    pub fn new(bits: u8) -> Self {
        assert!(bits < 0b1000, "destination {:#b} wider than 3 bits", bits);
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Store into A (instruction bit 5).
    #[inline]
    pub const fn a(self) -> bool {
        self.0 & 0b100 != 0
    }

    /// Store into D (instruction bit 4).
    #[inline]
    pub const fn d(self) -> bool {
        self.0 & 0b010 != 0
    }

    /// Write to memory (instruction bit 3).
    #[inline]
    pub const fn m(self) -> bool {
        self.0 & 0b001 != 0
    }

    /// Combine two destination sets.
    #[inline]
    pub const fn union(self, other: Dest) -> Dest {
        Dest(self.0 | other.0)
    }

    /// Assembly text in canonical `A`, `M`, `D` order, `None` if empty.
    pub fn mnemonic(self) -> Option<String> {
        if self.0 == 0 {
            return None;
        }
        let mut text = String::with_capacity(3);
        if self.a() { text.push('A'); }
        if self.m() { text.push('M'); }
        if self.d() { text.push('D'); }
        Some(text)
    }

    /// Parse assembly text: any arrangement of `A`, `D`, `M`, each at most once.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut dest = Dest::NONE;
        for ch in text.chars() {
            let flag = match ch {
                'A' => Dest::A,
                'D' => Dest::D,
                'M' => Dest::M,
                _ => return None,
            };
            if dest.0 & flag.0 != 0 {
                return None;
            }
            dest = dest.union(flag);
        }
        Some(dest)
    }
}

/// The ALU half of a compute instruction: operand source plus control bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Computation {
    /// Second operand is memory (`M`) rather than A (instruction bit 12).
    pub a: bool,
    /// ALU control bits (instruction bits 11..6).
    pub ctrl: ControlBits,
}

/// The documented computations: (mnemonic, a-bit, zx nx zy ny f no).
const COMPUTATIONS: [(&str, bool, u8); 28] = [
    ("0",   false, 0b101010),
    ("1",   false, 0b111111),
    ("-1",  false, 0b111010),
    ("D",   false, 0b001100),
    ("A",   false, 0b110000),
    ("!D",  false, 0b001101),
    ("!A",  false, 0b110001),
    ("-D",  false, 0b001111),
    ("-A",  false, 0b110011),
    ("D+1", false, 0b011111),
    ("A+1", false, 0b110111),
    ("D-1", false, 0b001110),
    ("A-1", false, 0b110010),
    ("D+A", false, 0b000010),
    ("D-A", false, 0b010011),
    ("A-D", false, 0b000111),
    ("D&A", false, 0b000000),
    ("D|A", false, 0b010101),
    ("M",   true,  0b110000),
    ("!M",  true,  0b110001),
    ("-M",  true,  0b110011),
    ("M+1", true,  0b110111),
    ("M-1", true,  0b110010),
    ("D+M", true,  0b000010),
    ("D-M", true,  0b010011),
    ("M-D", true,  0b000111),
    ("D&M", true,  0b000000),
    ("D|M", true,  0b010101),
];

impl Computation {
    /// Create from the a-bit and a 6-bit control pattern.
    pub fn new(a: bool, ctrl: u8) -> Self {
        Self { a, ctrl: ControlBits::new(ctrl) }
    }

    /// Look up a documented computation by its assembly text.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        COMPUTATIONS
            .iter()
            .find(|(m, _, _)| *m == text)
            .map(|&(_, a, ctrl)| Self::new(a, ctrl))
    }

    /// Assembly text, if this is one of the documented computations.
    pub fn mnemonic(self) -> Option<&'static str> {
        COMPUTATIONS
            .iter()
            .find(|&&(_, a, ctrl)| a == self.a && ctrl == self.ctrl.bits())
            .map(|(m, _, _)| *m)
    }

    /// All documented computations, in table order.
    pub fn all() -> impl Iterator<Item = (&'static str, Computation)> {
        COMPUTATIONS.iter().map(|&(m, a, ctrl)| (m, Self::new(a, ctrl)))
    }
}

/// A decoded Hack instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Load a 15-bit literal into A: `@value`
    Address(Address),
    /// Compute and optionally store and/or jump: `dest=comp;jump`
    Compute {
        comp: Computation,
        dest: Dest,
        jump: JumpCondition,
    },
}

impl Instruction {
    /// Check the type bit.
    pub fn is_compute(&self) -> bool {
        matches!(self, Instruction::Compute { .. })
    }
}

/// Decode a 16-bit word. Total: every word decodes.
pub fn decode(word: Word) -> Instruction {
    if !word.bit(15) {
        return Instruction::Address(Address::truncate(word));
    }
    Instruction::Compute {
        comp: Computation::new(word.bit(12), word.field(6, 6) as u8),
        dest: Dest::new(word.field(3, 3) as u8),
        jump: JumpCondition::new(word.field(0, 3) as u8),
    }
}

/// Encode an instruction. Compute instructions get `111` in bits 15..13.
pub fn encode(instr: &Instruction) -> Word {
    match *instr {
        Instruction::Address(addr) => addr.to_word(),
        Instruction::Compute { comp, dest, jump } => Word::new(
            0b111 << 13
                | (comp.a as u16) << 12
                | (comp.ctrl.bits() as u16) << 6
                | (dest.bits() as u16) << 3
                | jump.bits() as u16,
        ),
    }
}

impl fmt::Display for Instruction {
    /// Formats as assembly text. Undocumented ALU patterns print as
    /// `comp?aXXXXXX` with the raw bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Address(addr) => write!(f, "@{}", addr),
            Instruction::Compute { comp, dest, jump } => {
                if let Some(d) = dest.mnemonic() {
                    write!(f, "{}=", d)?;
                }
                match comp.mnemonic() {
                    Some(m) => write!(f, "{}", m)?,
                    None => write!(f, "comp?{}{:06b}", comp.a as u8, comp.ctrl.bits())?,
                }
                if let Some(j) = jump.mnemonic() {
                    write!(f, ";{}", j)?;
                }
                Ok(())
            }
        }
    }
}
