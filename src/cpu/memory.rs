//! Hack memory subsystem.
//!
//! Instruction memory (ROM) and data memory (RAM) are separate 32K-word
//! address spaces. The data space is memory-mapped:
//! - 0x0000-0x3FFF: general RAM (16K)
//! - 0x4000-0x5FFF: screen, 512x256 pixels, one bit per pixel (8K)
//! - 0x6000: keyboard register

use crate::logic::{Address, Word};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Words in each address space.
pub const MEMORY_SIZE: usize = 1 << Address::WIDTH;

/// Base of the screen memory map.
pub const SCREEN: Address = Address::truncate(Word::new(0x4000));

/// Words in the screen memory map.
pub const SCREEN_SIZE: usize = 0x2000;

/// The keyboard register.
pub const KBD: Address = Address::truncate(Word::new(0x6000));

/// Read-only instruction memory.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Rom {
    words: Vec<Word>,
}

impl Rom {
    /// Burn a program into a fresh ROM.
    pub fn load(program: &[Word]) -> Result<Self, MemoryError> {
        if program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE,
            });
        }
        Ok(Self { words: program.to_vec() })
    }

    /// Read an instruction. Cells past the loaded program read as zero.
    #[inline]
    pub fn read(&self, addr: Address) -> Word {
        self.words.get(addr.index()).copied().unwrap_or(Word::ZERO)
    }

    /// Number of loaded words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if no program is loaded.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rom")
            .field("program_words", &self.words.len())
            .finish()
    }
}

/// Read/write data memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    cells: Vec<Word>,
}

impl Ram {
    /// Create a RAM with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![Word::ZERO; MEMORY_SIZE],
        }
    }

    /// Read a cell.
    #[inline]
    pub fn read(&self, addr: Address) -> Word {
        self.cells[addr.index()]
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: Address, value: Word) {
        self.cells[addr.index()] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(Word::ZERO);
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(Address, Word)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (Address::new(i as u16), self.cells[i]))
            .collect()
    }

    /// Raw view of a range, clamped to the address space.
    pub fn slice(&self, start: usize, count: usize) -> &[Word] {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        &self.cells[start.min(end)..end]
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero cells
        let non_zero = self.cells.iter().filter(|cell| !cell.is_zero()).count();

        f.debug_struct("Ram")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program is too large to fit in ROM.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
