//! # Hack Emulator
//!
//! A cycle-accurate emulator of the 16-bit Hack computer.
//!
//! The CPU is modeled as a combinational decode network evaluated against
//! an immutable snapshot of its registers, followed by one atomic commit
//! per clock tick. An assembler, a disassembler, a VM translator and a
//! terminal debugger are included for driving it.

pub mod logic;
pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use logic::{Word, Address, add16_with_carry};
pub use cpu::{Cpu, CpuOutput, Machine, MachineError, MachineState, Registers, Instruction};
pub use asm::{assemble, disassemble, AssemblerError, HackFile, load_hack, save_hack, VmError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
