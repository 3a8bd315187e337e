//! Assembler and disassembler for Hack programs.
//!
//! This module provides:
//! - A two-pass assembler with symbols and variables (text → machine words)
//! - A disassembler (machine words → readable text)
//! - The `.hack` text format for assembled programs
//! - A VM translator (stack-machine code → assembly)

pub mod assembler;
pub mod disasm;
pub mod hack;
pub mod vm;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use hack::{HackFile, HackFileError, load_hack, parse_hack, save_hack};
pub use vm::{translate, translate_source, VmError, VmUnit};
