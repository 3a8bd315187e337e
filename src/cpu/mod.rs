//! CPU emulation for the Hack computer.
//!
//! This module implements the Hack architecture:
//! - 3 storage elements: A (address/data), D (data), PC (15-bit counter)
//! - Two instruction formats: address-load (`@v`) and compute (`dest=comp;jump`)
//! - Separate 32K-word ROM and memory-mapped 32K-word RAM

pub mod memory;
pub mod registers;
pub mod branch;
pub mod instruction;
pub mod execute;
pub mod machine;

pub use memory::{Ram, Rom, MemoryError, SCREEN, KBD};
pub use registers::{Register, ProgramCounter, Registers};
pub use branch::{JumpCondition, should_jump};
pub use instruction::{Instruction, Computation, Dest, decode, encode};
pub use execute::{Cpu, CpuOutput, Inputs, Signals, step};
pub use machine::{Machine, MachineError, MachineSnapshot, MachineState, StepInfo};
