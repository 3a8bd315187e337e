//! Combinational building blocks.
//!
//! This module provides the stateless parts the CPU is wired from:
//! - [`Word`] / [`Address`] - 16-bit and 15-bit bus values
//! - [`gates`] - NOT/AND/OR, 16-bit multiplexer and buffer
//! - [`adder`] - ripple-carry adders (two 8-bit stages chained on a carry)
//! - [`alu`] - the arithmetic/logic function unit

mod word;
pub mod gates;
pub mod adder;
pub mod alu;

pub use word::{Word, Address};
pub use adder::add16_with_carry;
pub use alu::{AluOutput, ControlBits};
