//! TUI debugger for the Hack machine.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register view (A, D, PC, cycle count)
//! - RAM view with scrolling
//! - Step/run/breakpoint controls
//! - Disassembly view around the program counter

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
