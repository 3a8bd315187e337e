//! WebAssembly bindings for the Hack machine.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Machine, Word};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::asm::vm::translate_source;
use crate::logic::Address;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with an empty ROM.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            machine: Machine::new(),
        }
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let instructions = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        self.machine.load_program(&instructions)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(instructions.len())
    }

    /// Load a program from single-unit VM source.
    #[wasm_bindgen]
    pub fn load_vm(&mut self, source: &str) -> Result<usize, JsError> {
        let asm = translate_source("Main", source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.load_asm(&asm)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let info = self.machine.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(info.instruction.to_string())
    }

    /// Run until halt or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.machine.run_limited(max_cycles as u64)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.machine.cpu.cycles)
    }

    /// Reset to the power-on state, keeping the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Set the keyboard register.
    #[wasm_bindgen]
    pub fn set_key(&mut self, key: u16) {
        self.machine.set_key(Word::new(key));
    }

    /// Check if the machine is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    /// Check if the machine is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.machine.cpu.pc().value()
    }

    /// Get the A register as a signed value.
    #[wasm_bindgen]
    pub fn a(&self) -> i16 {
        self.machine.registers().a.to_i16()
    }

    /// Get the D register as a signed value.
    #[wasm_bindgen]
    pub fn d(&self) -> i16 {
        self.machine.registers().d.to_i16()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.machine.state)
    }

    /// Get a RAM cell (0 past the end of memory).
    #[wasm_bindgen]
    pub fn ram_at(&self, index: usize) -> u16 {
        if index <= Address::MAX as usize {
            self.machine.ram.read(Address::new(index as u16)).bits()
        } else {
            0
        }
    }

    /// Get a window of RAM as raw 16-bit values.
    #[wasm_bindgen]
    pub fn ram_slice(&self, start: usize, count: usize) -> js_sys::Uint16Array {
        let bits: Vec<u16> = self.machine.ram
            .slice(start, count)
            .iter()
            .map(|w| w.bits())
            .collect();
        js_sys::Uint16Array::from(&bits[..])
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the `.hack` text.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<String, JsError> {
    let instructions = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(crate::asm::hack::format_hack(&instructions))
}

/// Disassemble a single 16-bit instruction.
#[wasm_bindgen]
pub fn wasm_disassemble(value: u16) -> String {
    disassemble_instruction(Word::new(value))
}
