//! Disassembler for Hack programs.
//!
//! Converts machine words back to readable assembly.

use crate::cpu::instruction::decode;
use crate::logic::Word;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(word: Word) -> String {
    decode(word).to_string()
}

/// Disassemble a slice of instructions.
pub fn disassemble(instructions: &[Word]) -> String {
    let mut output = String::new();
    output.push_str("// Hack Disassembly\n");
    output.push_str("// -----------------\n\n");

    for (addr, word) in instructions.iter().enumerate() {
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:05}: {:<16}  // {}\n", addr, line, word));
    }

    output
}
