//! Two-pass assembler for Hack programs.
//!
//! Syntax:
//! ```text
//! // Comment
//! (LOOP)          // Define a label
//!     @counter    // Load a variable's address into A
//!     M=M-1       // dest=comp;jump
//!     @LOOP
//!     D;JGT       // Jump to label
//!     @100        // Load a literal into A
//! ```
//!
//! Predefined symbols: `SP LCL ARG THIS THAT R0-R15 SCREEN KBD`.
//! Unknown symbols are variables, allocated from RAM 16 upward in order of
//! first use.

use crate::cpu::branch::JumpCondition;
use crate::cpu::instruction::{encode, Computation, Dest, Instruction};
use crate::cpu::memory::{KBD, SCREEN};
use crate::logic::{Address, Word};
use std::collections::HashMap;
use thiserror::Error;

/// First RAM address handed out to variables.
pub const VARIABLE_BASE: u16 = 16;

/// Assemble source code to a list of machine words.
pub fn assemble(source: &str) -> Result<Vec<Word>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Built-in symbol table entries.
pub fn predefined_symbols() -> impl Iterator<Item = (String, u16)> {
    let named = [
        ("SP", 0),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", SCREEN.value()),
        ("KBD", KBD.value()),
    ];
    named
        .into_iter()
        .map(|(name, addr)| (name.to_string(), addr))
        .chain((0..16).map(|i| (format!("R{}", i), i)))
}

/// Check a label or variable name.
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = |c: char| c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$' | ':');
    match chars.next() {
        Some(c) if head_ok(c) => chars.all(|c| head_ok(c) || c.is_ascii_digit()),
        _ => false,
    }
}

/// The assembler state.
struct Assembler {
    /// Address of the next emitted instruction.
    current_addr: usize,
    /// Symbol table (name -> address).
    symbols: HashMap<String, u16>,
    /// Next free variable address.
    next_variable: u16,
    /// Unresolved `@symbol` references: (output_index, symbol, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output words.
    output: Vec<Word>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: predefined_symbols().collect(),
            next_variable: VARIABLE_BASE,
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<Word>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve symbol references
        self.resolve_references()?;

        log::debug!(
            "assembled {} words, {} variables",
            self.output.len(),
            self.next_variable - VARIABLE_BASE
        );
        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix('@') {
            return self.process_address(rest.trim(), line_num);
        }

        if line.starts_with('(') {
            return self.process_label(line, line_num);
        }

        let instr = self.parse_compute(line, line_num)?;
        self.emit(encode(&instr), line_num)
    }

    fn process_label(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let label = line
            .strip_prefix('(')
            .and_then(|l| l.strip_suffix(')'))
            .map(str::trim)
            .ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unterminated label: {}", line),
            })?;

        if !is_valid_symbol(label) {
            return Err(AssemblerError::InvalidSymbol { line: line_num, symbol: label.into() });
        }
        if self.symbols.contains_key(label) {
            return Err(AssemblerError::DuplicateLabel { line: line_num, label: label.into() });
        }

        let addr = self.next_address(line_num)?;
        self.symbols.insert(label.to_string(), addr.value());
        Ok(())
    }

    fn process_address(&mut self, operand: &str, line_num: usize) -> Result<(), AssemblerError> {
        if operand.is_empty() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: "@ requires a value or symbol".into(),
            });
        }

        // Numeric literal
        if operand.starts_with(|c: char| c.is_ascii_digit()) {
            let value = operand
                .parse::<u32>()
                .ok()
                .filter(|v| *v <= Address::MAX as u32)
                .ok_or_else(|| AssemblerError::LiteralOutOfRange {
                    line: line_num,
                    value: operand.into(),
                })?;
            return self.emit(encode(&Instruction::Address(Address::new(value as u16))), line_num);
        }

        if !is_valid_symbol(operand) {
            return Err(AssemblerError::InvalidSymbol { line: line_num, symbol: operand.into() });
        }

        // Symbol reference - store for pass 2
        self.pending.push((self.output.len(), operand.to_string(), line_num));
        self.emit(Word::ZERO, line_num)
    }

    fn parse_compute(&self, line: &str, line_num: usize) -> Result<Instruction, AssemblerError> {
        let text: String = line.chars().filter(|c| !c.is_whitespace()).collect();

        let (dest_text, rest) = match text.split_once('=') {
            Some((d, r)) => (Some(d), r),
            None => (None, text.as_str()),
        };
        let (comp_text, jump_text) = match rest.split_once(';') {
            Some((c, j)) => (c, Some(j)),
            None => (rest, None),
        };

        let dest = match dest_text {
            Some(d) => Dest::from_mnemonic(d).ok_or_else(|| AssemblerError::UnknownDestination {
                line: line_num,
                dest: d.into(),
            })?,
            None => Dest::NONE,
        };

        let comp = Computation::from_mnemonic(comp_text).ok_or_else(|| {
            AssemblerError::UnknownComputation { line: line_num, comp: comp_text.into() }
        })?;

        let jump = match jump_text {
            Some(j) => JumpCondition::from_mnemonic(j).ok_or_else(|| {
                AssemblerError::UnknownJump { line: line_num, jump: j.into() }
            })?,
            None => JumpCondition::NONE,
        };

        Ok(Instruction::Compute { comp, dest, jump })
    }

    /// ROM address of the next instruction, if it still fits.
    fn next_address(&self, line_num: usize) -> Result<Address, AssemblerError> {
        if self.current_addr > Address::MAX as usize {
            return Err(AssemblerError::ProgramTooLarge { line: line_num });
        }
        Ok(Address::new(self.current_addr as u16))
    }

    fn emit(&mut self, word: Word, line_num: usize) -> Result<(), AssemblerError> {
        self.next_address(line_num)?;
        self.output.push(word);
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, symbol, line_num) in std::mem::take(&mut self.pending) {
            let addr = match self.symbols.get(&symbol) {
                Some(&addr) => addr,
                None => {
                    if self.next_variable > Address::MAX {
                        return Err(AssemblerError::OutOfVariables { line: line_num, symbol });
                    }
                    let addr = self.next_variable;
                    log::trace!("variable {} -> RAM[{}]", symbol, addr);
                    self.symbols.insert(symbol, addr);
                    self.next_variable += 1;
                    addr
                }
            };
            self.output[out_idx] = encode(&Instruction::Address(Address::new(addr)));
        }
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("invalid symbol on line {line}: {symbol}")]
    InvalidSymbol { line: usize, symbol: String },

    #[error("literal out of range on line {line}: {value}")]
    LiteralOutOfRange { line: usize, value: String },

    #[error("unknown computation on line {line}: {comp}")]
    UnknownComputation { line: usize, comp: String },

    #[error("unknown destination on line {line}: {dest}")]
    UnknownDestination { line: usize, dest: String },

    #[error("unknown jump on line {line}: {jump}")]
    UnknownJump { line: usize, jump: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("no RAM left for variable on line {line}: {symbol}")]
    OutOfVariables { line: usize, symbol: String },

    #[error("program exceeds ROM on line {line}")]
    ProgramTooLarge { line: usize },
}
