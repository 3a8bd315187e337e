//! Stack-machine (VM) translator targeting Hack assembly.
//!
//! Each `.vm` file is a unit. Its name prefixes the unit's static
//! variables (`Main.0`, `Main.1`, ...). The output is assembly text for
//! [`assemble`](super::assemble).
//!
//! ```text
//! function Main.double 0
//!     push argument 0
//!     push argument 0
//!     add
//!     return
//! ```
//!
//! Calling convention: a frame is `return address, LCL, ARG, THIS, THAT`
//! pushed by the caller. `R13` holds the return address during `return`,
//! `R14` the caller's stack top, and `R15` scratch values.

use super::assembler::is_valid_symbol;
use crate::logic::Address;
use std::fmt;
use thiserror::Error;

/// Stack base set by the bootstrap code.
pub const STACK_BASE: u16 = 256;

/// Largest local count a function may declare.
pub const MAX_LOCALS: u16 = 1024;

/// Words pushed by `call` on top of the arguments.
const FRAME_SIZE: u16 = 5;

/// Halt loop emitted after the entry point returns or falls through.
const HALT_LABEL: &str = "$halt";

/// Memory segment addressed by `push`/`pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Static,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "constant" => Self::Constant,
            "static" => Self::Static,
            "local" => Self::Local,
            "argument" => Self::Argument,
            "this" => Self::This,
            "that" => Self::That,
            "pointer" => Self::Pointer,
            "temp" => Self::Temp,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Static => "static",
            Self::Local => "local",
            Self::Argument => "argument",
            Self::This => "this",
            Self::That => "that",
            Self::Pointer => "pointer",
            Self::Temp => "temp",
        }
    }

    /// Base register holding this segment's address.
    fn pointer(self) -> Option<&'static str> {
        match self {
            Self::Local => Some("LCL"),
            Self::Argument => Some("ARG"),
            Self::This => Some("THIS"),
            Self::That => Some("THAT"),
            _ => None,
        }
    }

    /// Fixed RAM window: (base, size).
    fn window(self) -> Option<(u16, u16)> {
        match self {
            Self::Pointer => Some((3, 2)),
            Self::Temp => Some((5, 8)),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stack arithmetic and logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl Arithmetic {
    const ALL: [Arithmetic; 9] = [
        Self::Add,
        Self::Sub,
        Self::Neg,
        Self::Eq,
        Self::Gt,
        Self::Lt,
        Self::And,
        Self::Or,
        Self::Not,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Neg => "neg",
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    fn from_mnemonic(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == text)
    }
}

/// One VM command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(Arithmetic),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Push(seg, i) => write!(f, "push {} {}", seg, i),
            Command::Pop(seg, i) => write!(f, "pop {} {}", seg, i),
            Command::Arithmetic(op) => f.write_str(op.mnemonic()),
            Command::Label(l) => write!(f, "label {}", l),
            Command::Goto(l) => write!(f, "goto {}", l),
            Command::IfGoto(l) => write!(f, "if-goto {}", l),
            Command::Function { name, locals } => write!(f, "function {} {}", name, locals),
            Command::Call { name, args } => write!(f, "call {} {}", name, args),
            Command::Return => f.write_str("return"),
        }
    }
}

/// A parsed `.vm` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmUnit {
    /// Unit name, used to qualify static variables.
    pub name: String,
    pub commands: Vec<Command>,
}

/// Parse one unit of VM source.
pub fn parse_unit(name: &str, source: &str) -> Result<VmUnit, VmError> {
    if !is_valid_symbol(name) {
        return Err(VmError::InvalidUnitName(name.into()));
    }
    Ok(VmUnit { name: name.into(), commands: parse(source)? })
}

/// Parse VM source into commands.
pub fn parse(source: &str) -> Result<Vec<Command>, VmError> {
    let mut commands = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let line = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if let Some(command) = parse_command(&words, idx + 1)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

fn parse_command(words: &[&str], line: usize) -> Result<Option<Command>, VmError> {
    let Some((&head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let arity = |expected: usize| {
        if rest.len() == expected {
            Ok(())
        } else {
            Err(VmError::ArgumentCount { line, command: head.into(), expected })
        }
    };

    let command = match head {
        "push" | "pop" => {
            arity(2)?;
            let segment = Segment::from_name(rest[0]).ok_or_else(|| VmError::UnknownSegment {
                line,
                segment: rest[0].into(),
            })?;
            let index = parse_number(rest[1], line)?;
            if head == "pop" && segment == Segment::Constant {
                return Err(VmError::PopConstant { line });
            }
            if let Some((_, size)) = segment.window() {
                if index >= size {
                    return Err(VmError::OutOfBounds { line, segment, index });
                }
            }
            if head == "push" {
                Command::Push(segment, index)
            } else {
                Command::Pop(segment, index)
            }
        }
        "label" | "goto" | "if-goto" => {
            arity(1)?;
            let target = symbol(rest[0], line)?;
            match head {
                "label" => Command::Label(target),
                "goto" => Command::Goto(target),
                _ => Command::IfGoto(target),
            }
        }
        "function" => {
            arity(2)?;
            let name = symbol(rest[0], line)?;
            let locals = parse_number(rest[1], line)?;
            if locals > MAX_LOCALS {
                return Err(VmError::TooManyLocals { line, locals });
            }
            Command::Function { name, locals }
        }
        "call" => {
            arity(2)?;
            let name = symbol(rest[0], line)?;
            let args = parse_number(rest[1], line)?;
            if args > Address::MAX - FRAME_SIZE {
                return Err(VmError::OutOfRange { line, value: rest[1].into() });
            }
            Command::Call { name, args }
        }
        "return" => {
            arity(0)?;
            Command::Return
        }
        _ => match Arithmetic::from_mnemonic(head) {
            Some(op) => {
                arity(0)?;
                Command::Arithmetic(op)
            }
            None => return Err(VmError::UnknownCommand { line, command: head.into() }),
        },
    };
    Ok(Some(command))
}

fn parse_number(text: &str, line: usize) -> Result<u16, VmError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VmError::NotANumber { line, value: text.into() });
    }
    text.parse::<u16>()
        .ok()
        .filter(|v| *v <= Address::MAX)
        .ok_or_else(|| VmError::OutOfRange { line, value: text.into() })
}

fn symbol(text: &str, line: usize) -> Result<String, VmError> {
    if is_valid_symbol(text) {
        Ok(text.into())
    } else {
        Err(VmError::InvalidSymbol { line, symbol: text.into() })
    }
}

/// Translate a single source unit to assembly.
pub fn translate_source(name: &str, source: &str) -> Result<String, VmError> {
    Ok(translate(&[parse_unit(name, source)?]))
}

/// Translate parsed units to one assembly program.
///
/// The program sets `SP` to 256. If some unit defines `Sys.init` it is
/// called as the entry point. Otherwise the units run top to bottom and
/// stop at the first `function`.
pub fn translate(units: &[VmUnit]) -> String {
    let mut w = Writer::default();
    w.comment("bootstrap");
    w.lines(&[&format!("@{}", STACK_BASE), "D=A", "@SP", "M=D"]);

    let has_entry = units.iter().flat_map(|u| &u.commands).any(
        |c| matches!(c, Command::Function { name, .. } if name == "Sys.init"),
    );

    let mut halted = false;
    if has_entry {
        w.command(&Command::Call { name: "Sys.init".into(), args: 0 }, "", None);
        w.halt();
        halted = true;
    }

    for unit in units {
        let mut function: Option<&str> = None;
        for command in &unit.commands {
            if let Command::Function { name, .. } = command {
                if !halted {
                    w.halt();
                    halted = true;
                }
                function = Some(name.as_str());
            }
            w.command(command, &unit.name, function);
        }
    }
    if !halted {
        w.halt();
    }

    log::debug!("translated {} units, {} calls", units.len(), w.calls);
    w.out
}

/// Assembly text buffer with unique label counters.
#[derive(Default)]
struct Writer {
    out: String,
    calls: usize,
    compares: usize,
}

impl Writer {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn lines(&mut self, lines: &[&str]) {
        for line in lines {
            self.line(line);
        }
    }

    fn comment(&mut self, text: &str) {
        self.line(&format!("// {}", text));
    }

    fn push_d(&mut self) {
        self.lines(&["@SP", "AM=M+1", "A=A-1", "M=D"]);
    }

    fn pop_d(&mut self) {
        self.lines(&["@SP", "AM=M-1", "D=M"]);
    }

    fn halt(&mut self) {
        self.comment("halt");
        self.line(&format!("({})", HALT_LABEL));
        self.lines(&[&format!("@{}", HALT_LABEL), "0;JMP"]);
    }

    fn command(&mut self, command: &Command, unit: &str, function: Option<&str>) {
        self.comment(&command.to_string());
        match command {
            Command::Push(segment, index) => self.push(*segment, *index, unit),
            Command::Pop(segment, index) => self.pop(*segment, *index, unit),
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Label(label) => {
                let label = scoped(function, label);
                self.line(&format!("({})", label));
            }
            Command::Goto(label) => {
                let label = scoped(function, label);
                self.lines(&[&format!("@{}", label), "0;JMP"]);
            }
            Command::IfGoto(label) => {
                let label = scoped(function, label);
                self.pop_d();
                self.lines(&[&format!("@{}", label), "D;JNE"]);
            }
            Command::Function { name, locals } => self.function(name, *locals),
            Command::Call { name, args } => self.call(name, *args),
            Command::Return => self.ret(),
        }
    }

    fn push(&mut self, segment: Segment, index: u16, unit: &str) {
        if segment == Segment::Constant {
            self.lines(&[&format!("@{}", index), "D=A"]);
        } else if segment == Segment::Static {
            self.lines(&[&format!("@{}.{}", unit, index), "D=M"]);
        } else if let Some(base) = segment.pointer() {
            self.lines(&[&format!("@{}", base), "D=M", &format!("@{}", index), "A=D+A", "D=M"]);
        } else if let Some((base, _)) = segment.window() {
            self.lines(&[&format!("@{}", base + index), "D=M"]);
        }
        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16, unit: &str) {
        if let Some(base) = segment.pointer() {
            self.lines(&[&format!("@{}", base), "D=M", &format!("@{}", index), "D=D+A", "@R15", "M=D"]);
            self.pop_d();
            self.lines(&["@R15", "A=M", "M=D"]);
            return;
        }
        let target = match (segment, segment.window()) {
            (Segment::Static, _) => format!("@{}.{}", unit, index),
            (_, Some((base, _))) => format!("@{}", base + index),
            // Constants are rejected by the parser.
            _ => return,
        };
        self.pop_d();
        self.lines(&[&target, "M=D"]);
    }

    fn arithmetic(&mut self, op: Arithmetic) {
        let binary = |w: &mut Self, compute: &str| {
            w.lines(&["@SP", "AM=M-1", "D=M", "A=A-1", compute]);
        };
        match op {
            Arithmetic::Add => binary(self, "M=D+M"),
            Arithmetic::Sub => binary(self, "M=M-D"),
            Arithmetic::And => binary(self, "M=D&M"),
            Arithmetic::Or => binary(self, "M=D|M"),
            Arithmetic::Neg => self.lines(&["@SP", "A=M-1", "M=-M"]),
            Arithmetic::Not => self.lines(&["@SP", "A=M-1", "M=!M"]),
            Arithmetic::Eq => self.compare("JEQ"),
            Arithmetic::Gt => self.compare("JGT"),
            Arithmetic::Lt => self.compare("JLT"),
        }
    }

    /// Replace x, y with -1 if `x - y` satisfies `jump`, else 0.
    fn compare(&mut self, jump: &str) {
        let n = self.compares;
        self.compares += 1;
        let yes = format!("$true.{}", n);
        let done = format!("$cmp.{}", n);
        self.lines(&["@SP", "AM=M-1", "D=M", "A=A-1", "D=M-D"]);
        self.lines(&[&format!("@{}", yes), &format!("D;{}", jump), "D=0"]);
        self.lines(&[&format!("@{}", done), "0;JMP"]);
        self.line(&format!("({})", yes));
        self.line("D=-1");
        self.line(&format!("({})", done));
        self.lines(&["@SP", "A=M-1", "M=D"]);
    }

    fn function(&mut self, name: &str, locals: u16) {
        self.line(&format!("({})", name));
        if locals == 0 {
            return;
        }
        self.lines(&["@SP", "A=M"]);
        for _ in 0..locals {
            self.lines(&["M=0", "A=A+1"]);
        }
        self.lines(&["D=A", "@SP", "M=D"]);
    }

    fn call(&mut self, name: &str, args: u16) {
        let ret = format!("$ret.{}", self.calls);
        self.calls += 1;

        self.lines(&[&format!("@{}", ret), "D=A"]);
        self.push_d();
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            self.lines(&[&format!("@{}", saved), "D=M"]);
            self.push_d();
        }
        // ARG = SP - args - frame
        self.lines(&[&format!("@{}", args + FRAME_SIZE), "D=A", "@SP", "D=M-D", "@ARG", "M=D"]);
        self.lines(&["@SP", "D=M", "@LCL", "M=D"]);
        self.lines(&[&format!("@{}", name), "0;JMP"]);
        self.line(&format!("({})", ret));
    }

    fn ret(&mut self) {
        self.pop_d();
        self.lines(&["@R15", "M=D"]);
        self.lines(&["@ARG", "D=M", "@R14", "M=D"]);
        self.lines(&["@LCL", "D=M", "@SP", "M=D"]);
        for saved in ["THAT", "THIS", "ARG", "LCL"] {
            self.pop_d();
            self.lines(&[&format!("@{}", saved), "M=D"]);
        }
        self.pop_d();
        self.lines(&["@R13", "M=D"]);
        // SP = old ARG + 1, return value at old ARG
        self.lines(&["@R14", "D=M", "@SP", "M=D+1"]);
        self.lines(&["@R15", "D=M", "@SP", "A=M-1", "M=D"]);
        self.lines(&["@R13", "A=M", "0;JMP"]);
    }
}

/// Labels inside a function are private to it.
fn scoped(function: Option<&str>, label: &str) -> String {
    match function {
        Some(f) => format!("{}${}", f, label),
        None => label.to_string(),
    }
}

/// Errors that can occur while parsing VM source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("unknown command on line {line}: {command}")]
    UnknownCommand { line: usize, command: String },

    #[error("wrong argument count on line {line}: {command} takes {expected}")]
    ArgumentCount { line: usize, command: String, expected: usize },

    #[error("not a number on line {line}: {value}")]
    NotANumber { line: usize, value: String },

    #[error("value out of range on line {line}: {value}")]
    OutOfRange { line: usize, value: String },

    #[error("unknown segment on line {line}: {segment}")]
    UnknownSegment { line: usize, segment: String },

    #[error("invalid symbol on line {line}: {symbol}")]
    InvalidSymbol { line: usize, symbol: String },

    #[error("too many locals on line {line}: {locals}")]
    TooManyLocals { line: usize, locals: u16 },

    #[error("cannot pop constant on line {line}")]
    PopConstant { line: usize },

    #[error("{segment} index out of bounds on line {line}: {index}")]
    OutOfBounds { line: usize, segment: Segment, index: u16 },

    #[error("invalid unit name: {0}")]
    InvalidUnitName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::cpu::Machine;

    fn run(units: &[(&str, &str)], max_cycles: u64) -> Machine {
        let units: Vec<VmUnit> = units
            .iter()
            .map(|(name, source)| parse_unit(name, source).unwrap())
            .collect();
        let program = assemble(&translate(&units)).unwrap();
        let mut m = Machine::with_program(&program).unwrap();
        m.run_limited(max_cycles).unwrap();
        m
    }

    fn ram(m: &Machine, addr: u16) -> i16 {
        m.ram.read(Address::new(addr)).to_i16()
    }

    #[test]
    fn test_simple_add() {
        let m = run(&[("Main", "push constant 7\npush constant 8\nadd")], 1000);
        assert!(m.is_halted());
        assert_eq!(ram(&m, 0), 257);
        assert_eq!(ram(&m, 256), 15);
    }

    #[test]
    fn test_arithmetic_and_logic() {
        let source = "
            push constant 10
            push constant 3
            sub
            push constant 2
            neg
            push constant 12
            push constant 10
            and
            push constant 12
            push constant 10
            or
            push constant 0
            not
        ";
        let m = run(&[("Main", source)], 1000);
        assert!(m.is_halted());
        assert_eq!(ram(&m, 0), 261);
        let stack: Vec<i16> = (256..261).map(|a| ram(&m, a)).collect();
        assert_eq!(stack, [7, -2, 8, 14, -1]);
    }

    #[test]
    fn test_comparisons() {
        let source = "
            push constant 5
            push constant 5
            eq
            push constant 5
            push constant 6
            eq
            push constant 4
            push constant 3
            gt
            push constant 3
            push constant 4
            gt
            push constant 3
            push constant 4
            lt
            push constant 4
            push constant 4
            lt
        ";
        let m = run(&[("Main", source)], 1000);
        let stack: Vec<i16> = (256..262).map(|a| ram(&m, a)).collect();
        assert_eq!(stack, [-1, 0, -1, 0, -1, 0]);
    }

    #[test]
    fn test_pointer_segments() {
        let source = "
            push constant 3000
            pop pointer 0
            push constant 4000
            pop pointer 1
            push constant 42
            pop this 2
            push constant 7
            pop that 0
            push this 2
            push that 0
            add
            pop temp 6
        ";
        let m = run(&[("Main", source)], 1000);
        assert_eq!(ram(&m, 3), 3000);
        assert_eq!(ram(&m, 4), 4000);
        assert_eq!(ram(&m, 3002), 42);
        assert_eq!(ram(&m, 4000), 7);
        assert_eq!(ram(&m, 11), 49);
        assert_eq!(ram(&m, 0), 256);
    }

    #[test]
    fn test_loop_with_branches() {
        let source = "
            push constant 0
            pop temp 0
            push constant 10
            pop temp 1
            label LOOP
            push temp 0
            push temp 1
            add
            pop temp 0
            push temp 1
            push constant 1
            sub
            pop temp 1
            push temp 1
            if-goto LOOP
        ";
        let m = run(&[("Main", source)], 10_000);
        assert!(m.is_halted());
        assert_eq!(ram(&m, 5), 55);
        assert_eq!(ram(&m, 6), 0);
    }

    #[test]
    fn test_call_through_sys_init() {
        let sys = "
            function Sys.init 0
            push constant 4
            call Main.double 1
            pop static 0
            label END
            goto END
        ";
        let main = "
            function Main.double 1
            push argument 0
            push argument 0
            add
            pop local 0
            push local 0
            return
        ";
        let m = run(&[("Sys", sys), ("Main", main)], 10_000);
        assert!(m.is_halted());
        // Sys.0 is the first variable.
        assert_eq!(ram(&m, 16), 8);
    }

    #[test]
    fn test_recursive_fibonacci() {
        let sys = "
            function Sys.init 0
            push constant 10
            call Main.fib 1
            pop temp 0
            label HALT
            goto HALT
        ";
        let main = "
            function Main.fib 0
            push argument 0
            push constant 2
            lt
            if-goto BASE
            push argument 0
            push constant 1
            sub
            call Main.fib 1
            push argument 0
            push constant 2
            sub
            call Main.fib 1
            add
            return
            label BASE
            push argument 0
            return
        ";
        let m = run(&[("Sys", sys), ("Main", main)], 1_000_000);
        assert!(m.is_halted());
        assert_eq!(ram(&m, 5), 55);
    }

    #[test]
    fn test_labels_scoped_to_function() {
        let asm = translate_source("Main", "
            function Main.f 0
            label LOOP
            goto LOOP
        ").unwrap();
        assert!(asm.contains("(Main.f$LOOP)"));
        assert!(asm.contains("@Main.f$LOOP"));
        assert!(asm.contains("// goto LOOP"));
    }

    #[test]
    fn test_parse_commands() {
        let commands = parse("push static 5 // trailing\n\n  call Math.mul 2\nreturn").unwrap();
        assert_eq!(commands, [
            Command::Push(Segment::Static, 5),
            Command::Call { name: "Math.mul".into(), args: 2 },
            Command::Return,
        ]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("push constant 0\nmwaaah"),
            Err(VmError::UnknownCommand { line: 2, command: "mwaaah".into() })
        );
        assert_eq!(
            parse("push me"),
            Err(VmError::ArgumentCount { line: 1, command: "push".into(), expected: 2 })
        );
        assert_eq!(
            parse("add 5"),
            Err(VmError::ArgumentCount { line: 1, command: "add".into(), expected: 0 })
        );
        assert_eq!(
            parse("push constant struggle"),
            Err(VmError::NotANumber { line: 1, value: "struggle".into() })
        );
        assert_eq!(
            parse("push me away"),
            Err(VmError::UnknownSegment { line: 1, segment: "me".into() })
        );
        assert_eq!(
            parse("label 5"),
            Err(VmError::InvalidSymbol { line: 1, symbol: "5".into() })
        );
        assert_eq!(
            parse("function prod 1025"),
            Err(VmError::TooManyLocals { line: 1, locals: 1025 })
        );
        assert_eq!(
            parse("push constant 32768"),
            Err(VmError::OutOfRange { line: 1, value: "32768".into() })
        );
        assert_eq!(parse("pop constant 1"), Err(VmError::PopConstant { line: 1 }));
        assert_eq!(
            parse("push pointer 2"),
            Err(VmError::OutOfBounds { line: 1, segment: Segment::Pointer, index: 2 })
        );
        assert!(parse("pop temp 7").is_ok());
        assert!(matches!(parse("pop temp 8"), Err(VmError::OutOfBounds { .. })));
        assert_eq!(
            parse_unit("9lives", ""),
            Err(VmError::InvalidUnitName("9lives".into()))
        );
    }
}
