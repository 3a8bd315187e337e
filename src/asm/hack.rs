//! `.hack` file format for Hack programs.
//!
//! A `.hack` file is plain text:
//! - One instruction per line, as 16 binary digits (MSB first)
//! - `//` starts a comment
//! - Blank lines are ignored

use crate::logic::Word;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded `.hack` file.
#[derive(Debug, Clone, Default)]
pub struct HackFile {
    /// The program instructions.
    pub instructions: Vec<Word>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl HackFile {
    /// Create a new empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from assembled words.
    pub fn from_words(instructions: &[Word]) -> Self {
        Self {
            instructions: instructions.to_vec(),
            source_lines: instructions.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Add an instruction.
    pub fn push(&mut self, instr: Word, source: &str) {
        self.instructions.push(instr);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Parse `.hack` text.
pub fn parse_hack(text: &str) -> Result<HackFile, HackFileError> {
    let mut file = HackFile::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        if code.len() != Word::WIDTH || !code.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(HackFileError::ParseError {
                line: line_num + 1,
                message: format!("expected 16 binary digits, found {:?}", code),
            });
        }

        let bits = u16::from_str_radix(code, 2).map_err(|e| HackFileError::ParseError {
            line: line_num + 1,
            message: e.to_string(),
        })?;
        file.push(Word::new(bits), line.trim());
    }

    Ok(file)
}

/// Load a `.hack` file from disk.
pub fn load_hack<P: AsRef<Path>>(path: P) -> Result<HackFile, HackFileError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_hack(&text)
}

/// Render words as `.hack` text.
pub fn format_hack(instructions: &[Word]) -> String {
    let mut text = String::with_capacity(instructions.len() * (Word::WIDTH + 1));
    for word in instructions {
        text.push_str(&word.to_string());
        text.push('\n');
    }
    text
}

/// Save a `.hack` file to disk.
pub fn save_hack<P: AsRef<Path>>(path: P, file: &HackFile) -> Result<(), HackFileError> {
    let mut out = std::fs::File::create(path.as_ref())?;
    out.write_all(format_hack(&file.instructions).as_bytes())?;
    Ok(())
}

/// Errors that can occur during `.hack` file operations.
#[derive(Debug, Error)]
pub enum HackFileError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_comments_and_blanks() {
        let text = "// header\n0000000000000101\n\n1110101010000111 // 0;JMP\n";
        let file = parse_hack(text).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.instructions[0].bits(), 5);
        assert_eq!(file.instructions[1].bits(), 0b1110_1010_1000_0111);
        assert_eq!(file.source_lines[1], "1110101010000111 // 0;JMP");
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        let err = parse_hack("0000000000000101\n00102\n").unwrap_err();
        assert!(matches!(err, HackFileError::ParseError { line: 2, .. }));

        let err = parse_hack("00000000000001011").unwrap_err();
        assert!(matches!(err, HackFileError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_format_then_parse() {
        let words = [Word::new(0), Word::new(0x7FFF), Word::new(0xEC10)];
        let file = parse_hack(&format_hack(&words)).unwrap();
        assert_eq!(file.instructions, words);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("hack-emu-test-{}.hack", std::process::id()));
        let file = HackFile::from_words(&[Word::new(42), Word::new(0xFC10)]);
        save_hack(&path, &file).unwrap();
        let loaded = load_hack(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.instructions, file.instructions);
    }

    #[test]
    fn test_missing_file() {
        let err = load_hack("/nonexistent/dir/prog.hack").unwrap_err();
        assert!(matches!(err, HackFileError::IoError(_)));
    }
}
