//! Line based assembler text.
//!
//! ```text
//! # print "A"
//! SEL 0x00
//! LDC 0x0041
//! WAW
//! HLT
//! ```
//!
//! Operands follow the mnemonic, separated by whitespace or commas. Lines
//! starting with `!` hold a raw byte, lines starting with `!W` a raw word.

use std::error;
use std::str::FromStr;
use std::{borrow::Cow, fmt, str::Lines};

use crate::memory::{Byte, Word};
use crate::processor::{Instruction, Operand};

use super::ProgramBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidLiteral,
    InvalidNumber { radix: u32 },
    InvalidInstruction,
    OperandCount { expected: usize, found: usize },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidLiteral => f.write_str("invalid literal"),
            ParseErrorKind::InvalidNumber { radix } => {
                write!(f, "failed to parse number with radix `{}`", radix)
            }
            ParseErrorKind::InvalidInstruction => f.write_str("failed to resolve instruction"),
            ParseErrorKind::OperandCount { expected, found } => {
                write!(f, "expected {} operand(s), found {}", expected, found)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

/// Every error found in a source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.0.iter();
        if let Some(first) = errors.next() {
            write!(f, "{}", first)?;
        }
        for err in errors {
            write!(f, "\n{}", err)?;
        }
        Ok(())
    }
}

impl error::Error for ParseErrors {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

macro_rules! parse_number {
    ( $ty:ty: $s:expr ) => {{
        let text: &str = $s;

        let (radix, offset) = match text.as_bytes() {
            [b'0', b'b', ..] => (2, 2),
            [b'0', b'o', ..] => (8, 2),
            [b'0', b'x', ..] => (16, 2),
            _ => (10, 0),
        };

        <$ty>::from_str_radix(&text[offset..], radix).map_err(|_| radix)
    }};
}

#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    builder: ProgramBuilder,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for `data`.
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            builder: ProgramBuilder::new(),
        }
    }

    /// Consumes `self` and tries to assemble all of `data`.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<ProgramBuilder, ParseErrors> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(self.builder)
        } else {
            Err(ParseErrors(errors))
        }
    }

    /// Tries to parse the next line. Each instruction should be located on
    /// its own line, together with its operands.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        if line.is_empty() || line.starts_with('#') {
            // Comment or empty line; skip
            Some(Ok(()))
        } else if let Some(literal) = line.strip_prefix('!') {
            Some(self.parse_literal(literal))
        } else {
            Some(self.parse_instruction(line))
        }
    }

    /// Tries to parse a literal, with the leading `!` already stripped.
    ///
    /// # Examples
    ///
    /// - `! 0x22`
    /// - `!W0xdead`
    fn parse_literal(&mut self, line: &str) -> Result<()> {
        let (is_word, text) = match line.strip_prefix('W') {
            Some(text) => (true, text.trim()),
            None => (false, line.trim()),
        };

        if text.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidLiteral,
                "a literal needs to have a number set",
                self.line_nr,
            ));
        }

        if is_word {
            log::debug!("[{}] Found word literal", self.line_nr);
            let word = self.parse_word(text)?;
            self.builder.add_word_parameter(word);
        } else {
            log::debug!("[{}] Found byte literal", self.line_nr);
            let byte = self.parse_byte(text)?;
            self.builder.add_byte_parameter(byte);
        }

        Ok(())
    }

    /// Tries to parse an instruction and its operands.
    ///
    /// # Examples
    ///
    /// - `LDC 0x22`
    /// - `CMP 0x00, 0x02`
    /// - `HLT`
    fn parse_instruction(&mut self, line: &str) -> Result<()> {
        let mut parts = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty());
        let name = parts.next().unwrap_or_default();
        let operands: Vec<&str> = parts.collect();

        let instruction = *Instruction::ALL
            .iter()
            .find(|instruction| name.eq_ignore_ascii_case(instruction.name()))
            .ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::InvalidInstruction,
                    format!("no instruction named `{}`", name),
                    self.line_nr,
                )
            })?;

        log::debug!("[{}] Found instruction {}", self.line_nr, instruction);

        let expected = match instruction.operand() {
            Operand::None => 0,
            Operand::Byte | Operand::Word => 1,
            Operand::TwoWords => 2,
        };
        if operands.len() != expected {
            return Err(ParseError::new(
                ParseErrorKind::OperandCount {
                    expected,
                    found: operands.len(),
                },
                format!("for `{}`", instruction),
                self.line_nr,
            ));
        }

        // Check every operand before appending anything
        match instruction.operand() {
            Operand::None => {
                self.builder.add_instruction(instruction);
            }
            Operand::Byte => {
                let byte = self.parse_byte(operands[0])?;
                self.builder
                    .add_instruction(instruction)
                    .add_byte_parameter(byte);
            }
            Operand::Word => {
                let word = self.parse_word(operands[0])?;
                self.builder
                    .add_instruction(instruction)
                    .add_word_parameter(word);
            }
            Operand::TwoWords => {
                let first = self.parse_word(operands[0])?;
                let second = self.parse_word(operands[1])?;
                self.builder
                    .add_instruction(instruction)
                    .add_word_parameter(first)
                    .add_word_parameter(second);
            }
        }

        Ok(())
    }

    fn parse_byte(&self, text: &str) -> Result<Byte> {
        parse_number!(u8: text).map_err(|radix| {
            ParseError::new(
                ParseErrorKind::InvalidNumber { radix },
                format!("`{}` is not a byte", text),
                self.line_nr,
            )
        })
    }

    fn parse_word(&self, text: &str) -> Result<Word> {
        parse_number!(u16: text).map_err(|radix| {
            ParseError::new(
                ParseErrorKind::InvalidNumber { radix },
                format!("`{}` is not a word", text),
                self.line_nr,
            )
        })
    }
}

impl FromStr for ProgramBuilder {
    type Err = ParseErrors;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Parser::new(data).parse()
    }
}
