use std::fmt;
use std::num::ParseIntError;

use miette::{miette, LabeledSpan, Report, Severity};

use crate::memory::Cell;
use crate::span::Span;

// Lexer errors

pub fn lex_invalid_lit(span: Span, src: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_lit",
        help = "cell literals are decimal or 0x-prefixed hex, up to 32 bits",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal: {e}",
    )
    .with_source_code(src.to_string())
}

pub fn lex_empty_ref(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::empty_ref",
        help = "references name a `let` binding, like &cursor",
        labels = vec![LabeledSpan::at(span, "reference with no name")],
        "Encountered a reference with no name.",
    )
    .with_source_code(src.to_string())
}

// Assembler errors

pub fn asm_expected_name(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::let_name",
        help = "`let` takes a name, then an optional value or [list]",
        labels = vec![LabeledSpan::at(span, "not a name")],
        "Expected a name after `let`.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_value(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::let_value",
        help = "a `let` initializer is a number or a [list] of numbers",
        labels = vec![LabeledSpan::at(span, "not a value")],
        "Expected a value after `,`.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_bad_list(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::list",
        help = "lists look like [1, 0x2F, 3]",
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Malformed cell list.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_unterminated_list(src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::list_eof",
        help = "close the list with ]",
        labels = vec![LabeledSpan::at_offset(
            src.len().saturating_sub(1),
            "list still open here"
        )],
        "Unterminated cell list.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_empty_list(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::list_empty",
        help = "reserve one cell by omitting the initializer instead",
        labels = vec![LabeledSpan::at(span, "empty list")],
        "Empty cell lists are not allowed.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_duplicate(span: Span, src: &str, what: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::duplicate",
        help = "names can only be bound once per file",
        labels = vec![LabeledSpan::at(span, "already bound")],
        "Duplicate {what}.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_unknown_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_label",
        help = "define it with `name:` somewhere in the file",
        labels = vec![LabeledSpan::at(span, "unknown label")],
        "Encountered an undefined label.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_unknown_ref(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_ref",
        help = "declare the binding first, like `let name` or `let name, 3`",
        labels = vec![LabeledSpan::at(span, "unknown reference")],
        "Encountered a reference to an undefined binding.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_op(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::opcode",
        help = "every statement starts with an operation mnemonic",
        labels = vec![LabeledSpan::at(span, "not a mnemonic")],
        "Expected an operation.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_operand(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operand",
        help = "a comma must be followed by another operand",
        labels = vec![LabeledSpan::at(span, "dangling comma")],
        "Expected an operand after `,`.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_eof(src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unexpected_eof",
        help = "you may be missing a name or value in your last statement",
        labels = vec![LabeledSpan::at_offset(
            src.len().saturating_sub(1),
            "file ends here"
        )],
        "Unexpected end of file.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_data_overflow(span: Span, src: &str, needed: usize, cap: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::data_size",
        help = "trim `let` initializers or reserve fewer cells",
        labels = vec![LabeledSpan::at(span, "does not fit")],
        "Static data does not fit the data region: {needed} cells of {cap}.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_program_overflow(span: Span, src: &str, cap: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::program_size",
        help = "move large tables into `let` data or shorten the code",
        labels = vec![LabeledSpan::at(span, "region full before here")],
        "Program does not fit the program region of {cap} cells.",
    )
    .with_source_code(src.to_string())
}

// Runtime errors

/// A fault that halts the engine.
///
/// `pc` is always the program-region offset of the faulting opcode, not of
/// the operand that tripped the check.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RuntimeError {
    /// Fetch ran past the program region, through fallthrough or a wild jump.
    PcOutOfBounds { pc: Cell },
    /// A data access landed outside the data region.
    DataOutOfBounds { pc: Cell, addr: Cell },
    DivisionByZero { pc: Cell },
    /// A pop found the operand stack empty.
    StackUnderflow { pc: Cell },
    /// `ret` with no call on record.
    CallStackUnderflow { pc: Cell },
    /// The fetched cell names no operation.
    InvalidOpcode { pc: Cell, raw: Cell },
    /// The `sys` vector names no host service.
    UnknownSysCall { pc: Cell, code: Cell },
}

impl std::error::Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PcOutOfBounds { pc } => {
                write!(f, "program counter left the program region at {pc:#06x}")
            }
            Self::DataOutOfBounds { pc, addr } => {
                write!(f, "data access at {addr:#06x} is outside the data region (pc {pc:#06x})")
            }
            Self::DivisionByZero { pc } => {
                write!(f, "division by zero at {pc:#06x}")
            }
            Self::StackUnderflow { pc } => {
                write!(f, "operand stack underflow at {pc:#06x}")
            }
            Self::CallStackUnderflow { pc } => {
                write!(f, "ret with an empty call stack at {pc:#06x}")
            }
            Self::InvalidOpcode { pc, raw } => {
                write!(f, "cell {raw:#06x} at {pc:#06x} is not an operation")
            }
            Self::UnknownSysCall { pc, code } => {
                write!(f, "unknown system call {code:#06x} at {pc:#06x}")
            }
        }
    }
}
