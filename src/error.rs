use crate::language::Port;
use thiserror::Error;

/// Reasons a source text does not yield an executable program.
///
/// Line numbers are 1-based, as shown in an editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: syntax error: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("line {line}: `{mnemonic}` expects {expected} operand(s), got {got}")]
    Arity {
        line: usize,
        mnemonic: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: invalid operand `{operand}` for `{mnemonic}`")]
    InvalidOperand {
        line: usize,
        mnemonic: &'static str,
        operand: String,
    },

    #[error("line {line}: undefined label `{label}`")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: label `{label}` is already defined")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: port {port} is not connected")]
    UnconnectedPort { line: usize, port: Port },
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            CompileError::Syntax { line, .. }
            | CompileError::UnknownInstruction { line, .. }
            | CompileError::Arity { line, .. }
            | CompileError::InvalidOperand { line, .. }
            | CompileError::UndefinedLabel { line, .. }
            | CompileError::DuplicateLabel { line, .. }
            | CompileError::UnconnectedPort { line, .. } => *line,
        }
    }
}

/// Errors raised while laying out a grid of units.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("node ({row}, {col}) is outside of the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("node ({row}, {col}) is defined twice")]
    Occupied { row: usize, col: usize },

    #[error("node ({row}, {col}): {source}")]
    Compile {
        row: usize,
        col: usize,
        #[source]
        source: CompileError,
    },
}
