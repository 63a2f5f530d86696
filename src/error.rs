//! Syntax error taxonomy for the compiler front end.
//!
//! The original C core reports errors as an out-parameter pair: a `near`
//! byte column and an error code. Here that pair becomes a single
//! `Result<T, Syntax>`, with `Syntax` carrying both pieces so a caller can
//! still recover `(near, kind)` if it wants the old two-value shape (see
//! `Syntax::near`/`Syntax::kind`).

use std::fmt;

use thiserror::Error;

use crate::span::Span;

/// One entry per row of the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unknown error")]
    Unknown,
    #[error("a number can't appear where an operator was expected")]
    UnexpectedNumber,
    #[error("a word can't appear where an operator was expected")]
    UnexpectedWord,
    #[error("a parenthesis isn't permitted here")]
    UnexpectedParens,
    #[error("this operator is missing its left operand")]
    MissExpectedOperand,
    #[error("this punctuation isn't a known operator")]
    UnknownOperator,
    #[error("this call doesn't name a function or a defined macro")]
    InvalidFuncName,
    #[error("a parenthesis can't follow here")]
    BadCall,
    #[error("unmatched or stray parenthesis")]
    BadParens,
    #[error("a macro definition needs at least one argument")]
    TooFewFuncArgs,
    #[error("the first argument to `$(...)` must be a variable")]
    FirstArgIsNotVar,
    #[error("allocation failed")]
    AllocationFailed,
    #[error("malformed number or identifier")]
    BadVariableName,
    #[error("the left-hand side of `=` must be a variable")]
    BadAssignment,
}

impl Default for ErrorKind {
    fn default() -> Self {
        ErrorKind::Unknown
    }
}

/// A syntax error raised while compiling an expression, with the byte
/// column ("near") it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    pub kind: ErrorKind,
    pub near: usize,
}

impl Syntax {
    pub fn new(kind: ErrorKind, near: usize) -> Syntax {
        Syntax { kind, near }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Syntax {
        Syntax {
            kind,
            near: span.offset,
        }
    }

    /// The `near` out-param the original C API exposes.
    pub fn near(&self) -> usize {
        self.near
    }

    /// The error-code out-param the original C API exposes.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (near byte {})", self.kind, self.near)
    }
}

impl std::error::Error for Syntax {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
