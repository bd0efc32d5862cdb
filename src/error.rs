//! Error types reported by the assembler.

use std::fmt::{self, Display};

use logos::Span;

use crate::bytecode::Width;

/// The reasons an assembly source can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The lexer could not recognize a token: an unterminated string, a
    /// malformed number or a stray character.
    Lex,

    /// The token stream did not match the statement grammar.
    Parse {
        /// User facing description of what was expected and what was found.
        message: String,
    },

    /// An identifier in mnemonic position does not name an operation.
    UnknownMnemonic {
        mnemonic: String,
    },

    /// An instruction was given the wrong number of operands.
    BadOperandCount {
        mnemonic: &'static str,
        expected: usize,
        got: usize,
    },

    /// A label was defined more than once.
    DuplicateLabel {
        label: String,
    },

    /// An operand or the ENTRY directive references an undefined label.
    UnknownLabel {
        label: String,
    },

    /// A resolved cell value does not fit the configured cell width.
    Range {
        /// Index of the offending cell in the image.
        address: usize,
        value: i64,
        width: Width,
    },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Lex => write!(f, "unrecognized token"),
            ErrorKind::Parse { message } => write!(f, "{}", message),
            ErrorKind::UnknownMnemonic { mnemonic } =>
                write!(f, "unknown mnemonic '{}'", mnemonic),
            ErrorKind::BadOperandCount { mnemonic, expected, got } =>
                write!(f, "'{}' takes {} operand(s), got {}", mnemonic, expected, got),
            ErrorKind::DuplicateLabel { label } =>
                write!(f, "label '{}' defined multiple times", label),
            ErrorKind::UnknownLabel { label } =>
                write!(f, "unknown label '{}'", label),
            ErrorKind::Range { address, value, width } =>
                write!(f, "value {} at cell {} does not fit in a {} byte cell", value, address, width),
        }
    }
}

/// Error type that contains the reason of the error and, when one is known,
/// the span of the offending source text.
///
/// For error location information see [SourceError::verbose].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

impl SourceError {
    pub(crate) fn new(span: Span, kind: ErrorKind) -> SourceError {
        SourceError {
            kind,
            span: Some(span),
        }
    }

    pub(crate) fn spanless(kind: ErrorKind) -> SourceError {
        SourceError {
            kind,
            span: None,
        }
    }

    /// Calculates the error location information from the [SourceError] and
    /// the original input buffer.
    ///
    /// # Parameters
    /// - `source`: The original input buffer or an exact copy of it.
    pub fn verbose<'a>(&self, source: &'a str) -> VerboseSourceError<'a> {
        let span = match &self.span {
            Some(span) => span.clone(),
            None => {
                return VerboseSourceError {
                    line: 0,
                    column: 0,
                    kind: self.kind.clone(),
                    rest: None,
                };
            }
        };

        let mut line = 1;
        let mut column = 1;

        for ch in source[..span.start].chars() {
            if ch == '\n' {
                line += 1;
                column = 0;
            }

            column += 1;
        }

        let mut end = span.start;

        for ch in source[span.start..].chars() {
            if ch == '\n' || end - span.start > 20 {
                break;
            }

            end += ch.len_utf8();
        }

        VerboseSourceError {
            line,
            column,
            kind: self.kind.clone(),
            rest: Some(&source[span.start..end]),
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for SourceError {}

/// Error type containing line and column information in addition to the
/// reason of the error.
///
/// Created from a [SourceError] with [SourceError::verbose].
#[derive(Debug, Clone)]
pub struct VerboseSourceError<'a> {
    /// The line number of the error location, starting from 1.
    /// Zero when the error has no source location.
    pub line: usize,
    /// The column number of the error location.
    pub column: usize,
    kind: ErrorKind,
    rest: Option<&'a str>,
}

impl<'a> Display for VerboseSourceError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rest {
            Some(rest) =>
                write!(f, "at line {} col {}: {}, at '{}'", self.line, self.column, self.kind, rest),
            None => write!(f, "{}", self.kind),
        }
    }
}
