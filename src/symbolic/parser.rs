//! Parser from the token stream to the statement sequence.
//!
//! The grammar is line oriented: every line holds any number of label
//! definitions followed by at most one statement. You probably want to use
//! this via [Program::parse](crate::symbolic::Program::parse).

use logos::{Logos, Span};

use super::program::{
    Instruction,
    OpCode,
    Operand,
    Program,
    PseudoOpCode,
    RawData,
    Statement,
    StatementEntry,
    Value,
};
use super::token::Token;
use crate::error::{ErrorKind, SourceError};

type Result<T> = std::result::Result<T, SourceError>;

/// Parse an entire assembly program.
///
/// You probably want to use this via
/// [Program::parse](crate::symbolic::Program::parse).
pub fn parse_source(source: &str) -> Result<Program> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        if token == Token::Error {
            return Err(SourceError::new(lexer.span(), ErrorKind::Lex));
        }

        tokens.push((token, lexer.span()));
    }

    let mut parser = Parser {
        tokens,
        position: 0,
        last_end: 0,
    };

    parser.take_program()
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,

    /// End offset of the most recently consumed token. Used for statement
    /// spans and end-of-file diagnostics.
    last_end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn peek_second(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position + 1).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        let entry = self.tokens.get(self.position).cloned();

        if let Some((_, span)) = &entry {
            self.position += 1;
            self.last_end = span.end;
        }

        entry
    }

    /// Builds a parse error from a token that did not match, or from the end
    /// of the file.
    fn expected<T>(&self, what: &str, got: Option<(Token<'a>, Span)>) -> Result<T> {
        Err(match got {
            Some((token, span)) => SourceError::new(span, ErrorKind::Parse {
                message: format!("expected {}, got {:?}", what, token),
            }),
            None => SourceError::new(self.last_end..self.last_end, ErrorKind::Parse {
                message: format!("expected {}, got the end of the file", what),
            }),
        })
    }

    fn take_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while self.peek().is_some() {
            self.take_line(&mut statements)?;
        }

        Ok(Program { statements })
    }

    fn take_line(&mut self, statements: &mut Vec<StatementEntry>) -> Result<()> {
        while let (Some(Token::Symbol(_)), Some(Token::Colon)) = (self.peek(), self.peek_second()) {
            if let Some((Token::Symbol(label), span)) = self.next() {
                self.next();

                statements.push(StatementEntry {
                    statement: Statement::Label(label.to_string()),
                    span: span.start..self.last_end,
                });
            }
        }

        match self.next() {
            None => return Ok(()),
            Some((Token::Newline, _)) => return Ok(()),

            Some((Token::Directive((key, value)), span)) => {
                statements.push(StatementEntry {
                    statement: Statement::Directive {
                        key: key.to_string(),
                        value: value.to_string(),
                    },
                    span,
                });
            },

            Some((Token::Operator(opcode), span)) => {
                statements.push(self.take_instruction(opcode, span)?);
            },

            Some((Token::PseudoOperator(opcode), span)) => {
                statements.push(self.take_raw(opcode, span)?);
            },

            Some((Token::Symbol(name), span)) => {
                return Err(SourceError::new(span, ErrorKind::UnknownMnemonic {
                    mnemonic: name.to_string(),
                }));
            },

            Some(other) => return self.expected("a statement", Some(other)),
        }

        match self.next() {
            None => Ok(()),
            Some((Token::Newline, _)) => Ok(()),
            Some(other) => self.expected("the end of the line", Some(other)),
        }
    }

    fn take_instruction(&mut self, opcode: OpCode, span: Span) -> Result<StatementEntry> {
        let mut operands = Vec::new();

        while self.at_operand() {
            operands.push(self.take_operand()?);
        }

        if operands.len() != opcode.arity() {
            return Err(SourceError::new(span, ErrorKind::BadOperandCount {
                mnemonic: opcode.mnemonic(),
                expected: opcode.arity(),
                got: operands.len(),
            }));
        }

        Ok(StatementEntry {
            statement: Statement::Instr(Instruction { opcode, operands }),
            span: span.start..self.last_end,
        })
    }

    fn take_raw(&mut self, opcode: PseudoOpCode, span: Span) -> Result<StatementEntry> {
        let data = match opcode {
            PseudoOpCode::Int => RawData::Int(self.take_operand()?),
            PseudoOpCode::Bytes => match self.next() {
                Some((Token::String(bytes), _)) => RawData::Bytes(bytes),
                other => return self.expected("a string literal", other),
            },
        };

        Ok(StatementEntry {
            statement: Statement::Raw(data),
            span: span.start..self.last_end,
        })
    }

    fn at_operand(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Symbol(_)) | Some(Token::Literal(_)) | Some(Token::BracketOpen)
        )
    }

    fn take_operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some((Token::Literal(value), _)) => Ok(Operand::Address(value)),

            Some((Token::Symbol(label), _)) => {
                if let Some(Token::Plus) = self.peek() {
                    self.next();

                    match self.next() {
                        Some((Token::Literal(offset), _)) => Ok(Operand::Symbol {
                            label: label.to_string(),
                            offset,
                        }),
                        other => self.expected("an offset", other),
                    }
                } else {
                    Ok(Operand::Symbol {
                        label: label.to_string(),
                        offset: 0,
                    })
                }
            },

            Some((Token::BracketOpen, _)) => {
                let value = match self.next() {
                    Some((Token::Literal(value), _)) => Value::Literal(value),
                    Some((Token::Symbol(label), _)) => Value::Symbol(label.to_string()),
                    other => return self.expected("a label or an integer", other),
                };

                match self.next() {
                    Some((Token::BracketClose, _)) => Ok(Operand::Immediate(value)),
                    other => self.expected("a closing bracket", other),
                }
            },

            other => self.expected("an operand", other),
        }
    }
}
