use logos::{Logos, Lexer};

use super::program::{OpCode, PseudoOpCode};

/// Tokens of the assembly source language.
///
/// Whitespace, commas and `;` comments are skipped. Newlines are significant:
/// they terminate statements.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    #[token(",", logos::skip)]
    Error,

    #[token("\n")]
    Newline,

    #[regex("noop|subleq|add|sub|zer|mov|jmp|beq|cmp|in|out|halt", operator_callback)]
    Operator(OpCode),

    #[regex("int|bytes", pseudo_operator_callback)]
    PseudoOperator(PseudoOpCode),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Symbol(&'a str),

    #[regex("-?[0-9][0-9a-zA-Z_]*", literal_callback)]
    Literal(i64),

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, string_callback)]
    String(Vec<u8>),

    #[regex(r"#set[ \t]+[A-Za-z_][A-Za-z0-9_]*=[^ \t\r\n;,]+", directive_callback)]
    Directive((&'a str, &'a str)),

    #[token(":")]
    Colon,

    #[token("+")]
    Plus,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,
}

fn operator_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> std::result::Result<OpCode, ()> {
    let opcode = match lex.slice() {
        "noop"   => OpCode::NoOperation,
        "subleq" => OpCode::Subleq,
        "add"    => OpCode::Add,
        "sub"    => OpCode::Subtract,
        "zer"    => OpCode::Zero,
        "mov"    => OpCode::Move,
        "jmp"    => OpCode::Jump,
        "beq"    => OpCode::BranchZero,
        "cmp"    => OpCode::Compare,
        "in"     => OpCode::In,
        "out"    => OpCode::Out,
        "halt"   => OpCode::Halt,
        _ => return Err(()),
    };

    Ok(opcode)
}

fn pseudo_operator_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> std::result::Result<PseudoOpCode, ()> {
    match lex.slice() {
        "int" => Ok(PseudoOpCode::Int),
        "bytes" => Ok(PseudoOpCode::Bytes),
        _ => Err(()),
    }
}

/// Parses decimal, `0x` and `0b` literals, with an optional leading minus.
/// Trailing junk ("0xg", "12ab") makes the whole token an error.
fn literal_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> std::result::Result<i64, std::num::ParseIntError> {
    let slice = lex.slice();

    let (negative, digits) = match slice.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, slice),
    };

    let magnitude = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(binary) = digits.strip_prefix("0b") {
        i64::from_str_radix(binary, 2)
    } else {
        digits.parse()
    };

    magnitude.map(|value| if negative { -value } else { value })
}

/// Strips the surrounding quotes and resolves escapes: a backslash makes the
/// following byte literal.
fn string_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Vec<u8> {
    let slice = lex.slice();
    let mut bytes = Vec::with_capacity(slice.len());
    let mut rest = slice[1..slice.len() - 1].bytes();

    while let Some(byte) = rest.next() {
        match byte {
            b'\\' => bytes.extend(rest.next()),
            _ => bytes.push(byte),
        }
    }

    bytes
}

fn directive_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<(&'a str, &'a str)> {
    let pair = lex.slice()["#set".len()..].trim_start();
    let equals = pair.find('=')?;

    Some((&pair[..equals], &pair[equals + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Token::lexer(input).collect()
    }

    #[test]
    fn lex_instruction_line() {
        assert_eq!(
            lex("loop: add counter one ; bump\n"),
            vec![
                Token::Symbol("loop"),
                Token::Colon,
                Token::Operator(OpCode::Add),
                Token::Symbol("counter"),
                Token::Symbol("one"),
                Token::Newline,
            ],
        );
    }

    #[test]
    fn lex_literals() {
        assert_eq!(
            lex("int -12 0x22 0b101 -0x10"),
            vec![
                Token::PseudoOperator(PseudoOpCode::Int),
                Token::Literal(-12),
                Token::Literal(0x22),
                Token::Literal(0b101),
                Token::Literal(-0x10),
            ],
        );
    }

    #[test]
    fn lex_malformed_literal() {
        assert_eq!(lex("0xg7"), vec![Token::Error]);
        assert_eq!(lex("12ab"), vec![Token::Error]);
    }

    #[test]
    fn lex_operand_punctuation() {
        assert_eq!(
            lex("out [msg] msg+1"),
            vec![
                Token::Operator(OpCode::Out),
                Token::BracketOpen,
                Token::Symbol("msg"),
                Token::BracketClose,
                Token::Symbol("msg"),
                Token::Plus,
                Token::Literal(1),
            ],
        );
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(
            lex(r#"bytes "a\"b\\c""#),
            vec![
                Token::PseudoOperator(PseudoOpCode::Bytes),
                Token::String(b"a\"b\\c".to_vec()),
            ],
        );
    }

    #[test]
    fn lex_unterminated_string() {
        assert!(lex("bytes \"oops\n").contains(&Token::Error));
    }

    #[test]
    fn lex_directive() {
        assert_eq!(
            lex("#set ENTRY=main\n"),
            vec![
                Token::Directive(("ENTRY", "main")),
                Token::Newline,
            ],
        );
    }

    #[test]
    fn lex_mnemonic_prefixed_identifier() {
        // Maximal munch: identifiers that merely start with a mnemonic stay
        // identifiers.
        assert_eq!(
            lex("in input"),
            vec![
                Token::Operator(OpCode::In),
                Token::Symbol("input"),
            ],
        );
    }

    #[test]
    fn lex_unexpected_character() {
        assert_eq!(lex("$x"), vec![Token::Error, Token::Symbol("x")]);
    }
}
