//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw expression string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing (both `.` and `,` accepted as the
//! decimal separator, optional `R$` prefix), `{placeholder}` fields and
//! multi-character operators like <=, >=, ==, != , && and ||.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ( ) < >
//! - Multi char: <= >= == != && ||
//! - Placeholders: {any text except closing brace}

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            Some('{') => self.read_placeholder(),

            Some('=') => self.read_pair('=', Token::EqualEqual),
            Some('!') => self.read_pair('=', Token::NotEqual),
            Some('&') => self.read_pair('&', Token::AndAnd),
            Some('|') => self.read_pair('|', Token::OrOr),

            Some('<') => match self.input.peek() {
                Some('=') => {
                    self.input.next();
                    Token::LessEqual
                }
                _ => Token::LessThan,
            },
            Some('>') => match self.input.peek() {
                Some('=') => {
                    self.input.next();
                    Token::GreaterEqual
                }
                _ => Token::GreaterThan,
            },

            // Currency prefix: "R$ 1.234,56" lexes as the plain number.
            Some('R') if self.input.peek() == Some(&'$') => {
                self.input.next();
                self.skip_whitespace();
                match self.input.next() {
                    Some(ch) if ch.is_ascii_digit() || ch == '.' || ch == ',' => {
                        self.read_number(ch)
                    }
                    Some(ch) => Token::Illegal(ch),
                    None => Token::Eof,
                }
            }

            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            None => Token::Eof,

            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads a two-character operator where both characters are known, e.g.
    /// `==`. A lone first character is illegal in this grammar.
    fn read_pair(&mut self, second: char, token: Token) -> Token {
        if self.input.peek() == Some(&second) {
            self.input.next();
            token
        } else {
            Token::Illegal(second)
        }
    }

    /// Reads a `{placeholder}` field. The text between the braces is kept
    /// verbatim apart from surrounding whitespace; an unterminated
    /// placeholder consumes the rest of the input.
    fn read_placeholder(&mut self) -> Token {
        let mut inner = String::new();
        while let Some(&ch) = self.input.peek() {
            if ch == '}' {
                self.input.next();
                return Token::Placeholder(inner.trim().to_string());
            }
            inner.push(ch);
            self.input.next();
        }
        Token::Placeholder(inner.trim().to_string())
    }

    /// Reads a numeric literal. Both `.` and `,` are accepted; when both
    /// appear the right-most one is the decimal separator and the other is
    /// treated as a thousands separator.
    fn read_number(&mut self, first: char) -> Token {
        let mut raw = String::new();
        raw.push(first);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() || ch == '.' || ch == ',' {
                raw.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match parse_decimal(&raw) {
            Some(value) => Token::Number(value),
            None => Token::Illegal(first),
        }
    }
}

/// Parses a numeric literal accepting `.` and `,` as decimal separators.
/// `1.234,56` and `1,234.56` both resolve to 1234.56.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let has_comma = text.contains(',');
    let has_dot = text.contains('.');
    let normalized = if has_comma && has_dot {
        if text.rfind(',') > text.rfind('.') {
            text.replace('.', "").replace(',', ".")
        } else {
            text.replace(',', "")
        }
    } else if has_comma {
        text.replace(',', ".")
    } else {
        text.to_string()
    };
    normalized.parse::<f64>().ok()
}
