//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: Second stage of the pipeline. Takes tokens from the Lexer and
//! builds an Expr tree that the evaluator can walk.
//!
//! GRAMMAR:
//!   expression     --> or
//!   or             --> and ( "||" and )*
//!   and            --> comparison ( "&&" comparison )*
//!   comparison     --> additive ( ("==" | "!=" | "<" | ">" | "<=" | ">=") additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> "-" unary | primary
//!   primary        --> NUMBER | PLACEHOLDER | "(" expression ")"

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::lexer::Lexer;
use crate::token::Token;
use thiserror::Error;

/// Parse failures with descriptive messages. Handlers map this to the
/// `InvalidExpression` rejection, so the message is user-facing.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("Expressão inválida: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete expression string into an AST.
pub fn parse(input: &str) -> ParseResult<Expr> {
    Parser::new(input).parse()
}

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the entire input and returns the AST.
    pub fn parse(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Eof {
            return Err(ParseError::new("expressão vazia"));
        }

        let expr = self.parse_expression()?;

        // Ensure we consumed all tokens
        if self.current_token != Token::Eof {
            return Err(ParseError::new(format!(
                "símbolo inesperado após a expressão: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    /// Parses boolean OR expressions (||).
    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;

        while self.current_token == Token::OrOr {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses boolean AND expressions (&&).
    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;

        while self.current_token == Token::AndAnd {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses comparison expressions (==, !=, <, >, <=, >=).
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match &self.current_token {
                Token::EqualEqual => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_additive()?;

            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses additive expressions (+ and -).
    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses multiplicative expressions (* and /).
    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses unary expressions (negation).
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    /// Parses primary expressions (literals, placeholders, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current_token.clone() {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Token::Placeholder(name) => {
                if name.is_empty() {
                    return Err(ParseError::new("a expressão contém identificadores vazios"));
                }
                self.advance();
                Ok(Expr::Placeholder(name))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                if self.current_token != Token::RParen {
                    return Err(ParseError::new("parêntese de fechamento ausente"));
                }
                self.advance();
                Ok(expr)
            }
            Token::Eof => Err(ParseError::new("expressão terminou inesperadamente")),
            other => Err(ParseError::new(format!("símbolo inesperado: {}", other))),
        }
    }
}
