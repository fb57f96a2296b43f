//! FILENAME: core/parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::eval::{apply_decimals, eval, MapScope};
use crate::lexer::{parse_decimal, Lexer};
use crate::parser::parse;
use crate::token::Token;

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_simple_math() {
    let mut lexer = Lexer::new("1 + 2");
    assert_eq!(lexer.next_token(), Token::Number(1.0));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
    assert_eq!(lexer.next_token(), Token::Eof);
}

#[test]
fn lexer_tokenizes_placeholder() {
    let mut lexer = Lexer::new("{Total estimado Anual} * 2");
    assert_eq!(
        lexer.next_token(),
        Token::Placeholder("Total estimado Anual".to_string())
    );
    assert_eq!(lexer.next_token(), Token::Asterisk);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
}

#[test]
fn lexer_keeps_accents_in_placeholders() {
    let mut lexer = Lexer::new("{Execução (%)}");
    assert_eq!(lexer.next_token(), Token::Placeholder("Execução (%)".to_string()));
}

#[test]
fn lexer_tokenizes_comparison_operators() {
    let mut lexer = Lexer::new("< > <= >= != ==");
    assert_eq!(lexer.next_token(), Token::LessThan);
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.next_token(), Token::GreaterEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::EqualEqual);
    assert_eq!(lexer.next_token(), Token::Eof);
}

#[test]
fn lexer_tokenizes_boolean_operators() {
    let mut lexer = Lexer::new("{a} && {b} || {c}");
    assert_eq!(lexer.next_token(), Token::Placeholder("a".to_string()));
    assert_eq!(lexer.next_token(), Token::AndAnd);
    assert_eq!(lexer.next_token(), Token::Placeholder("b".to_string()));
    assert_eq!(lexer.next_token(), Token::OrOr);
    assert_eq!(lexer.next_token(), Token::Placeholder("c".to_string()));
}

#[test]
fn lexer_reads_currency_prefixed_numbers() {
    let mut lexer = Lexer::new("R$ 1.234,56 + R$2");
    assert_eq!(lexer.next_token(), Token::Number(1234.56));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
}

#[test]
fn lexer_reads_comma_decimals() {
    let mut lexer = Lexer::new("0,5");
    assert_eq!(lexer.next_token(), Token::Number(0.5));
}

#[test]
fn parse_decimal_handles_separator_combinations() {
    assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
    assert_eq!(parse_decimal("1,234.56"), Some(1234.56));
    assert_eq!(parse_decimal("42"), Some(42.0));
    assert_eq!(parse_decimal("3,14"), Some(3.14));
    assert_eq!(parse_decimal(""), None);
}

// ========================================
// PARSER TESTS
// ========================================

#[test]
fn parser_parses_number_literal() {
    let result = parse("42").unwrap();
    assert_eq!(result, Expr::Number(42.0));
}

#[test]
fn parser_parses_placeholder() {
    let result = parse("{units}").unwrap();
    assert_eq!(result, Expr::Placeholder("units".to_string()));
}

#[test]
fn parser_respects_precedence() {
    // 1 + 2 * 3 must parse as 1 + (2 * 3)
    let result = parse("1 + 2 * 3").unwrap();
    assert_eq!(
        result,
        Expr::BinaryOp {
            left: Box::new(Expr::Number(1.0)),
            op: BinaryOperator::Add,
            right: Box::new(Expr::BinaryOp {
                left: Box::new(Expr::Number(2.0)),
                op: BinaryOperator::Multiply,
                right: Box::new(Expr::Number(3.0)),
            }),
        }
    );
}

#[test]
fn parser_parses_parentheses() {
    let result = parse("(1 + 2) * 3").unwrap();
    assert_eq!(
        result,
        Expr::BinaryOp {
            left: Box::new(Expr::BinaryOp {
                left: Box::new(Expr::Number(1.0)),
                op: BinaryOperator::Add,
                right: Box::new(Expr::Number(2.0)),
            }),
            op: BinaryOperator::Multiply,
            right: Box::new(Expr::Number(3.0)),
        }
    );
}

#[test]
fn parser_parses_unary_minus() {
    let result = parse("-{saldo}").unwrap();
    assert_eq!(
        result,
        Expr::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(Expr::Placeholder("saldo".to_string())),
        }
    );
}

#[test]
fn parser_boolean_has_lowest_precedence() {
    // {a} > 1 && {b} > 2 must parse as ({a} > 1) && ({b} > 2)
    let result = parse("{a} > 1 && {b} > 2").unwrap();
    match result {
        Expr::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::And),
        other => panic!("expected top-level &&, got {:?}", other),
    }
}

#[test]
fn parser_rejects_empty_expression() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn parser_rejects_trailing_tokens() {
    assert!(parse("1 + 2 3").is_err());
}

#[test]
fn parser_rejects_unclosed_parenthesis() {
    assert!(parse("(1 + 2").is_err());
}

#[test]
fn parser_rejects_empty_placeholder() {
    assert!(parse("{} + 1").is_err());
}

#[test]
fn placeholders_are_collected_in_order() {
    let expr = parse("{b} + {a} * {b}").unwrap();
    assert_eq!(expr.placeholders(), vec!["b".to_string(), "a".to_string()]);
}

// ========================================
// EVALUATOR TESTS
// ========================================

fn scope_of(pairs: &[(&str, f64)]) -> MapScope {
    let mut scope = MapScope::new();
    for (name, value) in pairs {
        scope.bind(*name, Some(*value));
    }
    scope
}

#[test]
fn eval_arithmetic() {
    let expr = parse("{a} * 2 + {b}").unwrap();
    let scope = scope_of(&[("a", 10.0), ("b", 5.0)]);
    let mut missing = Vec::new();
    assert_eq!(eval(&expr, &scope, &mut missing), Some(25.0));
    assert!(missing.is_empty());
}

#[test]
fn eval_division_by_zero_is_absent() {
    let expr = parse("{a} / {b}").unwrap();
    let scope = scope_of(&[("a", 10.0), ("b", 0.0)]);
    let mut missing = Vec::new();
    assert_eq!(eval(&expr, &scope, &mut missing), None);
}

#[test]
fn eval_absent_coerces_to_zero_in_sums() {
    // (10 / 0) + 7 -> absent + 7 -> 7
    let expr = parse("{a} / {b} + 7").unwrap();
    let scope = scope_of(&[("a", 10.0), ("b", 0.0)]);
    let mut missing = Vec::new();
    assert_eq!(eval(&expr, &scope, &mut missing), Some(7.0));
}

#[test]
fn eval_comparisons_yield_unit_values() {
    let scope = scope_of(&[("x", 3.0)]);
    let mut missing = Vec::new();
    assert_eq!(eval(&parse("{x} > 2").unwrap(), &scope, &mut missing), Some(1.0));
    assert_eq!(eval(&parse("{x} < 2").unwrap(), &scope, &mut missing), Some(0.0));
    assert_eq!(eval(&parse("{x} == 3").unwrap(), &scope, &mut missing), Some(1.0));
}

#[test]
fn eval_booleans_compose_with_arithmetic() {
    // ({x} > 2) * 100 -> 100
    let scope = scope_of(&[("x", 3.0)]);
    let mut missing = Vec::new();
    assert_eq!(
        eval(&parse("({x} > 2) * 100").unwrap(), &scope, &mut missing),
        Some(100.0)
    );
}

#[test]
fn eval_unknown_placeholder_yields_zero_and_warning() {
    let expr = parse("{desconhecida} + 5").unwrap();
    let scope = scope_of(&[]);
    let mut missing = Vec::new();
    assert_eq!(eval(&expr, &scope, &mut missing), Some(5.0));
    assert_eq!(missing, vec!["desconhecida".to_string()]);
}

#[test]
fn eval_absent_binding_propagates() {
    let mut scope = MapScope::new();
    scope.bind("a", None);
    let mut missing = Vec::new();
    // Bare absent placeholder stays absent, no warning.
    assert_eq!(eval(&parse("{a}").unwrap(), &scope, &mut missing), None);
    assert!(missing.is_empty());
}

#[test]
fn apply_decimals_rounds_half_away_from_zero() {
    assert_eq!(apply_decimals(2.5, 0), 3.0);
    assert_eq!(apply_decimals(-2.5, 0), -3.0);
    assert_eq!(apply_decimals(1.2345, 2), 1.23);
    assert_eq!(apply_decimals(3.14159, 3), 3.142);
}
