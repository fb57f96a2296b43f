//! FILENAME: core/parser/src/eval.rs
//! PURPOSE: Evaluates a parsed expression against a scoped environment.
//! CONTEXT: Third stage of the pipeline. The same AST is evaluated at two
//! points: before aggregation (row-scoped environments binding column keys)
//! and after aggregation (column-scoped environments binding result labels
//! and keys). The evaluator itself carries no state between cells.
//!
//! SEMANTICS:
//! - Arithmetic in IEEE-754 double precision.
//! - Comparisons and boolean operators yield 1.0 / 0.0 so they compose with
//!   arithmetic and participate in sums.
//! - Division by zero yields the absent value (`None`); absent operands
//!   coerce to 0 inside surrounding arithmetic.
//! - An unknown placeholder resolves to 0 and is reported through the
//!   evaluation's `missing` list so callers can attach a warning.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};

/// A name-resolution environment for placeholder lookups.
///
/// `contains` answers whether the name is known at all; `resolve` returns
/// the current numeric binding, where `None` means the value is absent for
/// this row (which is different from the name being unknown).
pub trait Scope {
    fn contains(&self, name: &str) -> bool;
    fn resolve(&self, name: &str) -> Option<f64>;
}

/// Walks the AST for one cell. `missing` accumulates unknown placeholder
/// names (deduplicated) across the cells of a single calculation.
pub fn eval(expr: &Expr, scope: &dyn Scope, missing: &mut Vec<String>) -> Option<f64> {
    match expr {
        Expr::Number(value) => Some(*value),

        Expr::Placeholder(name) => {
            if scope.contains(name) {
                scope.resolve(name)
            } else {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.clone());
                }
                Some(0.0)
            }
        }

        Expr::UnaryOp { op, operand } => {
            let value = eval(operand, scope, missing);
            match op {
                UnaryOperator::Negate => value.map(|v| -v),
            }
        }

        Expr::BinaryOp { left, op, right } => {
            let lhs = eval(left, scope, missing);
            let rhs = eval(right, scope, missing);
            apply_binary(*op, lhs, rhs)
        }
    }
}

/// Rounds half-away-from-zero to `decimals` places. `f64::round` already
/// rounds ties away from zero, so scaling is enough.
pub fn apply_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn apply_binary(op: BinaryOperator, lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
    use BinaryOperator::*;

    // Absent operands participate as 0 so that a divide-by-zero upstream
    // does not poison an entire calculation.
    let l = lhs.unwrap_or(0.0);
    let r = rhs.unwrap_or(0.0);

    match op {
        Add => Some(l + r),
        Subtract => Some(l - r),
        Multiply => Some(l * r),
        Divide => {
            if r == 0.0 {
                None
            } else {
                let out = l / r;
                if out.is_finite() {
                    Some(out)
                } else {
                    None
                }
            }
        }
        Equal => Some(bool_to_num(l == r)),
        NotEqual => Some(bool_to_num(l != r)),
        LessThan => Some(bool_to_num(l < r)),
        GreaterThan => Some(bool_to_num(l > r)),
        LessEqual => Some(bool_to_num(l <= r)),
        GreaterEqual => Some(bool_to_num(l >= r)),
        And => Some(bool_to_num(l != 0.0 && r != 0.0)),
        Or => Some(bool_to_num(l != 0.0 || r != 0.0)),
    }
}

fn bool_to_num(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// A simple map-backed scope, convenient for post-aggregation environments
/// and tests.
#[derive(Debug, Default)]
pub struct MapScope {
    bindings: std::collections::HashMap<String, Option<f64>>,
}

impl MapScope {
    pub fn new() -> Self {
        MapScope::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.bindings.insert(name.into(), value);
    }
}

impl Scope for MapScope {
    fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    fn resolve(&self, name: &str) -> Option<f64> {
        self.bindings.get(name).copied().flatten()
    }
}
