//! Branch distance over symbolic conditions
//!
//! `distance(cond, want, inputs)` is zero exactly when `cond` evaluates to
//! `want` on `inputs`, and grows the further the inputs are from making it
//! so. Relational conditions use the classic Korel distances with `K = 1`.

use crate::error::SolverError;
use utgen_core::{BinaryOp, Value};
use utgen_vm::{OpError, SymExpr};

/// Penalty added to a violated relation
const K: f64 = 1.0;

/// Map a raw distance into `[0, 1)`; infinite distances map to 1
pub fn normalize(d: f64) -> f64 {
    if d.is_nan() || d.is_infinite() {
        1.0
    } else {
        d / (d + 1.0)
    }
}

/// Raw branch distance of `cond` from evaluating to `want`
///
/// Faults raised while evaluating a sub-term (division by zero, null
/// receiver) make the condition unreachable from these inputs and yield an
/// infinite distance. Malformed terms are reported as errors.
pub fn distance(cond: &SymExpr, want: bool, inputs: &[Value]) -> Result<f64, SolverError> {
    match cond {
        SymExpr::Not(inner) => distance(inner, !want, inputs),
        SymExpr::Compare { op, lhs, rhs } => {
            let (Some(l), Some(r)) = (eval(lhs, inputs)?, eval(rhs, inputs)?) else {
                return Ok(f64::INFINITY);
            };
            if is_nan(&l) || is_nan(&r) {
                // Every relation but `!=` is false on NaN, and no step fixes that
                let outcome = *op == BinaryOp::Ne;
                return Ok(if outcome == want { 0.0 } else { f64::INFINITY });
            }
            let op = if want {
                *op
            } else {
                op.negated().ok_or_else(|| {
                    SolverError::Unevaluable(format!("{} is not a relation", op.symbol()))
                })?
            };
            Ok(relation(op, &l, &r))
        }
        SymExpr::Equals(receiver, other) => {
            let (Some(a), Some(b)) = (eval(receiver, inputs)?, eval(other, inputs)?) else {
                return Ok(f64::INFINITY);
            };
            match (&a, want) {
                (Value::Null, _) => Ok(f64::INFINITY),
                (_, true) => Ok(string_distance(&a, &b)),
                (_, false) => Ok(if a == b { K } else { 0.0 }),
            }
        }
        SymExpr::IsEmpty(receiver) => match eval(receiver, inputs)? {
            Some(Value::Str(s)) => {
                let len = s.encode_utf16().count() as f64;
                Ok(match (want, len == 0.0) {
                    (true, _) => len,
                    (false, true) => K,
                    (false, false) => 0.0,
                })
            }
            _ => Ok(f64::INFINITY),
        },
        SymExpr::Const(Value::Bool(b)) => Ok(if *b == want { 0.0 } else { f64::INFINITY }),
        other => match eval(other, inputs)? {
            Some(Value::Bool(b)) => Ok(if b == want { 0.0 } else { K }),
            Some(value) => Err(SolverError::Unevaluable(format!(
                "condition {} evaluated to {}",
                other, value
            ))),
            None => Ok(f64::INFINITY),
        },
    }
}

/// Evaluate a term; `None` when evaluation faults the way the program would
fn eval(term: &SymExpr, inputs: &[Value]) -> Result<Option<Value>, SolverError> {
    match term.eval(inputs) {
        Ok(value) => Ok(Some(value)),
        Err(OpError::DivisionByZero | OpError::NullPointer(_)) => Ok(None),
        Err(err) => Err(SolverError::Unevaluable(err.to_string())),
    }
}

fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Double(v) if v.is_nan())
}

fn relation(op: BinaryOp, l: &Value, r: &Value) -> f64 {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => numeric_relation(op, l, r, a, b),
        _ => {
            let equal = l == r;
            match (op, equal) {
                (BinaryOp::Eq, true) | (BinaryOp::Ne, false) => 0.0,
                (BinaryOp::Eq | BinaryOp::Ne, _) => K,
                _ => f64::INFINITY,
            }
        }
    }
}

fn numeric_relation(op: BinaryOp, l: &Value, r: &Value, a: f64, b: f64) -> f64 {
    // Integral operands: exact difference, no f64 rounding near i64 bounds
    let diff = match (l.as_i64(), r.as_i64()) {
        (Some(x), Some(y)) => (x as i128 - y as i128) as f64,
        _ => a - b,
    };
    let holds = match op {
        BinaryOp::Lt => diff < 0.0,
        BinaryOp::Le => diff <= 0.0,
        BinaryOp::Gt => diff > 0.0,
        BinaryOp::Ge => diff >= 0.0,
        BinaryOp::Eq => diff == 0.0,
        BinaryOp::Ne => diff != 0.0,
        _ => return f64::INFINITY,
    };
    if holds {
        return 0.0;
    }
    match op {
        BinaryOp::Eq => diff.abs(),
        BinaryOp::Ne => K,
        _ => diff.abs() + K,
    }
}

/// Distance between two strings: per-char code point differences plus
/// `K` per length difference; infinite against `null`
fn string_distance(a: &Value, b: &Value) -> f64 {
    let (Some(a), Some(b)) = (a.as_str(), b.as_str()) else {
        return if a == b { 0.0 } else { f64::INFINITY };
    };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let shared: f64 = a
        .iter()
        .zip(&b)
        .map(|(x, y)| normalize((*x as i64 - *y as i64).abs() as f64))
        .sum();
    shared + (a.len() as f64 - b.len() as f64).abs() * K
}

#[cfg(test)]
#[path = "distance_tests.rs"]
mod tests;
