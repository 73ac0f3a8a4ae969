//! Java operator semantics over runtime values
//!
//! Shared by the interpreter and by symbolic evaluation, so a constraint
//! evaluated over candidate inputs computes exactly what an execution
//! would. Integer arithmetic wraps, integer division by zero faults,
//! floating point follows IEEE-754 and narrowing conversions saturate
//! the way Java's do.

use thiserror::Error;
use utgen_core::{BinaryOp, Type, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("null dereference in {0}")]
    NullPointer(&'static str),

    #[error("bad operand types for {operation}: {lhs} and {rhs}")]
    TypeMismatch {
        operation: String,
        lhs: String,
        rhs: String,
    },

    #[error("no value bound for input {0}")]
    UnboundInput(usize),
}

pub type OpResult<T> = std::result::Result<T, OpError>;

fn type_label(value: &Value) -> String {
    value
        .ty()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "null".to_string())
}

fn mismatch(operation: &str, lhs: &Value, rhs: &Value) -> OpError {
    OpError::TypeMismatch {
        operation: operation.to_string(),
        lhs: type_label(lhs),
        rhs: type_label(rhs),
    }
}

/// `+ - * / %` with binary numeric promotion
pub fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpResult<Value> {
    match (lhs, rhs) {
        (Value::Double(_), _) | (_, Value::Double(_)) => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(mismatch(op.symbol(), lhs, rhs));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(mismatch(op.symbol(), lhs, rhs)),
            };
            Ok(Value::Double(result))
        }
        (Value::Long(_), _) | (_, Value::Long(_)) => {
            let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) else {
                return Err(mismatch(op.symbol(), lhs, rhs));
            };
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div if b == 0 => return Err(OpError::DivisionByZero),
                BinaryOp::Div => a.wrapping_div(b),
                BinaryOp::Rem if b == 0 => return Err(OpError::DivisionByZero),
                BinaryOp::Rem => a.wrapping_rem(b),
                _ => return Err(mismatch(op.symbol(), lhs, rhs)),
            };
            Ok(Value::Long(result))
        }
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div if b == 0 => return Err(OpError::DivisionByZero),
                BinaryOp::Div => a.wrapping_div(b),
                BinaryOp::Rem if b == 0 => return Err(OpError::DivisionByZero),
                BinaryOp::Rem => a.wrapping_rem(b),
                _ => return Err(mismatch(op.symbol(), lhs, rhs)),
            };
            Ok(Value::Int(result))
        }
        _ => Err(mismatch(op.symbol(), lhs, rhs)),
    }
}

/// Unary minus
pub fn negate(value: &Value) -> OpResult<Value> {
    match value {
        Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
        Value::Long(v) => Ok(Value::Long(v.wrapping_neg())),
        Value::Double(v) => Ok(Value::Double(-v)),
        other => Err(mismatch("-", other, other)),
    }
}

/// Logical not
pub fn not(value: &Value) -> OpResult<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(mismatch("!", other, other)),
    }
}

/// Relational and equality comparisons
///
/// Numeric operands are promoted; any comparison involving `NaN` is false
/// except `!=`. Strings compare by content.
pub fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpResult<bool> {
    if lhs.is_numeric() && rhs.is_numeric() {
        let ordering = match (lhs, rhs) {
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                let (a, b) = (lhs.as_f64(), rhs.as_f64());
                a.partial_cmp(&b)
            }
            _ => lhs.as_i64().partial_cmp(&rhs.as_i64()),
        };
        let Some(ordering) = ordering else {
            return Ok(op == BinaryOp::Ne);
        };
        return match op {
            BinaryOp::Lt => Ok(ordering.is_lt()),
            BinaryOp::Le => Ok(ordering.is_le()),
            BinaryOp::Gt => Ok(ordering.is_gt()),
            BinaryOp::Ge => Ok(ordering.is_ge()),
            BinaryOp::Eq => Ok(ordering.is_eq()),
            BinaryOp::Ne => Ok(ordering.is_ne()),
            _ => Err(mismatch(op.symbol(), lhs, rhs)),
        };
    }
    let equal = match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Str(_), Value::Null) | (Value::Null, Value::Str(_)) => false,
        _ => return Err(mismatch(op.symbol(), lhs, rhs)),
    };
    match op {
        BinaryOp::Eq => Ok(equal),
        BinaryOp::Ne => Ok(!equal),
        _ => Err(mismatch(op.symbol(), lhs, rhs)),
    }
}

/// Primitive conversion, as performed by casts and widening assignments
pub fn convert(ty: &Type, value: &Value) -> OpResult<Value> {
    let converted = match (ty, value) {
        (Type::Int, Value::Int(v)) => Value::Int(*v),
        (Type::Int, Value::Long(v)) => Value::Int(*v as i32),
        (Type::Int, Value::Double(v)) => Value::Int(*v as i32),
        (Type::Long, Value::Int(v)) => Value::Long(*v as i64),
        (Type::Long, Value::Long(v)) => Value::Long(*v),
        (Type::Long, Value::Double(v)) => Value::Long(*v as i64),
        (Type::Double, v) if v.is_numeric() => match v.as_f64() {
            Some(f) => Value::Double(f),
            None => return Err(mismatch("cast", value, value)),
        },
        _ => {
            return Err(OpError::TypeMismatch {
                operation: format!("cast to {}", ty),
                lhs: type_label(value),
                rhs: ty.to_string(),
            })
        }
    };
    Ok(converted)
}

/// String concatenation with `String.valueOf` conversion of both operands
pub fn concat(lhs: &Value, rhs: &Value) -> Value {
    Value::Str(format!("{}{}", lhs.to_java_string(), rhs.to_java_string()))
}

fn receiver<'v>(value: &'v Value, method: &'static str) -> OpResult<&'v str> {
    match value {
        Value::Str(s) => Ok(s),
        Value::Null => Err(OpError::NullPointer(method)),
        other => Err(mismatch(method, other, other)),
    }
}

/// `s.length()` in UTF-16 code units
pub fn length(value: &Value) -> OpResult<Value> {
    let s = receiver(value, "length()")?;
    Ok(Value::Int(s.encode_utf16().count() as i32))
}

/// `s.isEmpty()`
pub fn is_empty(value: &Value) -> OpResult<Value> {
    let s = receiver(value, "isEmpty()")?;
    Ok(Value::Bool(s.is_empty()))
}

/// `s.equals(other)`; a `null` argument is simply unequal
pub fn equals(value: &Value, other: &Value) -> OpResult<Value> {
    let s = receiver(value, "equals()")?;
    Ok(Value::Bool(other.as_str() == Some(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_overflow_wraps() {
        let result = arithmetic(BinaryOp::Add, &Value::Int(i32::MAX), &Value::Int(1)).unwrap();
        assert_eq!(result, Value::Int(i32::MIN));
        let result = arithmetic(BinaryOp::Div, &Value::Int(i32::MIN), &Value::Int(-1)).unwrap();
        assert_eq!(result, Value::Int(i32::MIN));
    }

    #[test]
    fn test_promotion() {
        let result = arithmetic(BinaryOp::Mul, &Value::Int(3), &Value::Long(4)).unwrap();
        assert_eq!(result, Value::Long(12));
        let result = arithmetic(BinaryOp::Div, &Value::Int(1), &Value::Double(4.0)).unwrap();
        assert_eq!(result, Value::Double(0.25));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            arithmetic(BinaryOp::Rem, &Value::Long(5), &Value::Int(0)),
            Err(OpError::DivisionByZero)
        );
        let result = arithmetic(BinaryOp::Div, &Value::Double(1.0), &Value::Int(0)).unwrap();
        assert_eq!(result, Value::Double(f64::INFINITY));
    }

    #[test]
    fn test_nan_comparisons() {
        let nan = Value::Double(f64::NAN);
        assert!(!compare(BinaryOp::Eq, &nan, &nan).unwrap());
        assert!(compare(BinaryOp::Ne, &nan, &nan).unwrap());
        assert!(!compare(BinaryOp::Lt, &nan, &Value::Int(0)).unwrap());
    }

    #[test]
    fn test_mixed_comparison() {
        assert!(compare(BinaryOp::Lt, &Value::Int(2), &Value::Double(2.5)).unwrap());
        assert!(compare(BinaryOp::Eq, &Value::Long(7), &Value::Int(7)).unwrap());
        assert!(compare(BinaryOp::Ne, &Value::Str("a".into()), &Value::Null).unwrap());
        assert!(compare(BinaryOp::Lt, &Value::Bool(true), &Value::Bool(false)).is_err());
    }

    #[test]
    fn test_narrowing_saturates() {
        assert_eq!(convert(&Type::Int, &Value::Double(1e20)).unwrap(), Value::Int(i32::MAX));
        assert_eq!(convert(&Type::Int, &Value::Double(f64::NAN)).unwrap(), Value::Int(0));
        assert_eq!(convert(&Type::Int, &Value::Long(1 << 32 | 5)).unwrap(), Value::Int(5));
        assert_eq!(convert(&Type::Double, &Value::Int(3)).unwrap(), Value::Double(3.0));
        assert!(convert(&Type::Int, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(
            concat(&Value::Str("n=".into()), &Value::Double(2.0)),
            Value::Str("n=2.0".into())
        );
        assert_eq!(length(&Value::Str("héllo".into())).unwrap(), Value::Int(5));
        assert_eq!(is_empty(&Value::Str(String::new())).unwrap(), Value::Bool(true));
        assert_eq!(
            equals(&Value::Str("a".into()), &Value::Null).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(length(&Value::Null), Err(OpError::NullPointer("length()")));
    }
}
