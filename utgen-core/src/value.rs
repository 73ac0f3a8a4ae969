//! Runtime value representation

use crate::ast::{Literal, Type};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime values of the Java subset
///
/// Equality and hashing are structural; doubles compare by bit pattern so
/// that `NaN` inputs can be deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl Value {
    /// Runtime type; `None` for `null`
    pub fn ty(&self) -> Option<Type> {
        match self {
            Value::Int(_) => Some(Type::Int),
            Value::Long(_) => Some(Type::Long),
            Value::Double(_) => Some(Type::Double),
            Value::Bool(_) => Some(Type::Boolean),
            Value::Str(_) => Some(Type::String),
            Value::Null => None,
        }
    }

    /// Whether this value can be passed where `ty` is declared
    pub fn conforms_to(&self, ty: &Type) -> bool {
        match self {
            Value::Null => ty.is_reference(),
            other => other.ty().as_ref() == Some(ty),
        }
    }

    /// Zero value of a type, used as the first search input
    pub fn default_for(ty: &Type) -> Option<Value> {
        match ty {
            Type::Int => Some(Value::Int(0)),
            Type::Long => Some(Value::Long(0)),
            Type::Double => Some(Value::Double(0.0)),
            Type::Boolean => Some(Value::Bool(false)),
            Type::String => Some(Value::Str(String::new())),
            Type::Void | Type::Reference(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Double(_))
    }

    /// Text used by string concatenation, following Java's `String.valueOf`
    pub fn to_java_string(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Double(v) => java_double_string(*v),
            Value::Bool(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Null => "null".to_string(),
        }
    }
}

fn java_double_string(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let text = format!("{:?}", v);
        if text.contains('.') || text.contains('e') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let text = format!("{:E}", v);
        match text.find('E') {
            Some(pos) if !text[..pos].contains('.') => {
                format!("{}.0{}", &text[..pos], &text[pos..])
            }
            _ => text,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Null => {}
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Int(v) => Value::Int(*v),
            Literal::Long(v) => Value::Long(*v),
            Literal::Double(v) => Value::Double(*v),
            Literal::Bool(v) => Value::Bool(*v),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Null => Value::Null,
        }
    }
}

impl From<&Value> for Literal {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(v) => Literal::Int(*v),
            Value::Long(v) => Literal::Long(*v),
            Value::Double(v) => Literal::Double(*v),
            Value::Bool(v) => Literal::Bool(*v),
            Value::Str(s) => Literal::Str(s.clone()),
            Value::Null => Literal::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => f.write_str(&other.to_java_string()),
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
