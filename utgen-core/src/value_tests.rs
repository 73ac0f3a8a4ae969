use super::*;
use std::collections::HashSet;

#[test]
fn test_default_values() {
    assert_eq!(Value::default_for(&Type::Int), Some(Value::Int(0)));
    assert_eq!(Value::default_for(&Type::String), Some(Value::Str(String::new())));
    assert_eq!(
        Value::default_for(&Type::Reference("Widget".to_string())),
        None
    );
}

#[test]
fn test_conformance() {
    assert!(Value::Int(1).conforms_to(&Type::Int));
    assert!(!Value::Int(1).conforms_to(&Type::Long));
    assert!(Value::Null.conforms_to(&Type::String));
    assert!(!Value::Null.conforms_to(&Type::Int));
}

#[test]
fn test_nan_dedups_structurally() {
    let mut seen = HashSet::new();
    assert!(seen.insert(Value::Double(f64::NAN)));
    assert!(!seen.insert(Value::Double(f64::NAN)));
    assert_ne!(Value::Double(0.0), Value::Double(-0.0));
}

#[test]
fn test_java_strings() {
    assert_eq!(Value::Double(1.0).to_java_string(), "1.0");
    assert_eq!(Value::Double(0.5).to_java_string(), "0.5");
    assert_eq!(Value::Double(1e10).to_java_string(), "1.0E10");
    assert_eq!(Value::Double(f64::INFINITY).to_java_string(), "Infinity");
    assert_eq!(Value::Long(-3).to_java_string(), "-3");
    assert_eq!(Value::Null.to_java_string(), "null");
}

#[test]
fn test_literal_round_trip() {
    let lit = Literal::Long(7);
    assert_eq!(Literal::from(&Value::from(&lit)), lit);
}
