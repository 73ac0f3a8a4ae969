use super::*;
use std::io;

#[test]
fn test_parse_error() {
    let err = Error::Parse("unexpected token".to_string());
    assert_eq!(err.to_string(), "Parse error: unexpected token");
}

#[test]
fn test_unsupported_type_error() {
    let err = Error::UnsupportedType("Widget".to_string());
    assert_eq!(err.to_string(), "Unsupported type: Widget");
}

#[test]
fn test_io_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_anyhow_conversion() {
    let err: Error = anyhow::anyhow!("boom").into();
    assert_eq!(err.to_string(), "boom");
}
