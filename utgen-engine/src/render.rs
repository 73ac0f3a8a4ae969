//! JUnit test case rendering
//!
//! Each harvested tuple becomes one `@Test` method that calls the method
//! under test with literal arguments and asserts the observed return
//! value. Test names are `test_<method>_<n>`, numbered per method name in
//! suite order.

use crate::error::RenderError;
use rustc_hash::FxHashMap;
use std::fmt::Write;
use utgen_core::printer::escape_string;
use utgen_core::{Type, Value};
use utgen_harvest::InputTuple;

/// Inputs for one test method
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub method: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub inputs: Vec<Value>,
    /// Observed return value; `None` for void methods
    pub expected: Option<Value>,
}

impl TestCase {
    pub fn from_tuple(
        method: &str,
        param_types: &[Type],
        return_type: &Type,
        is_static: bool,
        tuple: &InputTuple,
    ) -> Self {
        Self {
            method: method.to_string(),
            param_types: param_types.to_vec(),
            return_type: return_type.clone(),
            is_static,
            inputs: tuple.values.clone(),
            expected: tuple.returned.clone(),
        }
    }
}

/// Statement lines of one test method, before it is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCase {
    pub method: String,
    pub body: Vec<String>,
}

/// Renders test cases as JUnit 4 source
#[derive(Debug, Clone)]
pub struct JUnitRenderer {
    class_name: String,
    package: Option<String>,
    indent: String,
}

impl JUnitRenderer {
    /// Renderer for tests of `class_name` in `package`
    pub fn new(class_name: impl Into<String>, package: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            package,
            indent: "    ".to_string(),
        }
    }

    /// Name of the generated test class
    pub fn test_class_name(&self) -> String {
        format!("{}Test", self.class_name)
    }

    /// Body of one test method
    pub fn render_case(&self, case: &TestCase) -> Result<RenderedCase, RenderError> {
        if case.inputs.len() != case.param_types.len() {
            return Err(RenderError::ArityMismatch {
                method: case.method.clone(),
                expected: case.param_types.len(),
                found: case.inputs.len(),
            });
        }
        let mut args = Vec::with_capacity(case.inputs.len());
        for (index, (value, ty)) in case.inputs.iter().zip(&case.param_types).enumerate() {
            if !value.conforms_to(ty) {
                return Err(RenderError::ArgumentType {
                    method: case.method.clone(),
                    index,
                    expected: ty.clone(),
                    value: value.to_java_string(),
                });
            }
            args.push(java_literal(value));
        }

        let receiver = if case.is_static {
            self.class_name.clone()
        } else {
            format!("new {}()", self.class_name)
        };
        let call = format!("{}.{}({})", receiver, case.method, args.join(", "));
        let statement = match (&case.return_type, &case.expected) {
            (Type::Void, _) | (_, None) => format!("{};", call),
            (ty, Some(value)) => {
                if !value.conforms_to(ty) {
                    return Err(RenderError::ReturnType {
                        method: case.method.clone(),
                        expected: ty.clone(),
                        value: value.to_java_string(),
                    });
                }
                assertion(value, &call)
            }
        };
        Ok(RenderedCase {
            method: case.method.clone(),
            body: vec![statement],
        })
    }

    /// Complete test class source
    pub fn render_suite(&self, cases: &[RenderedCase]) -> String {
        let mut out = String::new();
        if let Some(package) = &self.package {
            let _ = writeln!(out, "package {};\n", package);
        }
        out.push_str("import static org.junit.Assert.*;\n\n");
        out.push_str("import org.junit.Test;\n\n");
        let _ = writeln!(out, "public class {} {{", self.test_class_name());

        let mut counters: FxHashMap<&str, usize> = FxHashMap::default();
        for case in cases {
            let n = counters.entry(case.method.as_str()).or_insert(0);
            *n += 1;
            out.push('\n');
            let _ = writeln!(out, "{}@Test", self.indent);
            let _ = writeln!(out, "{}public void {}() {{", self.indent, test_name(&case.method, *n));
            for line in &case.body {
                let _ = writeln!(out, "{}{}{}", self.indent, self.indent, line);
            }
            let _ = writeln!(out, "{}}}", self.indent);
        }
        out.push_str("}\n");
        out
    }
}

/// `test_<method>_<n>`
pub fn test_name(method: &str, n: usize) -> String {
    format!("test_{}_{}", method, n)
}

fn assertion(expected: &Value, call: &str) -> String {
    match expected {
        Value::Bool(true) => format!("assertTrue({});", call),
        Value::Bool(false) => format!("assertFalse({});", call),
        Value::Null => format!("assertNull({});", call),
        Value::Double(_) => format!("assertEquals({}, {}, 0.0);", java_literal(expected), call),
        _ => format!("assertEquals({}, {});", java_literal(expected), call),
    }
}

/// Java source spelling of a value
pub fn java_literal(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Long(v) => format!("{}L", v),
        Value::Double(v) if v.is_nan() => "Double.NaN".to_string(),
        Value::Double(v) if v.is_infinite() => {
            if *v > 0.0 {
                "Double.POSITIVE_INFINITY".to_string()
            } else {
                "Double.NEGATIVE_INFINITY".to_string()
            }
        }
        Value::Double(v) => utgen_core::printer::double_literal(*v),
        Value::Bool(v) => v.to_string(),
        Value::Str(s) => format!("\"{}\"", escape_string(s)),
        Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
