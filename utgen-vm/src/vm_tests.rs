use super::*;
use crate::compiler::compile_source;
use utgen_core::Type;

fn run_with(source: &str, method: &str, params: &[Type], args: &[Value], config: VmConfig) -> VmResult<Execution> {
    let unit = compile_source(source).unwrap();
    let chunk = unit.bytecode.find_method(method, params).unwrap();
    Vm::new(&unit.bytecode, config).invoke(chunk, args)
}

fn run(source: &str, method: &str, params: &[Type], args: &[Value]) -> VmResult<Execution> {
    run_with(source, method, params, args, VmConfig::default())
}

fn returned(execution: VmResult<Execution>) -> Option<Value> {
    match execution.unwrap().outcome {
        Outcome::Returned(value) => value,
        Outcome::BoundExceeded => panic!("bound exceeded"),
    }
}

const CALC: &str = r#"
class Calc {
    static int clamp(int x, int lo, int hi) {
        if (__probe(0, x < lo)) return lo;
        if (__probe(1, x > hi)) return hi;
        return x;
    }
    static int twice(int x) { return add(x, x); }
    static int add(int a, int b) { return a + b; }
    static long widen(int x) { return x * 3000000000L; }
    static int div(int a, int b) { return a / b; }
    static double ratio(int a, int b) { return (double) a / b; }
    static String greet(String name) { return "hi " + name + (name.length() + 1); }
    static boolean same(String a, String b) { return a.equals(b); }
    static int down(int n) { return n <= 0 ? 0 : down(n - 1); }
    static int forever(int n) { while (true) { n++; } }
    static int partial(int x) { if (x > 0) return 1; }
    static void nothing(int x) { x++; }
    static int unrolled(int x) { if (x > 2) { __bound_exceeded(); } return x; }
}
"#;

#[test]
fn test_clamp_returns_and_traces_branches() {
    let execution = run(
        CALC,
        "clamp",
        &[Type::Int, Type::Int, Type::Int],
        &[Value::Int(15), Value::Int(0), Value::Int(10)],
    )
    .unwrap();
    assert_eq!(execution.outcome, Outcome::Returned(Some(Value::Int(10))));
    let branches: Vec<_> = execution.branches().map(|(e, taken)| (e.id, taken)).collect();
    assert_eq!(branches, vec![(ProbeId(0), false), (ProbeId(1), true)]);

    let first = &execution.trace[0];
    assert_eq!(first.sym.as_ref().unwrap().to_string(), "(in0 < in1)");
}

#[test]
fn test_calls_share_the_stack() {
    assert_eq!(
        returned(run(CALC, "twice", &[Type::Int], &[Value::Int(21)])),
        Some(Value::Int(42))
    );
}

#[test]
fn test_int_arithmetic_wraps_and_promotes() {
    assert_eq!(
        returned(run(CALC, "add", &[Type::Int, Type::Int], &[Value::Int(i32::MAX), Value::Int(1)])),
        Some(Value::Int(i32::MIN))
    );
    assert_eq!(
        returned(run(CALC, "widen", &[Type::Int], &[Value::Int(2)])),
        Some(Value::Long(6_000_000_000))
    );
}

#[test]
fn test_division_by_zero_is_a_fault() {
    let err = run(CALC, "div", &[Type::Int, Type::Int], &[Value::Int(1), Value::Int(0)]).unwrap_err();
    assert_eq!(
        err,
        VmError::DivisionByZero {
            method: "div(int, int)".to_string()
        }
    );
    assert!(err.is_runtime_fault());
}

#[test]
fn test_double_division_by_zero_is_infinite() {
    assert_eq!(
        returned(run(CALC, "ratio", &[Type::Int, Type::Int], &[Value::Int(1), Value::Int(0)])),
        Some(Value::Double(f64::INFINITY))
    );
}

#[test]
fn test_string_operations() {
    assert_eq!(
        returned(run(CALC, "greet", &[Type::String], &[Value::Str("bo".into())])),
        Some(Value::Str("hi bo3".into()))
    );
    let err = run(CALC, "greet", &[Type::String], &[Value::Null]).unwrap_err();
    assert!(matches!(err, VmError::NullPointer { .. }));

    assert_eq!(
        returned(run(
            CALC,
            "same",
            &[Type::String, Type::String],
            &[Value::Str("a".into()), Value::Null]
        )),
        Some(Value::Bool(false))
    );
}

#[test]
fn test_recursion_and_call_depth() {
    assert_eq!(
        returned(run(CALC, "down", &[Type::Int], &[Value::Int(50)])),
        Some(Value::Int(0))
    );
    let config = VmConfig {
        max_call_depth: 10,
        ..VmConfig::default()
    };
    let err = run_with(CALC, "down", &[Type::Int], &[Value::Int(50)], config).unwrap_err();
    assert_eq!(err, VmError::CallDepthExceeded { limit: 10 });
}

#[test]
fn test_step_limit() {
    let config = VmConfig {
        max_steps: 500,
        ..VmConfig::default()
    };
    let err = run_with(CALC, "forever", &[Type::Int], &[Value::Int(0)], config).unwrap_err();
    assert_eq!(err, VmError::StepLimitExceeded { limit: 500 });
}

#[test]
fn test_missing_return_traps() {
    assert_eq!(
        returned(run(CALC, "partial", &[Type::Int], &[Value::Int(3)])),
        Some(Value::Int(1))
    );
    let err = run(CALC, "partial", &[Type::Int], &[Value::Int(-3)]).unwrap_err();
    assert_eq!(
        err,
        VmError::MissingReturn {
            method: "partial(int)".to_string()
        }
    );
}

#[test]
fn test_void_method_returns_nothing() {
    assert_eq!(returned(run(CALC, "nothing", &[Type::Int], &[Value::Int(3)])), None);
}

#[test]
fn test_bound_exceeded_outcome() {
    let execution = run(CALC, "unrolled", &[Type::Int], &[Value::Int(5)]).unwrap();
    assert_eq!(execution.outcome, Outcome::BoundExceeded);
    assert_eq!(
        returned(run(CALC, "unrolled", &[Type::Int], &[Value::Int(1)])),
        Some(Value::Int(1))
    );
}

#[test]
fn test_arguments_are_checked() {
    let err = run(CALC, "add", &[Type::Int, Type::Int], &[Value::Int(1)]).unwrap_err();
    assert_eq!(
        err,
        VmError::ArityMismatch {
            method: "add(int, int)".to_string(),
            expected: 2,
            got: 1
        }
    );
    let err = run(CALC, "add", &[Type::Int, Type::Int], &[Value::Int(1), Value::Long(2)]).unwrap_err();
    assert!(matches!(err, VmError::ArgumentType { index: 1, .. }));
    assert!(!err.is_runtime_fault());
}

#[test]
fn test_symbolic_terms_follow_locals_and_calls() {
    let source = r#"
        class S {
            static int inc(int v) { return v + 1; }
            static boolean f(int x, int y) {
                int t = inc(x) * 2;
                return __probe(0, __probe_value(1, t - y) > 10);
            }
        }
    "#;
    let execution = run(source, "f", &[Type::Int, Type::Int], &[Value::Int(5), Value::Int(1)]).unwrap();
    assert_eq!(execution.outcome, Outcome::Returned(Some(Value::Bool(true))));

    let value_probe = &execution.trace[0];
    assert_eq!(value_probe.kind, ProbeKind::Value);
    assert_eq!(value_probe.value, Value::Int(11));
    let term = value_probe.sym.as_ref().unwrap();
    assert_eq!(term.to_string(), "(((in0 + 1) * 2) - in1)");
    assert_eq!(term.eval(&[Value::Int(5), Value::Int(1)]), Ok(Value::Int(11)));

    let branch = &execution.trace[1];
    assert_eq!(branch.taken(), Some(true));
    let cond = branch.sym.as_ref().unwrap();
    assert_eq!(cond.eval(&[Value::Int(0), Value::Int(0)]), Ok(Value::Bool(false)));
}

#[test]
fn test_constant_conditions_have_no_term() {
    let source = "class C { static int f(int x) { int k = 3; if (__probe(0, k > 2)) return x; return 0; } }";
    let execution = run(source, "f", &[Type::Int], &[Value::Int(9)]).unwrap();
    assert_eq!(execution.trace.len(), 1);
    assert!(execution.trace[0].sym.is_none());
}

#[test]
fn test_short_circuit_keeps_deciding_term() {
    let source = "class C { static boolean f(int x, int y) { return __probe(0, x > 0) && __probe(1, y > 0); } }";
    let execution = run(source, "f", &[Type::Int, Type::Int], &[Value::Int(-1), Value::Int(4)]).unwrap();
    assert_eq!(execution.outcome, Outcome::Returned(Some(Value::Bool(false))));
    assert_eq!(execution.trace.len(), 1);

    let execution = run(source, "f", &[Type::Int, Type::Int], &[Value::Int(1), Value::Int(4)]).unwrap();
    assert_eq!(execution.trace.len(), 2);
}

#[test]
fn test_vm_is_reusable() {
    let unit = compile_source(CALC).unwrap();
    let chunk = unit.bytecode.find_method("twice", &[Type::Int]).unwrap();
    let mut vm = Vm::new(&unit.bytecode, VmConfig::default());
    for i in 0..5 {
        let execution = vm.invoke(chunk, &[Value::Int(i)]).unwrap();
        assert_eq!(execution.outcome, Outcome::Returned(Some(Value::Int(2 * i))));
    }
}

#[test]
fn test_invalid_chunk() {
    let unit = compile_source(CALC).unwrap();
    let err = Vm::new(&unit.bytecode, VmConfig::default())
        .invoke(99, &[])
        .unwrap_err();
    assert_eq!(err, VmError::InvalidChunk(99));
}
