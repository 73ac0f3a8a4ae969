use super::*;
use proptest::prelude::*;
use std::sync::Arc;
use utgen_core::Type;

fn x() -> Arc<SymExpr> {
    SymExpr::input(0, Type::Int)
}

fn constant(value: Value) -> Arc<SymExpr> {
    Arc::new(SymExpr::Const(value))
}

fn compare(op: BinaryOp, lhs: Arc<SymExpr>, rhs: Arc<SymExpr>) -> SymExpr {
    SymExpr::Compare { op, lhs, rhs }
}

#[test]
fn test_relational_distances() {
    let gt = compare(BinaryOp::Gt, x(), constant(Value::Int(10)));
    assert_eq!(distance(&gt, true, &[Value::Int(11)]), Ok(0.0));
    assert_eq!(distance(&gt, true, &[Value::Int(10)]), Ok(1.0));
    assert_eq!(distance(&gt, true, &[Value::Int(4)]), Ok(7.0));
    assert_eq!(distance(&gt, false, &[Value::Int(4)]), Ok(0.0));
    assert_eq!(distance(&gt, false, &[Value::Int(12)]), Ok(3.0));

    let eq = compare(BinaryOp::Eq, x(), constant(Value::Int(3)));
    assert_eq!(distance(&eq, true, &[Value::Int(-2)]), Ok(5.0));
    assert_eq!(distance(&eq, false, &[Value::Int(3)]), Ok(1.0));
}

#[test]
fn test_not_flips_the_goal() {
    let lt = Arc::new(compare(BinaryOp::Lt, x(), constant(Value::Int(0))));
    let not = SymExpr::Not(lt);
    assert_eq!(distance(&not, true, &[Value::Int(5)]), Ok(0.0));
    assert_eq!(distance(&not, false, &[Value::Int(5)]), Ok(6.0));
}

#[test]
fn test_extreme_longs_do_not_overflow() {
    let y = SymExpr::input(0, Type::Long);
    let lt = compare(BinaryOp::Lt, y, constant(Value::Long(i64::MIN)));
    let d = distance(&lt, true, &[Value::Long(i64::MAX)]).unwrap();
    assert!(d.is_finite() && d > 1e18);
}

#[test]
fn test_nan_is_unreachable_except_not_equal() {
    let d = SymExpr::input(0, Type::Double);
    let lt = compare(BinaryOp::Lt, d.clone(), constant(Value::Double(1.0)));
    assert_eq!(distance(&lt, true, &[Value::Double(f64::NAN)]), Ok(f64::INFINITY));
    assert_eq!(distance(&lt, false, &[Value::Double(f64::NAN)]), Ok(0.0));
    let ne = compare(BinaryOp::Ne, d, constant(Value::Double(1.0)));
    assert_eq!(distance(&ne, true, &[Value::Double(f64::NAN)]), Ok(0.0));
}

#[test]
fn test_fault_in_operand_is_infinite() {
    let quotient = Arc::new(SymExpr::Arith {
        op: BinaryOp::Div,
        lhs: constant(Value::Int(10)),
        rhs: x(),
    });
    let cond = compare(BinaryOp::Gt, quotient, constant(Value::Int(1)));
    assert_eq!(distance(&cond, true, &[Value::Int(0)]), Ok(f64::INFINITY));
    assert_eq!(distance(&cond, true, &[Value::Int(5)]), Ok(0.0));
}

#[test]
fn test_string_conditions() {
    let s = SymExpr::input(0, Type::String);
    let equals = SymExpr::Equals(s.clone(), constant(Value::Str("ab".into())));
    assert_eq!(distance(&equals, true, &[Value::Str("ab".into())]), Ok(0.0));
    let near = distance(&equals, true, &[Value::Str("ac".into())]).unwrap();
    let far = distance(&equals, true, &[Value::Str("a".into())]).unwrap();
    assert!(near > 0.0 && near < far);
    assert_eq!(distance(&equals, false, &[Value::Str("ab".into())]), Ok(1.0));

    let empty = SymExpr::IsEmpty(s);
    assert_eq!(distance(&empty, true, &[Value::Str("abc".into())]), Ok(3.0));
    assert_eq!(distance(&empty, false, &[Value::Str(String::new())]), Ok(1.0));
}

#[test]
fn test_boolean_inputs() {
    let flag = SymExpr::Input {
        index: 0,
        ty: Type::Boolean,
    };
    assert_eq!(distance(&flag, true, &[Value::Bool(false)]), Ok(1.0));
    assert_eq!(distance(&flag, false, &[Value::Bool(false)]), Ok(0.0));
}

#[test]
fn test_non_boolean_condition_is_an_error() {
    let err = distance(&x(), true, &[Value::Int(1)]).unwrap_err();
    assert!(matches!(err, SolverError::Unevaluable(_)));
}

#[test]
fn test_normalize() {
    assert_eq!(normalize(0.0), 0.0);
    assert_eq!(normalize(1.0), 0.5);
    assert_eq!(normalize(f64::INFINITY), 1.0);
}

proptest! {
    #[test]
    fn distance_is_zero_exactly_when_the_branch_holds(
        v in -10_000i32..10_000,
        c in -10_000i32..10_000,
        op_index in 0usize..6,
        want: bool,
    ) {
        let ops = [BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge, BinaryOp::Eq, BinaryOp::Ne];
        let cond = compare(ops[op_index], x(), constant(Value::Int(c)));
        let outcome = cond.eval(&[Value::Int(v)]).unwrap() == Value::Bool(want);
        let d = distance(&cond, want, &[Value::Int(v)]).unwrap();
        prop_assert_eq!(d == 0.0, outcome);
        prop_assert!(d >= 0.0);
    }
}
