use crate::error::{ErrorKind, ParseError};
use crate::{parse, parse_with_depth_limit};
use pretty_assertions::assert_eq;
use utgen_core::ast::*;
use utgen_core::printer::print_unit;

// ===== Helper Functions =====

fn wrap(body: &str) -> String {
    format!("class T {{ int m(int x, int y) {{ {} }} }}", body)
}

fn body_of(body: &str) -> Vec<Stmt> {
    let unit = parse(&wrap(body)).unwrap();
    unit.class.methods[0].body.stmts.clone()
}

fn expr_of(expr: &str) -> Expr {
    match body_of(&format!("return {};", expr)).remove(0) {
        Stmt::Return(Some(expr)) => expr,
        other => panic!("expected return, got {:?}", other),
    }
}

// ===== Declarations =====

#[test]
fn test_parse_class_header() {
    let source = r#"
        package com.example.calc;

        import java.util.List;
        import static java.lang.Math.*;

        @SuppressWarnings("unused")
        public final class Calc {
            @Override
            public static int clamp(int x, int lo, int hi) { return x; }
            private void log(String message) { }
        }
    "#;
    let unit = parse(source).unwrap();
    assert_eq!(unit.package.as_deref(), Some("com.example.calc"));
    assert_eq!(unit.qualified_name(), "com.example.calc.Calc");
    assert_eq!(unit.class.modifiers, vec![Modifier::Public, Modifier::Final]);
    assert_eq!(unit.class.methods.len(), 2);

    let clamp = &unit.class.methods[0];
    assert_eq!(clamp.name, "clamp");
    assert!(clamp.is_static());
    assert_eq!(clamp.param_types(), vec![Type::Int, Type::Int, Type::Int]);
    assert_eq!(unit.class.methods[1].params[0].ty, Type::String);
    assert_eq!(unit.class.methods[1].return_type, Type::Void);
}

#[test]
fn test_javadoc_and_block_comments() {
    let source = r#"
        /*
         * Copyright header.
         */
        package demo;

        /** Arithmetic helpers. */
        class A {
            /**
             * Clamp a value.
             * @param x the value
             */
            int f(int x) { return x /* no * change */; }
        }
    "#;
    let unit = parse(source).unwrap();
    assert_eq!(unit.qualified_name(), "demo.A");
    assert_eq!(unit.class.methods[0].name, "f");
    assert_eq!(
        unit.class.methods[0].body.stmts,
        vec![Stmt::Return(Some(Expr::var("x")))]
    );
}

#[test]
fn test_reference_parameter_types() {
    let unit = parse("class T { int size(Widget w) { return 0; } }").unwrap();
    assert_eq!(
        unit.class.methods[0].params[0].ty,
        Type::Reference("Widget".to_string())
    );
}

// ===== Statements =====

#[test]
fn test_parse_locals_and_assignments() {
    let stmts = body_of("int a = 1, b; b = a; a += 2; a++; --b; return a;");
    assert_eq!(stmts.len(), 7);
    assert_eq!(
        stmts[0],
        Stmt::Local {
            ty: Type::Int,
            name: "a".to_string(),
            init: Some(Expr::int(1)),
        }
    );
    assert_eq!(
        stmts[1],
        Stmt::Local {
            ty: Type::Int,
            name: "b".to_string(),
            init: None,
        }
    );
    assert_eq!(
        stmts[3],
        Stmt::Assign {
            target: "a".to_string(),
            op: AssignOp::Add,
            value: Expr::int(2),
        }
    );
    assert_eq!(
        stmts[4],
        Stmt::Step {
            target: "a".to_string(),
            step: Step::Increment,
        }
    );
    assert_eq!(
        stmts[5],
        Stmt::Step {
            target: "b".to_string(),
            step: Step::Decrement,
        }
    );
}

#[test]
fn test_parse_loops() {
    let stmts = body_of(
        "for (int i = 0; i < x; i++) { y += i; } \
         do { x--; } while (x > 0); \
         while (true) break; \
         return y;",
    );
    match &stmts[0] {
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            assert_eq!(init.len(), 1);
            assert_eq!(
                cond.as_ref(),
                Some(&Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("x")))
            );
            assert_eq!(update.len(), 1);
            assert_eq!(body.stmts.len(), 1);
        }
        other => panic!("expected for, got {:?}", other),
    }
    assert!(matches!(stmts[1], Stmt::DoWhile { .. }));
    match &stmts[2] {
        Stmt::While { body, .. } => assert_eq!(body.stmts, vec![Stmt::Break(None)]),
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn test_parse_labels_and_jumps() {
    let stmts = body_of("outer: while (x > 0) { while (y > 0) { continue outer; } break outer; } return 0;");
    match &stmts[0] {
        Stmt::Labeled { label, body } => {
            assert_eq!(label, "outer");
            assert!(matches!(**body, Stmt::While { .. }));
        }
        other => panic!("expected labeled statement, got {:?}", other),
    }
}

#[test]
fn test_else_if_chains() {
    let stmts = body_of("if (x > 0) return 1; else if (x < 0) return -1; else return 0;");
    match &stmts[0] {
        Stmt::If {
            else_branch: Some(else_branch),
            ..
        } => assert!(matches!(else_branch.stmts[0], Stmt::If { .. })),
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_intrinsics() {
    let stmts = body_of("if (__probe(0, x > __probe_value(1, y + 1))) { __bound_exceeded(); } return 0;");
    match &stmts[0] {
        Stmt::If {
            cond, then_branch, ..
        } => {
            assert_eq!(
                *cond,
                Expr::Probe {
                    id: ProbeId(0),
                    kind: ProbeKind::Branch,
                    expr: Box::new(Expr::binary(
                        BinaryOp::Gt,
                        Expr::var("x"),
                        Expr::Probe {
                            id: ProbeId(1),
                            kind: ProbeKind::Value,
                            expr: Box::new(Expr::binary(
                                BinaryOp::Add,
                                Expr::var("y"),
                                Expr::int(1)
                            )),
                        }
                    )),
                }
            );
            assert_eq!(then_branch.stmts, vec![Stmt::BoundExceeded]);
        }
        other => panic!("expected if, got {:?}", other),
    }
}

// ===== Expressions =====

#[test]
fn test_precedence() {
    assert_eq!(
        expr_of("x + y * 2"),
        Expr::binary(
            BinaryOp::Add,
            Expr::var("x"),
            Expr::binary(BinaryOp::Mul, Expr::var("y"), Expr::int(2))
        )
    );
    assert_eq!(
        expr_of("x < 1 || y > 2 && x != y"),
        Expr::binary(
            BinaryOp::Or,
            Expr::binary(BinaryOp::Lt, Expr::var("x"), Expr::int(1)),
            Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Gt, Expr::var("y"), Expr::int(2)),
                Expr::binary(BinaryOp::Ne, Expr::var("x"), Expr::var("y"))
            )
        )
    );
}

#[test]
fn test_casts_and_conditionals() {
    assert_eq!(
        expr_of("(long) x * 2"),
        Expr::binary(
            BinaryOp::Mul,
            Expr::cast(Type::Long, Expr::var("x")),
            Expr::int(2)
        )
    );
    assert!(matches!(expr_of("x > y ? x : y"), Expr::Conditional { .. }));
    // A parenthesized variable is not a cast
    assert_eq!(expr_of("(x) - 1"), Expr::binary(BinaryOp::Sub, Expr::var("x"), Expr::int(1)));
}

#[test]
fn test_literals() {
    assert_eq!(expr_of("-2147483648"), Expr::Literal(Literal::Int(i32::MIN)));
    assert_eq!(expr_of("10L"), Expr::Literal(Literal::Long(10)));
    assert_eq!(expr_of("2.5"), Expr::Literal(Literal::Double(2.5)));
    assert_eq!(expr_of("null"), Expr::Literal(Literal::Null));
    assert_eq!(
        expr_of("-x"),
        Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(Expr::var("x")),
        }
    );
}

#[test]
fn test_string_methods() {
    assert_eq!(
        expr_of("s.length()"),
        Expr::MethodCall {
            receiver: Box::new(Expr::var("s")),
            name: "length".to_string(),
            args: vec![],
        }
    );
    assert!(matches!(expr_of("\"a\".equals(s)"), Expr::MethodCall { .. }));
}

// ===== Errors =====

#[test]
fn test_int_literal_out_of_range() {
    let err = parse(&wrap("return 2147483648;")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidNumber);
}

#[test]
fn test_unsupported_constructs() {
    for body in ["int[] a; return 0;", "return a[0];", "x = y++; return x;"] {
        let err = parse(&wrap(body)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported, "body: {}", body);
    }
    let err = parse("class T { int count; }").unwrap_err();
    assert!(matches!(err, ParseError::Unsupported { ref construct, .. } if construct == "field declaration"));
}

#[test]
fn test_missing_semicolon() {
    let err = parse(&wrap("return x")).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { ref expected, .. } if expected == "';'"));
}

#[test]
fn test_expression_statement_must_be_call() {
    let err = parse(&wrap("x + 1; return 0;")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
}

#[test]
fn test_unclosed_class_body() {
    let err = parse("class T { int f() { return 1; }").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnclosedDelimiter);
}

#[test]
fn test_depth_limit() {
    let nested = format!("return {}x{};", "(".repeat(64), ")".repeat(64));
    let err = parse_with_depth_limit(&wrap(&nested), 32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaxDepthExceeded);
    assert!(parse(&wrap(&nested)).is_ok());
}

// ===== Printer round trip =====

#[test]
fn test_printed_unit_parses_to_same_tree() {
    let source = r#"
        package demo;
        public class Loops {
            public int sum(int n, String tag) {
                int total = 0;
                outer: for (int i = 0; i < n; i++) {
                    if (i % 3 == 0 && !tag.isEmpty()) { continue outer; }
                    total += i;
                }
                do { total -= 1; } while (total > 100);
                return total > 0 ? total : (int) 2.5;
            }
        }
    "#;
    let unit = parse(source).unwrap();
    let reparsed = parse(&print_unit(&unit)).unwrap();
    assert_eq!(reparsed, unit);
}
