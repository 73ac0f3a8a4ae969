use super::*;
use utgen_core::ast::{MethodDecl, Type};

fn method(signature: &str, body: &str) -> MethodDecl {
    let source = format!("class T {{ {} {{ {} }} }}", signature, body);
    utgen_parser::parse(&source).unwrap().class.methods[0].clone()
}

#[test]
fn test_collect_params_locals_and_casts() {
    let m = method(
        "double f(int x, String s)",
        "long t = 0L; for (int i = 0; i < x; i++) { t = t + (long) i; } return (double) t;",
    );
    let referenced = ReferencedTypes::collect(&m).unwrap();
    assert_eq!(referenced.var_type("x"), Some(&Type::Int));
    assert_eq!(referenced.var_type("s"), Some(&Type::String));
    assert_eq!(referenced.var_type("t"), Some(&Type::Long));
    assert_eq!(referenced.var_type("i"), Some(&Type::Int));
    assert!(referenced.is_param("x"));
    assert!(!referenced.is_param("t"));
    let types: Vec<Type> = referenced.types().iter().cloned().collect();
    assert_eq!(types, vec![Type::Int, Type::Long, Type::Double, Type::String]);
}

#[test]
fn test_conflicting_local_types() {
    let m = method("int f(int x)", "{ int t = 1; } { long t = 2L; } return x;");
    let err = ReferencedTypes::collect(&m).unwrap_err();
    assert!(matches!(err, RewriteError::ConflictingLocal { ref name, .. } if name == "t"));
}

#[test]
fn test_sibling_loops_redeclare_with_another_type() {
    let m = method(
        "long f(int n)",
        "long s = 0L; \
         for (int i = 0; i < n; i++) { s += i; } \
         for (long i = 1L; i < 3L; i++) { s += i; } \
         for (int i = 2; i < 4; i++) { s -= i; } \
         return s;",
    );
    assert!(ReferencedTypes::collect(&m).is_err());

    let separated = separate_locals(&m);
    let referenced = ReferencedTypes::collect(&separated).unwrap();
    assert_eq!(referenced.var_type("i"), Some(&Type::Int));
    assert_eq!(referenced.var_type("i_1"), Some(&Type::Long));

    let printed = utgen_core::printer::print_block(&separated.body);
    assert!(printed.contains("for (long i_1 = 1L; (i_1 < 3L); i_1++)"), "{}", printed);
    assert!(printed.contains("s += i_1;"), "{}", printed);
    // The third loop has the first loop's type and keeps its name
    assert!(printed.contains("for (int i = 2;"), "{}", printed);
}

#[test]
fn test_separate_locals_avoids_taken_names() {
    let m = method(
        "int f(int x)",
        "{ int t = x; } { long t = 2L; x = (int) t; } int t_1 = 5; return x + t_1;",
    );
    let separated = separate_locals(&m);
    assert!(ReferencedTypes::collect(&separated).is_ok());
    let Stmt::Block(second) = &separated.body.stmts[1] else {
        panic!("expected block, got {:?}", separated.body.stmts[1]);
    };
    assert_eq!(
        second.stmts[0],
        Stmt::Local {
            ty: Type::Long,
            name: "t_2".to_string(),
            init: Some(Expr::Literal(Literal::Long(2))),
        }
    );
    assert_eq!(
        second.stmts[1],
        Stmt::Assign {
            target: "x".to_string(),
            op: AssignOp::Set,
            value: Expr::cast(Type::Int, Expr::var("t_2")),
        }
    );
    // Names outside the renamed scope are untouched
    assert_eq!(separated.body.stmts[0], m.body.stmts[0]);
    assert_eq!(separated.body.stmts[2..], m.body.stmts[2..]);
}

#[test]
fn test_separate_locals_is_identity_without_conflicts() {
    let m = method("int f(int x)", "int a = x; { int b = a; a = b; } return a;");
    assert_eq!(separate_locals(&m), m);
}

#[test]
fn test_type_of_expressions() {
    let m = method("int f(int x, long y, String s)", "return x;");
    let referenced = ReferencedTypes::collect(&m).unwrap();
    let parse = |text: &str| {
        let source = format!("class T {{ int g(int x, long y, String s) {{ return {}; }} }}", text);
        match &utgen_parser::parse(&source).unwrap().class.methods[0].body.stmts[0] {
            Stmt::Return(Some(expr)) => expr.clone(),
            other => panic!("unexpected {:?}", other),
        }
    };
    assert_eq!(referenced.type_of(&parse("x + y")), Some(Type::Long));
    assert_eq!(referenced.type_of(&parse("x * 2.0")), Some(Type::Double));
    assert_eq!(referenced.type_of(&parse("s + x")), Some(Type::String));
    assert_eq!(referenced.type_of(&parse("s.length()")), Some(Type::Int));
    assert_eq!(referenced.type_of(&parse("x < y")), Some(Type::Boolean));
    assert_eq!(referenced.type_of(&parse("unknown(x)")), None);
}

#[test]
fn test_class_method_return_types() {
    let source = "class T { long twice(int x) { return x * 2L; } int f(int x) { return 0; } }";
    let unit = utgen_parser::parse(source).unwrap();
    let referenced = ReferencedTypes::collect(&unit.class.methods[1])
        .unwrap()
        .with_class_methods(&unit.class);
    assert_eq!(referenced.method_return_type("twice"), Some(&Type::Long));
}

#[test]
fn test_param_dependence_is_transitive() {
    let m = method(
        "int f(int x)",
        "int a = 1; int b = a + 2; int c = 0; c = b; c = c + x; int d = c * 2; int e = a; return d + e;",
    );
    let dependence = ParamDependence::analyze(&m.body, &m.params);
    assert!(dependence.is_dependent("x"));
    assert!(dependence.is_dependent("c"));
    assert!(dependence.is_dependent("d"));
    assert!(!dependence.is_dependent("a"));
    assert!(!dependence.is_dependent("b"));
    assert!(!dependence.is_dependent("e"));
}

#[test]
fn test_compound_assignment_keeps_target_dependence() {
    let m = method("int f(int x)", "int a = 0; int b = 0; b += a; a += x; return b;");
    let dependence = ParamDependence::analyze(&m.body, &m.params);
    assert!(dependence.is_dependent("a"));
    assert!(dependence.is_dependent("b"));
}

#[test]
fn test_declared_labels() {
    let m = method("int f(int x)", "a: { b: while (x > 0) { x = x - 1; } } return x;");
    assert_eq!(declared_labels(&m.body), vec!["a".to_string(), "b".to_string()]);
}
