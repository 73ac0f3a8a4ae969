use super::*;

fn loop_body() -> Block {
    Block::new(vec![Stmt::Assign {
        target: "x".to_string(),
        op: AssignOp::Sub,
        value: Expr::int(1),
    }])
}

#[test]
fn test_type_from_name() {
    assert_eq!(Type::from_name("int"), Type::Int);
    assert_eq!(Type::from_name("String"), Type::String);
    assert_eq!(
        Type::from_name("Widget"),
        Type::Reference("Widget".to_string())
    );
    assert_eq!(Type::Reference("Widget".to_string()).to_string(), "Widget");
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(Type::promote(&Type::Int, &Type::Int), Some(Type::Int));
    assert_eq!(Type::promote(&Type::Int, &Type::Long), Some(Type::Long));
    assert_eq!(Type::promote(&Type::Long, &Type::Double), Some(Type::Double));
    assert_eq!(Type::promote(&Type::Boolean, &Type::Int), None);
}

#[test]
fn test_accepts_widening_only() {
    assert!(Type::Double.accepts(&Type::Int));
    assert!(Type::Long.accepts(&Type::Int));
    assert!(!Type::Int.accepts(&Type::Long));
    assert!(!Type::Int.accepts(&Type::Boolean));
    assert!(Type::String.accepts(&Type::String));
}

#[test]
fn test_free_vars() {
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::var("a"),
        Expr::MethodCall {
            receiver: Box::new(Expr::var("s")),
            name: "length".to_string(),
            args: vec![],
        },
    );
    let mut vars = FxHashSet::default();
    expr.free_vars(&mut vars);
    assert_eq!(vars.len(), 2);
    assert!(vars.contains("a"));
    assert!(vars.contains("s"));
}

#[test]
fn test_contains_loop_sees_nested_statements() {
    let nested = Block::new(vec![Stmt::If {
        cond: Expr::bool(true),
        then_branch: Block::new(vec![Stmt::Labeled {
            label: "outer".to_string(),
            body: Box::new(Stmt::While {
                cond: Expr::bool(true),
                body: loop_body(),
            }),
        }]),
        else_branch: None,
    }]);
    assert!(nested.contains_loop());
    assert!(!loop_body().contains_loop());
}

#[test]
fn test_node_count() {
    let block = Block::new(vec![Stmt::Return(Some(Expr::binary(
        BinaryOp::Add,
        Expr::var("x"),
        Expr::int(1),
    )))]);
    // return + binary + two leaves
    assert_eq!(block.node_count(), 4);
}

#[test]
fn test_replace_method_by_signature() {
    let method = |ret: i32| MethodDecl {
        modifiers: vec![],
        return_type: Type::Int,
        name: "f".to_string(),
        params: vec![Param {
            ty: Type::Int,
            name: "x".to_string(),
        }],
        body: Block::new(vec![Stmt::Return(Some(Expr::int(ret)))]),
    };
    let mut class = ClassDecl {
        modifiers: vec![],
        name: "C".to_string(),
        methods: vec![method(1)],
    };
    let previous = class.replace_method(method(2)).expect("method exists");
    assert_eq!(previous, method(1));
    assert_eq!(class.methods[0], method(2));
    assert_eq!(class.method(&method(2).signature()), Some(&method(2)));
}

#[test]
fn test_signature_display() {
    let signature = MethodSignature {
        name: "clamp".to_string(),
        params: vec![Type::Int, Type::String],
    };
    assert_eq!(signature.to_string(), "clamp(int, String)");
}
