use super::loop_unroll::LoopUnrollPass;
use super::preprocess::PreprocessPass;
use super::*;
use crate::analysis::ReferencedTypes;
use pretty_assertions::assert_eq;
use utgen_core::ast::*;

fn method(signature: &str, body: &str) -> MethodDecl {
    let source = format!("class T {{ {} {{ {} }} }}", signature, body);
    let unit = utgen_parser::parse(&source).unwrap();
    unit.class.methods[0].clone()
}

fn context(method: &MethodDecl, bound: usize) -> RewriteContext {
    RewriteContext::new(ReferencedTypes::collect(method).unwrap(), bound)
}

fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: target.to_string(),
        op: AssignOp::Set,
        value,
    }
}

fn lt(lhs: &str, rhs: &str) -> Expr {
    Expr::binary(BinaryOp::Lt, Expr::var(lhs), Expr::var(rhs))
}

// ===== Preprocessing =====

#[test]
fn test_for_becomes_while_with_continue_block() {
    let m = method(
        "int sum(int n)",
        "int s = 0; for (int i = 0; i < n; i++) { if (i == 2) continue; s = s + i; } return s;",
    );
    let mut ctx = context(&m, 3);
    let (body, changed) = PreprocessPass::new().run(&m.body, &mut ctx).unwrap();
    assert!(changed);

    let expected = Stmt::Block(Block::new(vec![
        Stmt::Local {
            ty: Type::Int,
            name: "i".to_string(),
            init: Some(Expr::int(0)),
        },
        Stmt::While {
            cond: lt("i", "n"),
            body: Block::new(vec![
                Stmt::Labeled {
                    label: "__cont0".to_string(),
                    body: Box::new(Stmt::Block(Block::new(vec![
                        Stmt::If {
                            cond: Expr::binary(BinaryOp::Eq, Expr::var("i"), Expr::int(2)),
                            then_branch: Block::new(vec![Stmt::Break(Some(
                                "__cont0".to_string(),
                            ))]),
                            else_branch: None,
                        },
                        assign(
                            "s",
                            Expr::binary(BinaryOp::Add, Expr::var("s"), Expr::var("i")),
                        ),
                    ]))),
                },
                assign(
                    "i",
                    Expr::binary(BinaryOp::Add, Expr::var("i"), Expr::int(1)),
                ),
            ]),
        },
    ]));
    assert_eq!(body.stmts[1], expected);
}

#[test]
fn test_for_without_condition_loops_on_true() {
    let m = method("int f(int n)", "for (;;) { return n; }");
    let mut ctx = context(&m, 1);
    let (body, _) = PreprocessPass::new().run(&m.body, &mut ctx).unwrap();
    assert_eq!(
        body.stmts[0],
        Stmt::While {
            cond: Expr::bool(true),
            body: Block::new(vec![Stmt::Return(Some(Expr::var("n")))]),
        }
    );
}

#[test]
fn test_do_while_peels_first_iteration() {
    let m = method(
        "int f(int x)",
        "do { if (x > 5) break; x = x + 2; } while (x < 3); return x;",
    );
    let mut ctx = context(&m, 3);
    let (body, changed) = PreprocessPass::new().run(&m.body, &mut ctx).unwrap();
    assert!(changed);
    match &body.stmts[0] {
        Stmt::Labeled { label, body } => {
            assert_eq!(label, "__exit0");
            let Stmt::Block(block) = body.as_ref() else {
                panic!("expected block, got {:?}", body);
            };
            assert_eq!(block.stmts.len(), 2);
            let Stmt::Block(first) = &block.stmts[0] else {
                panic!("expected peeled block, got {:?}", block.stmts[0]);
            };
            assert!(matches!(
                &first.stmts[0],
                Stmt::If { then_branch, .. } if then_branch.stmts == vec![Stmt::Break(Some("__exit0".to_string()))]
            ));
            // The loop copy keeps its own break
            let Stmt::While { body: rest, .. } = &block.stmts[1] else {
                panic!("expected while, got {:?}", block.stmts[1]);
            };
            assert!(matches!(
                &rest.stmts[0],
                Stmt::If { then_branch, .. } if then_branch.stmts == vec![Stmt::Break(None)]
            ));
        }
        other => panic!("expected labeled block, got {:?}", other),
    }
}

#[test]
fn test_compound_assignment_casts_only_when_narrowing() {
    let m = method(
        "void f(int x, long y, double d, String s)",
        "x += 1; x += y; d *= x; s += x; y++;",
    );
    let mut ctx = context(&m, 3);
    let (body, _) = PreprocessPass::new().run(&m.body, &mut ctx).unwrap();
    assert_eq!(
        body.stmts,
        vec![
            assign("x", Expr::binary(BinaryOp::Add, Expr::var("x"), Expr::int(1))),
            assign(
                "x",
                Expr::cast(
                    Type::Int,
                    Expr::binary(BinaryOp::Add, Expr::var("x"), Expr::var("y"))
                )
            ),
            assign("d", Expr::binary(BinaryOp::Mul, Expr::var("d"), Expr::var("x"))),
            assign("s", Expr::binary(BinaryOp::Add, Expr::var("s"), Expr::var("x"))),
            assign("y", Expr::binary(BinaryOp::Add, Expr::var("y"), Expr::int(1))),
        ]
    );
}

#[test]
fn test_preprocess_reports_no_change_on_plain_code() {
    let m = method("int f(int x)", "while (x > 0) { x = x - 1; } return x;");
    let mut ctx = context(&m, 3);
    let (body, changed) = PreprocessPass::new().run(&m.body, &mut ctx).unwrap();
    assert!(!changed);
    assert_eq!(body, m.body);
}

// ===== Unrolling =====

#[test]
fn test_while_unrolled_into_guarded_copies() {
    let m = method("int f(int x)", "while (x > 0) { x = x - 1; } return x;");
    let mut ctx = context(&m, 2);
    let (body, changed) = LoopUnrollPass::new().run(&m.body, &mut ctx).unwrap();
    assert!(changed);

    let cond = Expr::binary(BinaryOp::Gt, Expr::var("x"), Expr::int(0));
    let step = Stmt::Block(Block::new(vec![assign(
        "x",
        Expr::binary(BinaryOp::Sub, Expr::var("x"), Expr::int(1)),
    )]));
    let exit = Stmt::If {
        cond: Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(cond.clone()),
        },
        then_branch: Block::new(vec![Stmt::Break(Some("__exit0".to_string()))]),
        else_branch: None,
    };
    let exceeded = Stmt::If {
        cond,
        then_branch: Block::new(vec![Stmt::BoundExceeded]),
        else_branch: None,
    };
    let expected = Stmt::Labeled {
        label: "__exit0".to_string(),
        body: Box::new(Stmt::Block(Block::new(vec![
            exit.clone(),
            step.clone(),
            exit,
            step,
            exceeded,
        ]))),
    };
    assert_eq!(body.stmts[0], expected);
    assert!(!body.contains_loop());
}

fn nesting(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::Block(block) => 1 + block.stmts.iter().map(nesting).max().unwrap_or(0),
        Stmt::Labeled { body, .. } => 1 + nesting(body),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            let then_depth = then_branch.stmts.iter().map(nesting).max().unwrap_or(0);
            let else_depth = else_branch
                .iter()
                .flat_map(|b| b.stmts.iter().map(nesting))
                .max()
                .unwrap_or(0);
            1 + then_depth.max(else_depth)
        }
        _ => 1,
    }
}

#[test]
fn test_unrolled_depth_does_not_grow_with_bound() {
    let m = method("int f(int x)", "while (x > 0) { if (x == 5) break; x = x - 1; } return x;");
    let depth_at = |bound: usize| {
        let mut ctx = context(&m, bound);
        let (body, _) = LoopUnrollPass::new().run(&m.body, &mut ctx).unwrap();
        assert!(!body.contains_loop());
        let Stmt::Labeled { body: exit, .. } = &body.stmts[0] else {
            panic!("expected labeled exit block, got {:?}", body.stmts[0]);
        };
        let Stmt::Block(block) = exit.as_ref() else {
            panic!("expected block, got {:?}", exit);
        };
        assert_eq!(block.stmts.len(), 2 * bound + 1);
        nesting(&body.stmts[0])
    };
    assert_eq!(depth_at(2), depth_at(500));

    // The printed form parses back without hitting the parser depth limit
    let mut ctx = context(&m, 500);
    let (body, _) = LoopUnrollPass::new().run(&m.body, &mut ctx).unwrap();
    let mut unrolled = m.clone();
    unrolled.body = body;
    let source = format!(
        "class T {{ {} }}",
        utgen_core::printer::print_method(&unrolled)
    );
    let reparsed = utgen_parser::parse(&source).unwrap();
    assert_eq!(reparsed.class.methods[0].body, unrolled.body);
}

#[test]
fn test_break_and_continue_are_retargeted() {
    let m = method(
        "int f(int x)",
        "outer: while (x < 10) { if (x == 3) { x = x + 2; continue outer; } if (x == 7) break; x = x + 1; } return x;",
    );
    let mut ctx = context(&m, 2);
    let (body, _) = LoopUnrollPass::new().run(&m.body, &mut ctx).unwrap();
    let printed = utgen_core::printer::print_block(&body);
    assert!(printed.contains("__exit0: {"));
    assert!(printed.contains("break __exit0;"));
    assert!(printed.contains("__it0_1: {"));
    assert!(printed.contains("break __it0_1;"));
    assert!(printed.contains("break __it0_2;"));
    assert!(!printed.contains("outer"));
}

#[test]
fn test_inner_loops_survive_one_round() {
    let m = method(
        "int f(int x, int y)",
        "while (x > 0) { while (y > 0) { if (y == 1) break; y = y - 1; } x = x - 1; } return x;",
    );
    let mut ctx = context(&m, 2);
    let mut pass = LoopUnrollPass::new();
    let (body, _) = pass.run(&m.body, &mut ctx).unwrap();
    assert!(body.contains_loop());
    assert_eq!(pass.unrolled_count(), 1);
    // The inner unlabeled break still belongs to the inner loop
    let printed = utgen_core::printer::print_block(&body);
    assert!(printed.contains("break;"));
    assert!(!printed.contains("__exit1"));

    let (body, changed) = pass.run(&body, &mut ctx).unwrap();
    assert!(changed);
    assert!(!body.contains_loop());
    assert_eq!(pass.unrolled_count(), 3);
}

#[test]
fn test_unroll_not_applicable_without_loops() {
    let m = method("int f(int x)", "return x;");
    assert!(!LoopUnrollPass::new().is_applicable(&m.body));
}
