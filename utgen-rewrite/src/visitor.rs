//! Visitor infrastructure for read-only AST traversal

use utgen_core::ast::{Block, Expr, Stmt};

/// Trait for visiting statements and expressions
///
/// Default methods walk into children; override a method and call the
/// matching `walk_*` function to keep descending.
pub trait Visitor {
    /// Visit a statement
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    /// Visit an expression
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visit every statement of a block in order
pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

/// Visit the children of a statement
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                visitor.visit_expr(init);
            }
        }
        Stmt::Assign { value, .. } => visitor.visit_expr(value),
        Stmt::Expr(expr) => visitor.visit_expr(expr),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            walk_block(visitor, then_branch);
            if let Some(else_branch) = else_branch {
                walk_block(visitor, else_branch);
            }
        }
        Stmt::While { cond, body } => {
            visitor.visit_expr(cond);
            walk_block(visitor, body);
        }
        Stmt::DoWhile { body, cond } => {
            walk_block(visitor, body);
            visitor.visit_expr(cond);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for stmt in init {
                visitor.visit_stmt(stmt);
            }
            if let Some(cond) = cond {
                visitor.visit_expr(cond);
            }
            for stmt in update {
                visitor.visit_stmt(stmt);
            }
            walk_block(visitor, body);
        }
        Stmt::Return(Some(value)) => visitor.visit_expr(value),
        Stmt::Block(block) => walk_block(visitor, block),
        Stmt::Labeled { body, .. } => visitor.visit_stmt(body),
        Stmt::Step { .. }
        | Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Return(None)
        | Stmt::BoundExceeded => {}
    }
}

/// Visit the children of an expression
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(_) | Expr::Var(_) => {}
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } | Expr::Probe { expr, .. } => {
            visitor.visit_expr(expr)
        }
        Expr::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            visitor.visit_expr(receiver);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
    }
}
