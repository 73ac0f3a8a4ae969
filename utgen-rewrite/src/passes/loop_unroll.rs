//! Bounded unrolling of `while` loops
//!
//! Each outermost `while (c) B` becomes
//!
//! ```text
//! __exitN: {
//!     if (!(c)) break __exitN;
//!     __itN_1: { B }
//!     ...
//!     if (!(c)) break __exitN;
//!     __itN_k: { B }
//!     if (c) { __bound_exceeded(); }
//! }
//! ```
//!
//! with `k` sibling copies of `B`, so nesting depth does not grow with `k`.
//! A copy is labeled only when it holds a retargeted `continue`. Loops nested inside `B` are copied as they are
//! and unrolled by the next round.

use crate::error::Result;
use crate::passes::jumps::{wrap_block, JumpRetarget};
use crate::passes::{RewriteContext, RewritePass};
use utgen_core::ast::*;

/// Unrolls every outermost `while` loop `k` times
#[derive(Debug, Default)]
pub struct LoopUnrollPass {
    unrolled_count: usize,
    copies: usize,
    changed: bool,
}

impl LoopUnrollPass {
    /// Create new loop unrolling pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loops unrolled so far
    pub fn unrolled_count(&self) -> usize {
        self.unrolled_count
    }

    fn block(&mut self, block: &Block, ctx: &mut RewriteContext) -> Block {
        Block::new(block.stmts.iter().map(|s| self.stmt(s, ctx)).collect())
    }

    fn stmt(&mut self, stmt: &Stmt, ctx: &mut RewriteContext) -> Stmt {
        match stmt {
            Stmt::While { cond, body } => self.unroll(cond, body, None, ctx),
            Stmt::Labeled { label, body } => match body.as_ref() {
                Stmt::While { cond, body } => {
                    self.unroll(cond, body, Some(label.as_str()), ctx)
                }
                other => Stmt::Labeled {
                    label: label.clone(),
                    body: Box::new(self.stmt(other, ctx)),
                },
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::If {
                cond: cond.clone(),
                then_branch: self.block(then_branch, ctx),
                else_branch: else_branch.as_ref().map(|b| self.block(b, ctx)),
            },
            Stmt::Block(block) => Stmt::Block(self.block(block, ctx)),
            other => other.clone(),
        }
    }

    fn unroll(
        &mut self,
        cond: &Expr,
        body: &Block,
        label: Option<&str>,
        ctx: &mut RewriteContext,
    ) -> Stmt {
        self.unrolled_count += 1;
        self.changed = true;

        let n = ctx.fresh();
        let exit = RewriteContext::label("exit", n);

        let guard = Stmt::If {
            cond: Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(cond.clone()),
            },
            then_branch: Block::new(vec![Stmt::Break(Some(exit.clone()))]),
            else_branch: None,
        };
        let mut stmts = Vec::with_capacity(2 * ctx.bound + 1);
        for i in 1..=ctx.bound {
            let iteration = RewriteContext::label("it", n) + "_" + &i.to_string();
            let mut retarget = JumpRetarget::new(label, Some(&exit), Some(&iteration));
            let copy = retarget.body(body);
            stmts.push(guard.clone());
            stmts.push(wrap_block(
                copy.stmts,
                (retarget.continues > 0).then(|| iteration.clone()),
            ));
            self.copies += 1;
        }
        stmts.push(Stmt::If {
            cond: cond.clone(),
            then_branch: Block::new(vec![Stmt::BoundExceeded]),
            else_branch: None,
        });

        wrap_block(stmts, Some(exit))
    }
}

impl RewritePass for LoopUnrollPass {
    fn name(&self) -> &str {
        "Loop Unroll"
    }

    fn run(&mut self, body: &Block, ctx: &mut RewriteContext) -> Result<(Block, bool)> {
        self.changed = false;
        let rewritten = self.block(body, ctx);
        Ok((rewritten, self.changed))
    }

    fn is_applicable(&self, body: &Block) -> bool {
        body.contains_loop()
    }

    fn stats(&self) -> String {
        format!(
            "{} pass: unrolled {} loops into {} copies",
            self.name(),
            self.unrolled_count,
            self.copies
        )
    }
}
