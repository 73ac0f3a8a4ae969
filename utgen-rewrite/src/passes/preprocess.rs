//! Lowering of loop-adjacent constructs ahead of unrolling
//!
//! - `for` becomes `{ init; while (cond) { body; update } }`, with
//!   `continue` retargeted to a labeled block around the body
//! - `do { B } while (c)` becomes a peeled first copy of `B` followed by
//!   `while (c) { B }`
//! - `x op= e` becomes `x = (T) (x op e)` and `x++` becomes `x = x + 1`

use crate::error::{Result, RewriteError};
use crate::passes::jumps::{with_label, wrap_block, JumpRetarget};
use crate::passes::{RewriteContext, RewritePass};
use utgen_core::ast::*;

/// Lowers `for`, `do`-`while`, compound assignments and increments
#[derive(Debug, Default)]
pub struct PreprocessPass {
    for_loops: usize,
    do_loops: usize,
    assignments: usize,
    changed: bool,
}

impl PreprocessPass {
    /// Create new preprocessing pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `for` loops lowered so far
    pub fn for_loops(&self) -> usize {
        self.for_loops
    }

    /// Number of `do`-`while` loops lowered so far
    pub fn do_loops(&self) -> usize {
        self.do_loops
    }

    /// Number of compound assignments and increments lowered so far
    pub fn assignments(&self) -> usize {
        self.assignments
    }

    fn block(&mut self, block: &Block, ctx: &mut RewriteContext) -> Result<Block> {
        let stmts = block
            .stmts
            .iter()
            .map(|stmt| self.stmt(stmt, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Block::new(stmts))
    }

    fn stmt(&mut self, stmt: &Stmt, ctx: &mut RewriteContext) -> Result<Stmt> {
        Ok(match stmt {
            Stmt::Labeled { label, body } => match body.as_ref() {
                Stmt::For { .. } | Stmt::DoWhile { .. } => {
                    self.lower_loop(body, Some(label.as_str()), ctx)?
                }
                other => Stmt::Labeled {
                    label: label.clone(),
                    body: Box::new(self.stmt(other, ctx)?),
                },
            },
            Stmt::For { .. } | Stmt::DoWhile { .. } => self.lower_loop(stmt, None, ctx)?,
            Stmt::While { cond, body } => Stmt::While {
                cond: cond.clone(),
                body: self.block(body, ctx)?,
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::If {
                cond: cond.clone(),
                then_branch: self.block(then_branch, ctx)?,
                else_branch: match else_branch {
                    Some(block) => Some(self.block(block, ctx)?),
                    None => None,
                },
            },
            Stmt::Block(block) => Stmt::Block(self.block(block, ctx)?),
            Stmt::Assign { target, op, value } if *op != AssignOp::Set => {
                self.lower_compound(target, *op, value, ctx)?
            }
            Stmt::Step { target, step } => {
                let op = match step {
                    Step::Increment => BinaryOp::Add,
                    Step::Decrement => BinaryOp::Sub,
                };
                if ctx.referenced.var_type(target).is_none() {
                    return Err(RewriteError::UnknownVariable(target.clone()));
                }
                self.assignments += 1;
                self.changed = true;
                Stmt::Assign {
                    target: target.clone(),
                    op: AssignOp::Set,
                    value: Expr::binary(op, Expr::var(target.as_str()), Expr::int(1)),
                }
            }
            other => other.clone(),
        })
    }

    fn lower_loop(
        &mut self,
        stmt: &Stmt,
        label: Option<&str>,
        ctx: &mut RewriteContext,
    ) -> Result<Stmt> {
        match stmt {
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => self.lower_for(init, cond.as_ref(), update, body, label, ctx),
            Stmt::DoWhile { body, cond } => self.lower_do(body, cond, label, ctx),
            other => Ok(with_label(self.stmt(other, ctx)?, label)),
        }
    }

    fn lower_for(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        update: &[Stmt],
        body: &Block,
        label: Option<&str>,
        ctx: &mut RewriteContext,
    ) -> Result<Stmt> {
        self.for_loops += 1;
        self.changed = true;

        let init = init
            .iter()
            .map(|stmt| self.stmt(stmt, ctx))
            .collect::<Result<Vec<_>>>()?;
        let update = update
            .iter()
            .map(|stmt| self.stmt(stmt, ctx))
            .collect::<Result<Vec<_>>>()?;
        let body = self.block(body, ctx)?;

        let cont = RewriteContext::label("cont", ctx.fresh());
        let mut retarget = JumpRetarget::new(label, None, Some(&cont));
        let body = retarget.body(&body);

        let mut loop_body = Vec::with_capacity(update.len() + 1);
        if retarget.continues > 0 {
            loop_body.push(wrap_block(body.stmts, Some(cont)));
        } else if body.stmts.iter().any(|s| matches!(s, Stmt::Local { .. })) {
            loop_body.push(wrap_block(body.stmts, None));
        } else {
            loop_body.extend(body.stmts);
        }
        loop_body.extend(update);

        let lowered = with_label(
            Stmt::While {
                cond: cond.cloned().unwrap_or_else(|| Expr::bool(true)),
                body: Block::new(loop_body),
            },
            label,
        );
        if init.is_empty() {
            Ok(lowered)
        } else {
            let mut stmts = init;
            stmts.push(lowered);
            Ok(wrap_block(stmts, None))
        }
    }

    fn lower_do(
        &mut self,
        body: &Block,
        cond: &Expr,
        label: Option<&str>,
        ctx: &mut RewriteContext,
    ) -> Result<Stmt> {
        self.do_loops += 1;
        self.changed = true;

        let body = self.block(body, ctx)?;
        let n = ctx.fresh();
        let exit = RewriteContext::label("exit", n);
        let first = RewriteContext::label("first", n);

        let mut retarget = JumpRetarget::new(label, Some(&exit), Some(&first));
        let peeled = retarget.body(&body);
        let peeled = wrap_block(
            peeled.stmts,
            (retarget.continues > 0).then(|| first.clone()),
        );
        let rest = with_label(
            Stmt::While {
                cond: cond.clone(),
                body,
            },
            label,
        );
        Ok(wrap_block(
            vec![peeled, rest],
            (retarget.breaks > 0).then(|| exit.clone()),
        ))
    }

    fn lower_compound(
        &mut self,
        target: &str,
        op: AssignOp,
        value: &Expr,
        ctx: &RewriteContext,
    ) -> Result<Stmt> {
        let ty = ctx
            .referenced
            .var_type(target)
            .cloned()
            .ok_or_else(|| RewriteError::UnknownVariable(target.to_string()))?;
        let Some(binary) = op.binary() else {
            return Ok(Stmt::Assign {
                target: target.to_string(),
                op,
                value: value.clone(),
            });
        };
        self.assignments += 1;
        self.changed = true;

        let combined = Expr::binary(binary, Expr::var(target), value.clone());
        let needs_cast = ty.is_numeric()
            && ctx
                .referenced
                .type_of(value)
                .and_then(|rhs| Type::promote(&ty, &rhs))
                .as_ref()
                != Some(&ty);
        let value = if needs_cast {
            Expr::cast(ty, combined)
        } else {
            combined
        };
        Ok(Stmt::Assign {
            target: target.to_string(),
            op: AssignOp::Set,
            value,
        })
    }
}

impl RewritePass for PreprocessPass {
    fn name(&self) -> &str {
        "Preprocess"
    }

    fn run(&mut self, body: &Block, ctx: &mut RewriteContext) -> Result<(Block, bool)> {
        self.changed = false;
        let rewritten = self.block(body, ctx)?;
        Ok((rewritten, self.changed))
    }

    fn stats(&self) -> String {
        format!(
            "{} pass: lowered {} for loops, {} do loops, {} assignments",
            self.name(),
            self.for_loops,
            self.do_loops,
            self.assignments
        )
    }
}
