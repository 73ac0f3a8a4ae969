//! Probe insertion over normalized bodies
//!
//! Parameter-dependent atomic conditions are wrapped in `__probe(id, c)`
//! and maximal numeric arithmetic expressions in `__probe_value(id, e)`.
//! Both intrinsics evaluate to their operand, so instrumentation only adds
//! observations and never changes what the method computes.

use crate::analysis::{ParamDependence, ReferencedTypes};
use serde::{Deserialize, Serialize};
use utgen_core::ast::*;

/// One probe inserted into a body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSite {
    /// Identifier passed to the intrinsic
    pub id: ProbeId,
    /// Branch or value probe
    pub kind: ProbeKind,
    /// Source text of the probed expression
    pub expr: String,
    /// Static type of the probed expression, when known
    pub ty: Option<Type>,
}

/// Instrumented body plus the probes it contains, ordered by id
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentedBody {
    /// Rewritten body
    pub body: Block,
    /// Inserted probes
    pub probes: Vec<ProbeSite>,
}

impl InstrumentedBody {
    /// Number of branch probes
    pub fn branch_count(&self) -> usize {
        self.probes
            .iter()
            .filter(|p| p.kind == ProbeKind::Branch)
            .count()
    }
}

/// Wrap every parameter-dependent sub-expression of `body` with a probe
///
/// A method without parameters is returned unchanged with no probes.
pub fn instrument(body: &Block, referenced: &ReferencedTypes) -> InstrumentedBody {
    if referenced.params().is_empty() {
        return InstrumentedBody {
            body: body.clone(),
            probes: Vec::new(),
        };
    }
    let dependence = ParamDependence::analyze(body, referenced.params());
    let mut instrumenter = Instrumenter {
        referenced,
        dependence: &dependence,
        next_id: 0,
        probes: Vec::new(),
    };
    let body = instrumenter.block(body);
    let mut probes = instrumenter.probes;
    probes.sort_by_key(|p| p.id);
    log::debug!("inserted {} probes", probes.len());
    InstrumentedBody { body, probes }
}

struct Instrumenter<'a> {
    referenced: &'a ReferencedTypes,
    dependence: &'a ParamDependence,
    next_id: u32,
    probes: Vec<ProbeSite>,
}

impl<'a> Instrumenter<'a> {
    fn block(&mut self, block: &Block) -> Block {
        Block::new(block.stmts.iter().map(|s| self.stmt(s)).collect())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Local { ty, name, init } => Stmt::Local {
                ty: ty.clone(),
                name: name.clone(),
                init: init.as_ref().map(|e| self.expr(e)),
            },
            Stmt::Assign { target, op, value } => Stmt::Assign {
                target: target.clone(),
                op: *op,
                value: self.expr(value),
            },
            Stmt::Expr(expr) => Stmt::Expr(self.expr(expr)),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::If {
                cond: self.cond(cond),
                then_branch: self.block(then_branch),
                else_branch: else_branch.as_ref().map(|b| self.block(b)),
            },
            Stmt::While { cond, body } => Stmt::While {
                cond: self.cond(cond),
                body: self.block(body),
            },
            Stmt::DoWhile { body, cond } => Stmt::DoWhile {
                body: self.block(body),
                cond: self.cond(cond),
            },
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => Stmt::For {
                init: init.iter().map(|s| self.stmt(s)).collect(),
                cond: cond.as_ref().map(|c| self.cond(c)),
                update: update.iter().map(|s| self.stmt(s)).collect(),
                body: self.block(body),
            },
            Stmt::Return(value) => Stmt::Return(value.as_ref().map(|e| self.expr(e))),
            Stmt::Block(block) => Stmt::Block(self.block(block)),
            Stmt::Labeled { label, body } => Stmt::Labeled {
                label: label.clone(),
                body: Box::new(self.stmt(body)),
            },
            other => other.clone(),
        }
    }

    fn depends(&self, expr: &Expr) -> bool {
        self.dependence.expr_depends(expr)
    }

    fn probe(&mut self, id: ProbeId, kind: ProbeKind, original: &Expr, inner: Expr) -> Expr {
        self.probes.push(ProbeSite {
            id,
            kind,
            expr: original.to_string(),
            ty: self.referenced.type_of(original),
        });
        Expr::Probe {
            id,
            kind,
            expr: Box::new(inner),
        }
    }

    fn alloc(&mut self) -> ProbeId {
        let id = ProbeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Boolean context: probe the atomic conditions
    fn cond(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Binary { op, lhs, rhs } if op.is_logical() => {
                Expr::binary(*op, self.cond(lhs), self.cond(rhs))
            }
            Expr::Unary {
                op: UnaryOp::Not,
                expr: inner,
            } => Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(self.cond(inner)),
            },
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => Expr::Conditional {
                cond: Box::new(self.cond(cond)),
                then_expr: Box::new(self.cond(then_expr)),
                else_expr: Box::new(self.cond(else_expr)),
            },
            Expr::Literal(_) | Expr::Probe { .. } => expr.clone(),
            Expr::Binary { op, lhs, rhs } if op.is_comparison() => {
                if !self.depends(expr) {
                    return expr.clone();
                }
                let id = self.alloc();
                let inner = Expr::binary(*op, self.expr(lhs), self.expr(rhs));
                self.probe(id, ProbeKind::Branch, expr, inner)
            }
            leaf => {
                if !self.depends(leaf) {
                    return leaf.clone();
                }
                let id = self.alloc();
                let inner = self.operands(leaf);
                self.probe(id, ProbeKind::Branch, leaf, inner)
            }
        }
    }

    /// Value context
    fn expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Binary { op, .. } if op.is_comparison() || op.is_logical() => self.cond(expr),
            Expr::Unary {
                op: UnaryOp::Not, ..
            } => self.cond(expr),
            Expr::Binary { op, .. } if op.is_arithmetic() => self.arithmetic(expr),
            Expr::Unary {
                op: UnaryOp::Neg, ..
            } => self.arithmetic(expr),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => Expr::Conditional {
                cond: Box::new(self.cond(cond)),
                then_expr: Box::new(self.expr(then_expr)),
                else_expr: Box::new(self.expr(else_expr)),
            },
            other => self.operands(other),
        }
    }

    /// Maximal arithmetic tree: one value probe at its root
    fn arithmetic(&mut self, expr: &Expr) -> Expr {
        if !self.referenced.is_numeric(expr) {
            // String concatenation; look for arithmetic below it
            return match expr {
                Expr::Binary { op, lhs, rhs } => Expr::binary(*op, self.expr(lhs), self.expr(rhs)),
                Expr::Unary { op, expr: inner } => Expr::Unary {
                    op: *op,
                    expr: Box::new(self.expr(inner)),
                },
                other => other.clone(),
            };
        }
        if !self.depends(expr) {
            return expr.clone();
        }
        let id = self.alloc();
        let inner = self.arithmetic_operands(expr);
        self.probe(id, ProbeKind::Value, expr, inner)
    }

    /// Rebuild an arithmetic tree, instrumenting only its non-arithmetic leaves
    fn arithmetic_operands(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Binary { op, lhs, rhs } if op.is_arithmetic() => Expr::binary(
                *op,
                self.arithmetic_operands(lhs),
                self.arithmetic_operands(rhs),
            ),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr: inner,
            } => Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(self.arithmetic_operands(inner)),
            },
            other => self.expr(other),
        }
    }

    /// Instrument the children of a non-operator expression
    fn operands(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Cast { ty, expr } => Expr::cast(ty.clone(), self.expr(expr)),
            Expr::Call { name, args } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|a| self.expr(a)).collect(),
            },
            Expr::MethodCall {
                receiver,
                name,
                args,
            } => Expr::MethodCall {
                receiver: Box::new(self.expr(receiver)),
                name: name.clone(),
                args: args.iter().map(|a| self.expr(a)).collect(),
            },
            other => other.clone(),
        }
    }
}

#[cfg(test)]
#[path = "instrument_tests.rs"]
mod tests;
