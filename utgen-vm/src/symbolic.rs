//! Symbolic shadow values
//!
//! Every value derived from a method input carries a [`SymExpr`]
//! describing how it was computed from the inputs along the executed
//! path. Terms are shared through `Arc`, so a term is a DAG; evaluation
//! and traversal memoize by node identity.

use crate::ops::{self, OpError, OpResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use utgen_core::{BinaryOp, Type, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SymExpr {
    /// Method parameter by position
    Input { index: usize, ty: Type },
    Const(Value),
    Neg(Arc<SymExpr>),
    Not(Arc<SymExpr>),
    Arith {
        op: BinaryOp,
        lhs: Arc<SymExpr>,
        rhs: Arc<SymExpr>,
    },
    Compare {
        op: BinaryOp,
        lhs: Arc<SymExpr>,
        rhs: Arc<SymExpr>,
    },
    Concat(Arc<SymExpr>, Arc<SymExpr>),
    Convert { ty: Type, expr: Arc<SymExpr> },
    Length(Arc<SymExpr>),
    IsEmpty(Arc<SymExpr>),
    Equals(Arc<SymExpr>, Arc<SymExpr>),
}

impl SymExpr {
    pub fn input(index: usize, ty: Type) -> Arc<Self> {
        Arc::new(SymExpr::Input { index, ty })
    }

    /// Evaluate over concrete inputs
    pub fn eval(&self, inputs: &[Value]) -> OpResult<Value> {
        Evaluator {
            inputs,
            memo: FxHashMap::default(),
        }
        .eval(self)
    }

    /// Indices of the inputs this term reads
    pub fn inputs(&self) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        self.walk(&mut |node| {
            if let SymExpr::Input { index, .. } = node {
                out.insert(*index);
            }
        });
        out
    }

    /// Constants appearing in this term, in first-seen order
    pub fn constants(&self) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::new();
        self.walk(&mut |node| {
            if let SymExpr::Const(value) = node {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
        });
        out
    }

    fn children(&self) -> Vec<&Arc<SymExpr>> {
        match self {
            SymExpr::Input { .. } | SymExpr::Const(_) => Vec::new(),
            SymExpr::Neg(e)
            | SymExpr::Not(e)
            | SymExpr::Length(e)
            | SymExpr::IsEmpty(e)
            | SymExpr::Convert { expr: e, .. } => vec![e],
            SymExpr::Arith { lhs, rhs, .. }
            | SymExpr::Compare { lhs, rhs, .. }
            | SymExpr::Concat(lhs, rhs)
            | SymExpr::Equals(lhs, rhs) => vec![lhs, rhs],
        }
    }

    /// Visit every distinct node once
    fn walk(&self, visit: &mut dyn FnMut(&SymExpr)) {
        let mut seen: FxHashSet<*const SymExpr> = FxHashSet::default();
        let mut stack: Vec<&SymExpr> = vec![self];
        while let Some(node) = stack.pop() {
            visit(node);
            for child in node.children() {
                if seen.insert(Arc::as_ptr(child)) {
                    stack.push(child);
                }
            }
        }
    }
}

struct Evaluator<'a> {
    inputs: &'a [Value],
    memo: FxHashMap<*const SymExpr, Value>,
}

impl Evaluator<'_> {
    fn shared(&mut self, expr: &Arc<SymExpr>) -> OpResult<Value> {
        let key = Arc::as_ptr(expr);
        if let Some(value) = self.memo.get(&key) {
            return Ok(value.clone());
        }
        let value = self.eval(expr)?;
        self.memo.insert(key, value.clone());
        Ok(value)
    }

    fn eval(&mut self, expr: &SymExpr) -> OpResult<Value> {
        match expr {
            SymExpr::Input { index, .. } => self
                .inputs
                .get(*index)
                .cloned()
                .ok_or(OpError::UnboundInput(*index)),
            SymExpr::Const(value) => Ok(value.clone()),
            SymExpr::Neg(e) => ops::negate(&self.shared(e)?),
            SymExpr::Not(e) => ops::not(&self.shared(e)?),
            SymExpr::Arith { op, lhs, rhs } => {
                let (l, r) = (self.shared(lhs)?, self.shared(rhs)?);
                ops::arithmetic(*op, &l, &r)
            }
            SymExpr::Compare { op, lhs, rhs } => {
                let (l, r) = (self.shared(lhs)?, self.shared(rhs)?);
                ops::compare(*op, &l, &r).map(Value::Bool)
            }
            SymExpr::Concat(lhs, rhs) => {
                let (l, r) = (self.shared(lhs)?, self.shared(rhs)?);
                Ok(ops::concat(&l, &r))
            }
            SymExpr::Convert { ty, expr } => ops::convert(ty, &self.shared(expr)?),
            SymExpr::Length(e) => ops::length(&self.shared(e)?),
            SymExpr::IsEmpty(e) => ops::is_empty(&self.shared(e)?),
            SymExpr::Equals(lhs, rhs) => {
                let (l, r) = (self.shared(lhs)?, self.shared(rhs)?);
                ops::equals(&l, &r)
            }
        }
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymExpr::Input { index, .. } => write!(f, "in{}", index),
            SymExpr::Const(value) => write!(f, "{}", value),
            SymExpr::Neg(e) => write!(f, "(-{})", e),
            SymExpr::Not(e) => write!(f, "(!{})", e),
            SymExpr::Arith { op, lhs, rhs } | SymExpr::Compare { op, lhs, rhs } => {
                write!(f, "({} {} {})", lhs, op.symbol(), rhs)
            }
            SymExpr::Concat(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            SymExpr::Convert { ty, expr } => write!(f, "(({}) {})", ty, expr),
            SymExpr::Length(e) => write!(f, "{}.length()", e),
            SymExpr::IsEmpty(e) => write!(f, "{}.isEmpty()", e),
            SymExpr::Equals(lhs, rhs) => write!(f, "{}.equals({})", lhs, rhs),
        }
    }
}
