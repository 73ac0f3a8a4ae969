//! Type and dependence analysis over method bodies

use crate::error::{Result, RewriteError};
use crate::visitor::{walk_expr, walk_stmt, Visitor};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utgen_core::ast::*;

/// Declared types visible inside one method
///
/// Holds the type of every parameter and local by name, the return types
/// of same-class methods, and the set of distinct types the method
/// mentions (parameters, locals, casts and its return type).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencedTypes {
    params: Vec<Param>,
    variables: BTreeMap<String, Type>,
    methods: BTreeMap<String, Type>,
    return_type: Option<Type>,
    types: BTreeSet<Type>,
}

impl ReferencedTypes {
    /// Collect the types referenced by a method
    ///
    /// Fails when a local is declared twice with different types, since
    /// compound-assignment lowering needs one type per name. Run
    /// [`separate_locals`] first to rename such redeclarations.
    pub fn collect(method: &MethodDecl) -> Result<Self> {
        let mut collector = TypeCollector {
            referenced: ReferencedTypes {
                params: method.params.clone(),
                return_type: Some(method.return_type.clone()),
                ..Default::default()
            },
            error: None,
        };
        collector.referenced.types.insert(method.return_type.clone());
        for param in &method.params {
            collector.declare(&param.name, &param.ty);
        }
        for stmt in &method.body.stmts {
            collector.visit_stmt(stmt);
        }
        match collector.error {
            Some(err) => Err(err),
            None => Ok(collector.referenced),
        }
    }

    /// Record return types of the other methods of the class
    pub fn with_class_methods(mut self, class: &ClassDecl) -> Self {
        for method in &class.methods {
            self.methods
                .entry(method.name.clone())
                .or_insert_with(|| method.return_type.clone());
        }
        self
    }

    /// Declared type of a parameter or local
    pub fn var_type(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    /// Return type of a same-class method
    pub fn method_return_type(&self, name: &str) -> Option<&Type> {
        self.methods.get(name)
    }

    /// Parameters in declaration order
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether `name` is a parameter of the method
    pub fn is_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Distinct types mentioned by the method
    pub fn types(&self) -> &BTreeSet<Type> {
        &self.types
    }

    /// Return type of the method itself
    pub fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    /// Static type of an expression, when it can be determined locally
    pub fn type_of(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal(lit) => lit.ty(),
            Expr::Var(name) => self.var_type(name).cloned(),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => self.type_of(expr),
                UnaryOp::Not => Some(Type::Boolean),
            },
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(Type::Boolean);
                }
                let lhs = self.type_of(lhs)?;
                let rhs = self.type_of(rhs)?;
                if *op == BinaryOp::Add && (lhs == Type::String || rhs == Type::String) {
                    Some(Type::String)
                } else {
                    Type::promote(&lhs, &rhs)
                }
            }
            Expr::Conditional {
                then_expr,
                else_expr,
                ..
            } => {
                let then_ty = self.type_of(then_expr)?;
                let else_ty = self.type_of(else_expr)?;
                if then_ty == else_ty {
                    Some(then_ty)
                } else {
                    Type::promote(&then_ty, &else_ty)
                }
            }
            Expr::Cast { ty, .. } => Some(ty.clone()),
            Expr::Call { name, .. } => self.method_return_type(name).cloned(),
            Expr::MethodCall { name, .. } => match name.as_str() {
                "length" => Some(Type::Int),
                "isEmpty" | "equals" => Some(Type::Boolean),
                _ => None,
            },
            Expr::Probe { expr, .. } => self.type_of(expr),
        }
    }

    /// Whether an expression is known to be numeric
    pub fn is_numeric(&self, expr: &Expr) -> bool {
        self.type_of(expr).is_some_and(|ty| ty.is_numeric())
    }
}

struct TypeCollector {
    referenced: ReferencedTypes,
    error: Option<RewriteError>,
}

impl TypeCollector {
    fn declare(&mut self, name: &str, ty: &Type) {
        self.referenced.types.insert(ty.clone());
        match self.referenced.variables.get(name) {
            Some(existing) if existing != ty => {
                if self.error.is_none() {
                    self.error = Some(RewriteError::ConflictingLocal {
                        name: name.to_string(),
                        first: existing.clone(),
                        second: ty.clone(),
                    });
                }
            }
            Some(_) => {}
            None => {
                self.referenced
                    .variables
                    .insert(name.to_string(), ty.clone());
            }
        }
    }
}

impl Visitor for TypeCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local { ty, name, .. } = stmt {
            self.declare(name, ty);
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Cast { ty, .. } = expr {
            self.referenced.types.insert(ty.clone());
        }
        walk_expr(self, expr);
    }
}

/// Rename locals that reuse a name with another type in a sibling scope
///
/// Java only allows such a redeclaration once the earlier one is out of
/// scope, so the two are independent variables. The later one is renamed
/// to `name_N` within its own scope, leaving one type per name.
pub fn separate_locals(method: &MethodDecl) -> MethodDecl {
    let mut names = LocalNames::default();
    for stmt in &method.body.stmts {
        names.visit_stmt(stmt);
    }
    let mut renamer = LocalRenamer {
        types: method
            .params
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect(),
        taken: names.0,
        scopes: Vec::new(),
        renamed: 0,
    };
    renamer.taken.extend(method.params.iter().map(|p| p.name.clone()));

    let mut separated = method.clone();
    renamer.block(&mut separated.body);
    if renamer.renamed > 0 {
        log::debug!(
            "{}: renamed {} locals redeclared with another type",
            method.name,
            renamer.renamed
        );
    }
    separated
}

#[derive(Default)]
struct LocalNames(FxHashSet<String>);

impl Visitor for LocalNames {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local { name, .. } = stmt {
            self.0.insert(name.clone());
        }
        walk_stmt(self, stmt);
    }
}

struct LocalRenamer {
    types: FxHashMap<String, Type>,
    taken: FxHashSet<String>,
    /// Source name to emitted name, innermost scope last
    scopes: Vec<FxHashMap<String, String>>,
    renamed: usize,
}

impl LocalRenamer {
    fn resolve(&self, name: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .filter(|emitted| emitted.as_str() != name)
            .cloned()
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(FxHashMap::default());
        f(self);
        self.scopes.pop();
    }

    fn block(&mut self, block: &mut Block) {
        self.scoped(|r| block.stmts.iter_mut().for_each(|s| r.stmt(s)));
    }

    fn expr(&self, expr: &mut Expr) {
        expr.rename_vars(&|name| self.resolve(name));
    }

    fn target(&self, target: &mut String) {
        if let Some(emitted) = self.resolve(target) {
            *target = emitted;
        }
    }

    fn declare(&mut self, name: &mut String, ty: &Type) {
        let emitted = match self.types.get(name.as_str()) {
            Some(existing) if existing != ty => (1..)
                .map(|n| format!("{}_{}", name, n))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_else(|| name.clone()),
            _ => name.clone(),
        };
        self.taken.insert(emitted.clone());
        self.types
            .entry(emitted.clone())
            .or_insert_with(|| ty.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), emitted.clone());
        }
        if emitted != *name {
            self.renamed += 1;
            *name = emitted;
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Local { ty, name, init } => {
                if let Some(init) = init {
                    self.expr(init);
                }
                self.declare(name, ty);
            }
            Stmt::Assign { target, value, .. } => {
                self.expr(value);
                self.target(target);
            }
            Stmt::Step { target, .. } => self.target(target),
            Stmt::Expr(expr) | Stmt::Return(Some(expr)) => self.expr(expr),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                self.block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.block(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.expr(cond);
                self.block(body);
            }
            Stmt::DoWhile { body, cond } => {
                self.block(body);
                self.expr(cond);
            }
            // Header locals are visible in the condition, update and body only
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => self.scoped(|r| {
                init.iter_mut().for_each(|s| r.stmt(s));
                if let Some(cond) = cond {
                    r.expr(cond);
                }
                update.iter_mut().for_each(|s| r.stmt(s));
                r.block(body);
            }),
            Stmt::Block(block) => self.block(block),
            Stmt::Labeled { body, .. } => self.stmt(body),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Return(None) | Stmt::BoundExceeded => {}
        }
    }
}

/// Flow-insensitive set of variables whose value depends on a parameter
///
/// Starts from the parameters and adds every variable assigned from an
/// expression that reads a dependent variable, until nothing changes.
#[derive(Debug, Clone, Default)]
pub struct ParamDependence {
    dependent: FxHashSet<String>,
}

impl ParamDependence {
    /// Run the dependence fixpoint over a body with the given parameters
    pub fn analyze(body: &Block, params: &[Param]) -> Self {
        let mut assignments = AssignmentCollector::default();
        for stmt in &body.stmts {
            assignments.visit_stmt(stmt);
        }

        let mut dependent: FxHashSet<String> = params.iter().map(|p| p.name.clone()).collect();
        loop {
            let before = dependent.len();
            for (target, sources) in &assignments.edges {
                if !dependent.contains(target) && sources.iter().any(|s| dependent.contains(s)) {
                    dependent.insert(target.clone());
                }
            }
            if dependent.len() == before {
                break;
            }
        }
        log::trace!(
            "{} variables depend on parameters across {} assignments",
            dependent.len(),
            assignments.edges.len()
        );
        Self { dependent }
    }

    /// Whether a variable depends on a parameter
    pub fn is_dependent(&self, name: &str) -> bool {
        self.dependent.contains(name)
    }

    /// Whether an expression reads a dependent variable
    pub fn expr_depends(&self, expr: &Expr) -> bool {
        let mut vars = FxHashSet::default();
        expr.free_vars(&mut vars);
        vars.iter().any(|v| self.dependent.contains(v))
    }
}

#[derive(Default)]
struct AssignmentCollector {
    edges: Vec<(String, FxHashSet<String>)>,
}

impl Visitor for AssignmentCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local {
                name,
                init: Some(init),
                ..
            } => {
                let mut sources = FxHashSet::default();
                init.free_vars(&mut sources);
                self.edges.push((name.clone(), sources));
            }
            Stmt::Assign { target, op, value } => {
                let mut sources = FxHashSet::default();
                value.free_vars(&mut sources);
                if *op != AssignOp::Set {
                    sources.insert(target.clone());
                }
                self.edges.push((target.clone(), sources));
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}

/// Labels declared anywhere in a block
pub fn declared_labels(block: &Block) -> Vec<String> {
    struct Labels(Vec<String>);
    impl Visitor for Labels {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if let Stmt::Labeled { label, .. } = stmt {
                self.0.push(label.clone());
            }
            walk_stmt(self, stmt);
        }
    }
    let mut labels = Labels(Vec::new());
    for stmt in &block.stmts {
        labels.visit_stmt(stmt);
    }
    labels.0
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;
