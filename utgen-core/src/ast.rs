//! AST for the Java subset accepted by the source model provider
//!
//! The tree is plain owned data: rewrite passes consume a tree and build a
//! new one instead of patching nodes in place.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a parameter, local, cast or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    /// 32-bit wrapping integer
    Int,
    /// 64-bit wrapping integer
    Long,
    /// IEEE-754 double
    Double,
    /// Boolean
    Boolean,
    /// Immutable string reference
    String,
    /// No value (return type only)
    Void,
    /// Any other class name, opaque to the toolchain
    Reference(String),
}

impl Type {
    /// Resolve a type from its source spelling
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => Type::Int,
            "long" => Type::Long,
            "double" => Type::Double,
            "boolean" => Type::Boolean,
            "String" => Type::String,
            "void" => Type::Void,
            other => Type::Reference(other.to_string()),
        }
    }

    /// Source spelling of the type
    pub fn name(&self) -> &str {
        match self {
            Type::Int => "int",
            Type::Long => "long",
            Type::Double => "double",
            Type::Boolean => "boolean",
            Type::String => "String",
            Type::Void => "void",
            Type::Reference(name) => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Double)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int | Type::Long)
    }

    /// Reference types can hold `null`
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::String | Type::Reference(_))
    }

    /// Numeric rank used for binary numeric promotion
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Int => Some(0),
            Type::Long => Some(1),
            Type::Double => Some(2),
            _ => None,
        }
    }

    /// Result type of a binary arithmetic operation on two numeric types
    pub fn promote(lhs: &Type, rhs: &Type) -> Option<Type> {
        let l = lhs.numeric_rank()?;
        let r = rhs.numeric_rank()?;
        Some(match l.max(r) {
            0 => Type::Int,
            1 => Type::Long,
            _ => Type::Double,
        })
    }

    /// Whether a value of type `from` may be stored into a slot of this type
    /// without an explicit cast (identity or widening).
    pub fn accepts(&self, from: &Type) -> bool {
        if self == from {
            return true;
        }
        match (self.numeric_rank(), from.numeric_rank()) {
            (Some(to), Some(from)) => from <= to,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of a probe inserted by the instrumentation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeId(pub u32);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// What a probe reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    /// A boolean condition; its outcome is a branch the search can flip
    Branch,
    /// A numeric value observed on the side channel
    Value,
}

impl ProbeKind {
    /// Intrinsic name used in source text
    pub fn intrinsic(&self) -> &'static str {
        match self {
            ProbeKind::Branch => PROBE_INTRINSIC,
            ProbeKind::Value => PROBE_VALUE_INTRINSIC,
        }
    }
}

/// Intrinsic wrapping a branch probe: `__probe(id, cond)`
pub const PROBE_INTRINSIC: &str = "__probe";
/// Intrinsic wrapping a value probe: `__probe_value(id, expr)`
pub const PROBE_VALUE_INTRINSIC: &str = "__probe_value";
/// Intrinsic marking an execution that exceeded the unrolling bound
pub const BOUND_EXCEEDED_INTRINSIC: &str = "__bound_exceeded";
/// Prefix reserved for labels generated by the rewrite engine
pub const GENERATED_LABEL_PREFIX: &str = "__";

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl Literal {
    /// Static type of the literal; `null` has no type of its own
    pub fn ty(&self) -> Option<Type> {
        match self {
            Literal::Int(_) => Some(Type::Int),
            Literal::Long(_) => Some(Type::Long),
            Literal::Double(_) => Some(Type::Double),
            Literal::Bool(_) => Some(Type::Boolean),
            Literal::Str(_) => Some(Type::String),
            Literal::Null => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }

    /// Relational and equality comparisons
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// The comparison that holds exactly when this one does not
    pub fn negated(&self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::Lt => BinaryOp::Ge,
            BinaryOp::Le => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Le,
            BinaryOp::Ge => BinaryOp::Lt,
            BinaryOp::Eq => BinaryOp::Ne,
            BinaryOp::Ne => BinaryOp::Eq,
            _ => return None,
        })
    }
}

/// Operator of an assignment statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
        }
    }

    /// Arithmetic operator carried by a compound assignment
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Rem => Some(BinaryOp::Rem),
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Var(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: Type,
        expr: Box<Expr>,
    },
    /// Call to another method of the same class
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// Call on a receiver value, e.g. `s.length()`
    MethodCall {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// Instrumentation hook; evaluates to its operand
    Probe {
        id: ProbeId,
        kind: ProbeKind,
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(value: i32) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn cast(ty: Type, expr: Expr) -> Self {
        Expr::Cast {
            ty,
            expr: Box::new(expr),
        }
    }

    /// Collect every variable name read by this expression
    pub fn free_vars(&self, out: &mut FxHashSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } | Expr::Probe { expr, .. } => {
                expr.free_vars(out)
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.free_vars(out);
                rhs.free_vars(out);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.free_vars(out);
                then_expr.free_vars(out);
                else_expr.free_vars(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.free_vars(out);
                }
            }
            Expr::MethodCall { receiver, args, .. } => {
                receiver.free_vars(out);
                for arg in args {
                    arg.free_vars(out);
                }
            }
        }
    }

    /// Replace variable reads for which `rename` yields a new name
    pub fn rename_vars(&mut self, rename: &dyn Fn(&str) -> Option<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var(name) => {
                if let Some(renamed) = rename(name) {
                    *name = renamed;
                }
            }
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } | Expr::Probe { expr, .. } => {
                expr.rename_vars(rename)
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.rename_vars(rename);
                rhs.rename_vars(rename);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.rename_vars(rename);
                then_expr.rename_vars(rename);
                else_expr.rename_vars(rename);
            }
            Expr::Call { args, .. } => args.iter_mut().for_each(|a| a.rename_vars(rename)),
            Expr::MethodCall { receiver, args, .. } => {
                receiver.rename_vars(rename);
                args.iter_mut().for_each(|a| a.rename_vars(rename));
            }
        }
    }

    /// Number of expression nodes
    pub fn node_count(&self) -> usize {
        1 + match self {
            Expr::Literal(_) | Expr::Var(_) => 0,
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } | Expr::Probe { expr, .. } => {
                expr.node_count()
            }
            Expr::Binary { lhs, rhs, .. } => lhs.node_count() + rhs.node_count(),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => cond.node_count() + then_expr.node_count() + else_expr.node_count(),
            Expr::Call { args, .. } => args.iter().map(Expr::node_count).sum(),
            Expr::MethodCall { receiver, args, .. } => {
                receiver.node_count() + args.iter().map(Expr::node_count).sum::<usize>()
            }
        }
    }
}

/// `x++` or `x--`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Increment,
    Decrement,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Local {
        ty: Type,
        name: String,
        init: Option<Expr>,
    },
    Assign {
        target: String,
        op: AssignOp,
        value: Expr,
    },
    Step {
        target: String,
        step: Step,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Stmt>,
        body: Block,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    Block(Block),
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    /// Marks an execution that needed more than `k` loop iterations
    BoundExceeded,
}

impl Stmt {
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. }
        )
    }

    /// Number of statement and expression nodes below and including this one
    pub fn node_count(&self) -> usize {
        1 + match self {
            Stmt::Local { init, .. } => init.as_ref().map_or(0, Expr::node_count),
            Stmt::Assign { value, .. } => value.node_count(),
            Stmt::Step { .. } => 0,
            Stmt::Expr(expr) => expr.node_count(),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.node_count()
                    + then_branch.node_count()
                    + else_branch.as_ref().map_or(0, Block::node_count)
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                cond.node_count() + body.node_count()
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                init.iter().map(Stmt::node_count).sum::<usize>()
                    + cond.as_ref().map_or(0, Expr::node_count)
                    + update.iter().map(Stmt::node_count).sum::<usize>()
                    + body.node_count()
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::BoundExceeded => 0,
            Stmt::Return(value) => value.as_ref().map_or(0, Expr::node_count),
            Stmt::Block(block) => block.node_count(),
            Stmt::Labeled { body, .. } => body.node_count(),
        }
    }
}

/// A braced statement list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn node_count(&self) -> usize {
        self.stmts.iter().map(Stmt::node_count).sum()
    }

    /// Whether any loop statement remains anywhere in the block
    pub fn contains_loop(&self) -> bool {
        self.stmts.iter().any(stmt_contains_loop)
    }
}

fn stmt_contains_loop(stmt: &Stmt) -> bool {
    match stmt {
        s if s.is_loop() => true,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => then_branch.contains_loop() || else_branch.as_ref().is_some_and(Block::contains_loop),
        Stmt::Block(block) => block.contains_loop(),
        Stmt::Labeled { body, .. } => stmt_contains_loop(body),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Static => "static",
            Modifier::Final => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub ty: Type,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub modifiers: Vec<Modifier>,
    pub return_type: Type,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
}

impl MethodDecl {
    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            params: self.param_types(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

/// Name plus ordered parameter types; identifies a method inside its class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Type>,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    /// Find a method by signature
    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|m| m.name == signature.name && m.param_types() == signature.params)
    }

    /// Replace the method with the same signature, returning the previous one
    pub fn replace_method(&mut self, method: MethodDecl) -> Option<MethodDecl> {
        let signature = method.signature();
        let slot = self
            .methods
            .iter_mut()
            .find(|m| m.name == signature.name && m.param_types() == signature.params)?;
        Some(std::mem::replace(slot, method))
    }
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub class: ClassDecl,
}

impl CompilationUnit {
    /// `package.Class`, or just `Class` in the default package
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, self.class.name),
            None => self.class.name.clone(),
        }
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
