//! Type checker and compiler from the class AST to bytecode
//!
//! Each method is checked and lowered in a single pass. Every problem is
//! recorded as a [`Diagnostic`] and compilation continues, so one run
//! reports all errors of a unit. Any error-severity diagnostic fails the
//! whole unit.

use crate::bytecode::{type_code, Bytecode, BytecodeChunk, Instruction, Opcode};
use crate::error::{CompileError, Diagnostic};
use rustc_hash::{FxHashMap, FxHashSet};
use utgen_core::ast::*;
use utgen_core::Value;
use utgen_parser::{line_col, ParseError};

/// Bytecode of a unit that compiled without errors
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub bytecode: Bytecode,
    /// Warning-severity diagnostics
    pub warnings: Vec<Diagnostic>,
}

/// Parse and compile source text; parse errors become diagnostics
pub fn compile_source(source: &str) -> Result<CompiledUnit, CompileError> {
    let unit = utgen_parser::parse(source).map_err(|err| CompileError {
        diagnostics: vec![parse_diagnostic(source, &err)],
    })?;
    compile_unit(&unit)
}

/// Compile an already parsed unit
pub fn compile_unit(unit: &CompilationUnit) -> Result<CompiledUnit, CompileError> {
    Compiler::new(unit).compile()
}

fn parse_diagnostic(source: &str, err: &ParseError) -> Diagnostic {
    match err.position() {
        Some(position) => {
            let (line, column) = line_col(source, position);
            Diagnostic::error(None, format!("{}:{}: {}", line, column, err))
        }
        None => Diagnostic::error(None, err.to_string()),
    }
}

/// The static type of `null`
fn null_type() -> Type {
    Type::Reference("null".to_string())
}

fn is_null_type(ty: &Type) -> bool {
    matches!(ty, Type::Reference(name) if name == "null")
}

/// Assignment conversion: identity, numeric widening, or `null` to a reference
fn assignable(to: &Type, from: &Type) -> bool {
    to.accepts(from) || (is_null_type(from) && to.is_reference())
}

/// Common type of the two arms of `?:`
fn unify(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    if let Some(promoted) = Type::promote(a, b) {
        return Some(promoted);
    }
    if is_null_type(a) && b.is_reference() {
        return Some(b.clone());
    }
    if is_null_type(b) && a.is_reference() {
        return Some(a.clone());
    }
    None
}

pub struct Compiler<'a> {
    unit: &'a CompilationUnit,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Compiler<'a> {
    pub fn new(unit: &'a CompilationUnit) -> Self {
        Self {
            unit,
            diagnostics: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<CompiledUnit, CompileError> {
        let class = &self.unit.class;
        let mut signatures = FxHashSet::default();
        for method in &class.methods {
            if !signatures.insert(method.signature()) {
                self.diagnostics.push(Diagnostic::error(
                    None,
                    format!(
                        "method {} is already defined in class {}",
                        method.signature(),
                        class.name
                    ),
                ));
            }
        }

        let mut bytecode = Bytecode::new(self.unit.package.clone(), class.name.clone());
        for method in &class.methods {
            let chunk = MethodCompiler::new(class, method, &mut self.diagnostics).compile();
            bytecode.add_chunk(chunk);
        }

        if self.diagnostics.iter().any(Diagnostic::is_error) {
            return Err(CompileError {
                diagnostics: self.diagnostics,
            });
        }
        Ok(CompiledUnit {
            bytecode,
            warnings: self.diagnostics,
        })
    }
}

#[derive(Debug, Clone)]
struct Local {
    slot: u32,
    ty: Type,
}

/// Pending jumps of a statement `break`/`continue` can target
struct JumpTarget {
    label: Option<String>,
    is_loop: bool,
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

struct MethodCompiler<'a> {
    class: &'a ClassDecl,
    method: &'a MethodDecl,
    signature: String,
    chunk: BytecodeChunk,
    scopes: Vec<FxHashMap<String, Local>>,
    next_slot: u32,
    targets: Vec<JumpTarget>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> MethodCompiler<'a> {
    fn new(
        class: &'a ClassDecl,
        method: &'a MethodDecl,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            class,
            method,
            signature: method.signature().to_string(),
            chunk: BytecodeChunk::new(
                method.name.clone(),
                method.param_types(),
                method.return_type.clone(),
            ),
            scopes: Vec::new(),
            next_slot: 0,
            targets: Vec::new(),
            diagnostics,
        }
    }

    fn compile(mut self) -> BytecodeChunk {
        let method = self.method;
        self.scopes.push(FxHashMap::default());
        for param in &method.params {
            if param.ty == Type::Void {
                self.error(format!("illegal type void for parameter `{}`", param.name));
            }
            self.declare(&param.name, param.ty.clone());
        }

        for stmt in &method.body.stmts {
            self.stmt(stmt);
        }

        if method.return_type == Type::Void {
            self.emit(Instruction::new(Opcode::ReturnVoid));
        } else {
            if block_completes(&method.body) {
                self.diagnostics.push(Diagnostic::warning(
                    Some(self.signature.as_str()),
                    "missing return statement; reaching the end traps at runtime",
                ));
            }
            self.emit(Instruction::new(Opcode::MissingReturn));
        }

        self.chunk.local_count = self.next_slot;
        self.chunk
    }

    fn error(&mut self, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(Some(self.signature.as_str()), message));
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.chunk.add_instruction(instruction)
    }

    fn current_offset(&self) -> usize {
        self.chunk.instructions.len()
    }

    fn patch_jump(&mut self, offset: usize, target: usize) {
        self.chunk.patch_jump(offset, target);
    }

    fn push_constant(&mut self, value: Value) {
        let index = self.chunk.add_constant(value);
        self.emit(Instruction::with_arg(Opcode::PushConst, index));
    }

    fn lookup(&self, name: &str) -> Option<Local> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    fn declare(&mut self, name: &str, ty: Type) -> u32 {
        if self.lookup(name).is_some() {
            self.error(format!("variable `{}` is already defined", name));
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Local { slot, ty });
        }
        slot
    }

    /// Convert the value on top of the stack from `from` to `to`
    fn coerce(&mut self, from: Option<Type>, to: &Type) {
        let Some(from) = from else {
            return;
        };
        if from == Type::Void {
            self.error("'void' type not allowed here");
            return;
        }
        if from == *to || (is_null_type(&from) && to.is_reference()) {
            return;
        }
        if to.accepts(&from) {
            if let Some(code) = type_code(to) {
                self.emit(Instruction::with_arg(Opcode::Convert, code));
            }
            return;
        }
        if from.is_numeric() && to.is_numeric() {
            self.error(format!(
                "incompatible types: possible lossy conversion from {} to {}",
                from, to
            ));
        } else {
            self.error(format!(
                "incompatible types: {} cannot be converted to {}",
                from, to
            ));
        }
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(FxHashMap::default());
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local { ty, name, init } => {
                if *ty == Type::Void {
                    self.error(format!("illegal type void for variable `{}`", name));
                }
                match init {
                    Some(init) => {
                        let from = self.expr(init);
                        self.coerce(from, ty);
                    }
                    None => match Value::default_for(ty) {
                        Some(value) => self.push_default(value),
                        None => {
                            self.emit(Instruction::new(Opcode::PushNull));
                        }
                    },
                }
                let slot = self.declare(name, ty.clone());
                self.emit(Instruction::with_arg(Opcode::Store, slot));
            }
            Stmt::Assign { target, op, value } => self.assign(target, *op, value),
            Stmt::Step { target, step } => self.step(target, *step),
            Stmt::Expr(expr) => {
                if let Some(ty) = self.expr(expr) {
                    if ty != Type::Void {
                        self.emit(Instruction::new(Opcode::Pop));
                    }
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.condition(cond);
                let jump_to_else = self.emit(Instruction::with_arg(Opcode::JumpIfNot, 0));
                self.block(then_branch);
                match else_branch {
                    Some(else_branch) => {
                        let jump_over_else = self.emit(Instruction::with_arg(Opcode::Jump, 0));
                        let else_start = self.current_offset();
                        self.patch_jump(jump_to_else, else_start);
                        self.block(else_branch);
                        let end = self.current_offset();
                        self.patch_jump(jump_over_else, end);
                    }
                    None => {
                        let end = self.current_offset();
                        self.patch_jump(jump_to_else, end);
                    }
                }
            }
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } => self.loop_stmt(stmt, None),
            Stmt::Break(label) => self.jump_out(label.as_deref(), false),
            Stmt::Continue(label) => self.jump_out(label.as_deref(), true),
            Stmt::Return(value) => self.return_stmt(value.as_ref()),
            Stmt::Block(block) => self.block(block),
            Stmt::Labeled { label, body } => {
                if self.targets.iter().any(|t| t.label.as_deref() == Some(label.as_str())) {
                    self.error(format!("label `{}` is already in use", label));
                }
                if body.is_loop() {
                    self.loop_stmt(body, Some(label.clone()));
                } else {
                    self.targets.push(JumpTarget {
                        label: Some(label.clone()),
                        is_loop: false,
                        breaks: Vec::new(),
                        continues: Vec::new(),
                    });
                    self.stmt(body);
                    self.finish_target(None);
                }
            }
            Stmt::BoundExceeded => {
                self.emit(Instruction::new(Opcode::BoundExceeded));
            }
        }
    }

    fn push_default(&mut self, value: Value) {
        match value {
            Value::Bool(false) => {
                self.emit(Instruction::new(Opcode::PushFalse));
            }
            other => self.push_constant(other),
        }
    }

    fn assign(&mut self, target: &str, op: AssignOp, value: &Expr) {
        let Some(local) = self.lookup(target) else {
            self.error(format!("cannot find symbol `{}`", target));
            self.expr(value);
            return;
        };
        let Some(binary) = op.binary() else {
            let from = self.expr(value);
            self.coerce(from, &local.ty);
            self.emit(Instruction::with_arg(Opcode::Store, local.slot));
            return;
        };

        self.emit(Instruction::with_arg(Opcode::Load, local.slot));
        let from = self.expr(value);
        let Some(from) = from else {
            return;
        };
        if binary == BinaryOp::Add && local.ty == Type::String && from != Type::Void {
            self.emit(Instruction::new(Opcode::Concat));
        } else if local.ty.is_numeric() && from.is_numeric() {
            if let Some(opcode) = Opcode::for_binary(binary) {
                self.emit(Instruction::new(opcode));
            }
            // Compound assignment narrows implicitly
            if Type::promote(&local.ty, &from).as_ref() != Some(&local.ty) {
                if let Some(code) = type_code(&local.ty) {
                    self.emit(Instruction::with_arg(Opcode::Convert, code));
                }
            }
        } else {
            self.error(format!(
                "bad operand types for binary operator '{}': {} and {}",
                op.symbol(),
                local.ty,
                from
            ));
            return;
        }
        self.emit(Instruction::with_arg(Opcode::Store, local.slot));
    }

    fn step(&mut self, target: &str, step: Step) {
        let Some(local) = self.lookup(target) else {
            self.error(format!("cannot find symbol `{}`", target));
            return;
        };
        let one = match local.ty {
            Type::Int => Value::Int(1),
            Type::Long => Value::Long(1),
            Type::Double => Value::Double(1.0),
            _ => {
                self.error(format!(
                    "bad operand type {} for increment or decrement",
                    local.ty
                ));
                return;
            }
        };
        self.emit(Instruction::with_arg(Opcode::Load, local.slot));
        self.push_constant(one);
        let opcode = match step {
            Step::Increment => Opcode::Add,
            Step::Decrement => Opcode::Sub,
        };
        self.emit(Instruction::new(opcode));
        self.emit(Instruction::with_arg(Opcode::Store, local.slot));
    }

    fn loop_stmt(&mut self, stmt: &Stmt, label: Option<String>) {
        let target = JumpTarget {
            label,
            is_loop: true,
            breaks: Vec::new(),
            continues: Vec::new(),
        };
        match stmt {
            Stmt::While { cond, body } => {
                let start = self.current_offset();
                self.condition(cond);
                let exit = self.emit(Instruction::with_arg(Opcode::JumpIfNot, 0));
                self.targets.push(target);
                self.block(body);
                self.emit(Instruction::with_arg(Opcode::Jump, start as u32));
                let end = self.current_offset();
                self.patch_jump(exit, end);
                self.finish_target(Some(start));
            }
            Stmt::DoWhile { body, cond } => {
                let start = self.current_offset();
                self.targets.push(target);
                self.block(body);
                let cont = self.current_offset();
                self.condition(cond);
                self.emit(Instruction::with_arg(Opcode::JumpIf, start as u32));
                self.finish_target(Some(cont));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.scopes.push(FxHashMap::default());
                for stmt in init {
                    self.stmt(stmt);
                }
                let start = self.current_offset();
                let exit = cond.as_ref().map(|cond| {
                    self.condition(cond);
                    self.emit(Instruction::with_arg(Opcode::JumpIfNot, 0))
                });
                self.targets.push(target);
                self.block(body);
                let cont = self.current_offset();
                for stmt in update {
                    self.stmt(stmt);
                }
                self.emit(Instruction::with_arg(Opcode::Jump, start as u32));
                if let Some(exit) = exit {
                    let end = self.current_offset();
                    self.patch_jump(exit, end);
                }
                self.finish_target(Some(cont));
                self.scopes.pop();
            }
            _ => {}
        }
    }

    /// Pop the innermost target, pointing its breaks here and its continues
    /// at `continue_to`
    fn finish_target(&mut self, continue_to: Option<usize>) {
        let Some(target) = self.targets.pop() else {
            return;
        };
        let end = self.current_offset();
        for offset in target.breaks {
            self.patch_jump(offset, end);
        }
        if let Some(continue_to) = continue_to {
            for offset in target.continues {
                self.patch_jump(offset, continue_to);
            }
        }
    }

    fn jump_out(&mut self, label: Option<&str>, is_continue: bool) {
        let keyword = if is_continue { "continue" } else { "break" };
        let found = match label {
            None => self.targets.iter().rposition(|t| t.is_loop),
            Some(label) => self
                .targets
                .iter()
                .rposition(|t| t.label.as_deref() == Some(label)),
        };
        let Some(index) = found else {
            match label {
                Some(label) => self.error(format!("undefined label: {}", label)),
                None => self.error(format!("{} outside of loop", keyword)),
            }
            return;
        };
        if is_continue && !self.targets[index].is_loop {
            self.error(format!("not a loop label: {}", label.unwrap_or_default()));
            return;
        }
        let offset = self.emit(Instruction::with_arg(Opcode::Jump, 0));
        let target = &mut self.targets[index];
        if is_continue {
            target.continues.push(offset);
        } else {
            target.breaks.push(offset);
        }
    }

    fn return_stmt(&mut self, value: Option<&Expr>) {
        let return_type = self.method.return_type.clone();
        match (return_type == Type::Void, value) {
            (true, None) => {
                self.emit(Instruction::new(Opcode::ReturnVoid));
            }
            (true, Some(value)) => {
                self.error("incompatible types: unexpected return value");
                self.expr(value);
            }
            (false, None) => self.error("missing return value"),
            (false, Some(value)) => {
                let from = self.expr(value);
                self.coerce(from, &return_type);
                self.emit(Instruction::new(Opcode::Return));
            }
        }
    }

    /// Compile a condition that must be boolean
    fn condition(&mut self, expr: &Expr) {
        match self.expr(expr) {
            Some(Type::Boolean) | None => {}
            Some(other) => self.error(format!(
                "incompatible types: {} cannot be converted to boolean",
                other
            )),
        }
    }

    /// Compile an expression, returning its static type; `None` after an error
    fn expr(&mut self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal(lit) => {
                match lit {
                    Literal::Bool(true) => {
                        self.emit(Instruction::new(Opcode::PushTrue));
                    }
                    Literal::Bool(false) => {
                        self.emit(Instruction::new(Opcode::PushFalse));
                    }
                    Literal::Null => {
                        self.emit(Instruction::new(Opcode::PushNull));
                    }
                    other => self.push_constant(Value::from(other)),
                }
                Some(lit.ty().unwrap_or_else(null_type))
            }
            Expr::Var(name) => match self.lookup(name) {
                Some(local) => {
                    self.emit(Instruction::with_arg(Opcode::Load, local.slot));
                    Some(local.ty)
                }
                None => {
                    self.error(format!("cannot find symbol `{}`", name));
                    None
                }
            },
            Expr::Unary { op, expr } => {
                let ty = self.expr(expr)?;
                match op {
                    UnaryOp::Neg if ty.is_numeric() => {
                        self.emit(Instruction::new(Opcode::Neg));
                        Some(ty)
                    }
                    UnaryOp::Not if ty == Type::Boolean => {
                        self.emit(Instruction::new(Opcode::Not));
                        Some(ty)
                    }
                    _ => {
                        let symbol = if *op == UnaryOp::Neg { "-" } else { "!" };
                        self.error(format!("bad operand type {} for unary operator '{}'", ty, symbol));
                        None
                    }
                }
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                let result = match (self.peek_type(then_expr), self.peek_type(else_expr)) {
                    (Some(a), Some(b)) => match unify(&a, &b) {
                        Some(ty) => Some(ty),
                        None => {
                            self.error(format!(
                                "incompatible types in conditional expression: {} and {}",
                                a, b
                            ));
                            None
                        }
                    },
                    _ => None,
                };
                self.condition(cond);
                let jump_to_else = self.emit(Instruction::with_arg(Opcode::JumpIfNot, 0));
                let then_ty = self.expr(then_expr);
                if let Some(result) = &result {
                    self.coerce(then_ty, result);
                }
                let jump_over_else = self.emit(Instruction::with_arg(Opcode::Jump, 0));
                let else_start = self.current_offset();
                self.patch_jump(jump_to_else, else_start);
                let else_ty = self.expr(else_expr);
                if let Some(result) = &result {
                    self.coerce(else_ty, result);
                }
                let end = self.current_offset();
                self.patch_jump(jump_over_else, end);
                result
            }
            Expr::Cast { ty, expr } => {
                let from = self.expr(expr)?;
                if from.is_numeric() && ty.is_numeric() {
                    if from != *ty {
                        if let Some(code) = type_code(ty) {
                            self.emit(Instruction::with_arg(Opcode::Convert, code));
                        }
                    }
                } else if !assignable(ty, &from) {
                    self.error(format!(
                        "incompatible types: {} cannot be converted to {}",
                        from, ty
                    ));
                    return None;
                }
                Some(ty.clone())
            }
            Expr::Call { name, args } => self.call(name, args),
            Expr::MethodCall {
                receiver,
                name,
                args,
            } => self.string_method(receiver, name, args),
            Expr::Probe { id, kind, expr } => {
                let ty = self.expr(expr)?;
                match kind {
                    ProbeKind::Branch if ty == Type::Boolean => {
                        self.emit(Instruction::with_arg(Opcode::Probe, id.0));
                    }
                    ProbeKind::Value if ty.is_numeric() => {
                        self.emit(Instruction::with_arg(Opcode::ProbeValue, id.0));
                    }
                    _ => {
                        self.error(format!(
                            "{} cannot probe a value of type {}",
                            kind.intrinsic(),
                            ty
                        ));
                        return None;
                    }
                }
                Some(ty)
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Type> {
        if op.is_logical() {
            // Short circuit keeps the deciding operand on the stack
            self.condition(lhs);
            self.emit(Instruction::new(Opcode::Dup));
            let jump = match op {
                BinaryOp::And => Opcode::JumpIfNot,
                _ => Opcode::JumpIf,
            };
            let skip = self.emit(Instruction::with_arg(jump, 0));
            self.emit(Instruction::new(Opcode::Pop));
            self.condition(rhs);
            let end = self.current_offset();
            self.patch_jump(skip, end);
            return Some(Type::Boolean);
        }

        let l = self.expr(lhs);
        let r = self.expr(rhs);
        let (l, r) = (l?, r?);
        let bad_operands = |l: &Type, r: &Type| {
            format!(
                "bad operand types for binary operator '{}': {} and {}",
                op.symbol(),
                l,
                r
            )
        };

        if op == BinaryOp::Add && (l == Type::String || r == Type::String) {
            if l == Type::Void || r == Type::Void {
                self.error(bad_operands(&l, &r));
                return None;
            }
            self.emit(Instruction::new(Opcode::Concat));
            return Some(Type::String);
        }

        let result = if op.is_arithmetic() {
            Type::promote(&l, &r)
        } else if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let comparable = (l.is_numeric() && r.is_numeric())
                || (l == Type::Boolean && r == Type::Boolean)
                || (l.is_reference() && (l == r || is_null_type(&r) || is_null_type(&l)))
                || (is_null_type(&l) && r.is_reference());
            comparable.then_some(Type::Boolean)
        } else {
            (l.is_numeric() && r.is_numeric()).then_some(Type::Boolean)
        };

        match (result, Opcode::for_binary(op)) {
            (Some(ty), Some(opcode)) => {
                self.emit(Instruction::new(opcode));
                Some(ty)
            }
            _ => {
                self.error(bad_operands(&l, &r));
                None
            }
        }
    }

    /// Index of the method a call resolves to
    fn resolve(&self, name: &str, arg_types: &[Option<Type>]) -> Option<usize> {
        let candidates: Vec<usize> = self
            .class
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name && m.params.len() == arg_types.len())
            .map(|(i, _)| i)
            .collect();
        if arg_types.iter().any(Option::is_none) {
            return match candidates.as_slice() {
                [only] => Some(*only),
                _ => None,
            };
        }
        let exact = candidates.iter().copied().find(|&i| {
            self.class.methods[i]
                .params
                .iter()
                .zip(arg_types)
                .all(|(p, a)| a.as_ref() == Some(&p.ty))
        });
        exact.or_else(|| {
            candidates.iter().copied().find(|&i| {
                self.class.methods[i]
                    .params
                    .iter()
                    .zip(arg_types)
                    .all(|(p, a)| a.as_ref().is_some_and(|a| assignable(&p.ty, a)))
            })
        })
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Option<Type> {
        let arg_types: Vec<Option<Type>> = args.iter().map(|a| self.peek_type(a)).collect();
        let Some(index) = self.resolve(name, &arg_types) else {
            let shown = arg_types
                .iter()
                .map(|t| t.as_ref().map_or("?".to_string(), |t| t.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            self.error(format!("cannot find symbol: method {}({})", name, shown));
            for arg in args {
                self.expr(arg);
            }
            return None;
        };
        let class = self.class;
        let callee = &class.methods[index];
        for (arg, param) in args.iter().zip(&callee.params) {
            let from = self.expr(arg);
            self.coerce(from, &param.ty);
        }
        self.emit(Instruction::with_arg(Opcode::Call, index as u32));
        Some(callee.return_type.clone())
    }

    fn string_method(&mut self, receiver: &Expr, name: &str, args: &[Expr]) -> Option<Type> {
        let receiver_ty = self.expr(receiver)?;
        if receiver_ty != Type::String {
            self.error(format!("cannot invoke {}() on type {}", name, receiver_ty));
            return None;
        }
        match (name, args) {
            ("length", []) => {
                self.emit(Instruction::new(Opcode::StrLength));
                Some(Type::Int)
            }
            ("isEmpty", []) => {
                self.emit(Instruction::new(Opcode::StrIsEmpty));
                Some(Type::Boolean)
            }
            ("equals", [arg]) => {
                let arg_ty = self.expr(arg)?;
                if !assignable(&Type::String, &arg_ty) {
                    self.error(format!(
                        "incompatible types: {} cannot be converted to String",
                        arg_ty
                    ));
                    return None;
                }
                self.emit(Instruction::new(Opcode::StrEquals));
                Some(Type::Boolean)
            }
            _ => {
                self.error(format!(
                    "cannot find symbol: method {}/{} in String",
                    name,
                    args.len()
                ));
                None
            }
        }
    }

    /// Static type of an expression without emitting code or diagnostics
    fn peek_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal(lit) => Some(lit.ty().unwrap_or_else(null_type)),
            Expr::Var(name) => self.lookup(name).map(|local| local.ty),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => self.peek_type(expr),
                UnaryOp::Not => Some(Type::Boolean),
            },
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(Type::Boolean);
                }
                let l = self.peek_type(lhs)?;
                let r = self.peek_type(rhs)?;
                if *op == BinaryOp::Add && (l == Type::String || r == Type::String) {
                    Some(Type::String)
                } else {
                    Type::promote(&l, &r)
                }
            }
            Expr::Conditional {
                then_expr,
                else_expr,
                ..
            } => unify(&self.peek_type(then_expr)?, &self.peek_type(else_expr)?),
            Expr::Cast { ty, .. } => Some(ty.clone()),
            Expr::Call { name, args } => {
                let arg_types: Vec<Option<Type>> =
                    args.iter().map(|a| self.peek_type(a)).collect();
                let index = self.resolve(name, &arg_types)?;
                Some(self.class.methods[index].return_type.clone())
            }
            Expr::MethodCall { name, .. } => match name.as_str() {
                "length" => Some(Type::Int),
                "isEmpty" | "equals" => Some(Type::Boolean),
                _ => None,
            },
            Expr::Probe { expr, .. } => self.peek_type(expr),
        }
    }
}

/// Whether execution can fall through the end of a block
fn block_completes(block: &Block) -> bool {
    block.stmts.iter().all(stmt_completes)
}

fn is_true(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Literal::Bool(true)))
}

fn stmt_completes(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::BoundExceeded => false,
        Stmt::Block(block) => block_completes(block),
        Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => block_completes(then_branch) || block_completes(else_branch),
        Stmt::While { cond, body } => !is_true(cond) || breaks_out(body, None),
        Stmt::DoWhile { body, cond } => !is_true(cond) || breaks_out(body, None),
        Stmt::For { cond, body, .. } => {
            cond.as_ref().is_some_and(|c| !is_true(c)) || breaks_out(body, None)
        }
        Stmt::Labeled { label, body } => {
            stmt_completes(body) || stmt_breaks(body, Some(label.as_str()), false)
        }
        _ => true,
    }
}

/// Whether a loop body contains a `break` leaving that loop (or `label`)
fn breaks_out(body: &Block, label: Option<&str>) -> bool {
    body.stmts.iter().any(|s| stmt_breaks(s, label, false))
}

fn stmt_breaks(stmt: &Stmt, label: Option<&str>, nested_loop: bool) -> bool {
    match stmt {
        Stmt::Break(None) => label.is_none() && !nested_loop,
        Stmt::Break(Some(target)) => label == Some(target.as_str()),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            then_branch.stmts.iter().any(|s| stmt_breaks(s, label, nested_loop))
                || else_branch
                    .as_ref()
                    .is_some_and(|b| b.stmts.iter().any(|s| stmt_breaks(s, label, nested_loop)))
        }
        Stmt::Block(block) => block.stmts.iter().any(|s| stmt_breaks(s, label, nested_loop)),
        Stmt::Labeled { body, .. } => stmt_breaks(body, label, nested_loop),
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
            body.stmts.iter().any(|s| stmt_breaks(s, label, true))
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
