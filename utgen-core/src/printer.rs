//! Pretty printer producing source text the parser accepts again
//!
//! Compound expressions are always parenthesized so the printed text never
//! depends on operator precedence.

use crate::ast::*;
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Print a whole compilation unit
pub fn print_unit(unit: &CompilationUnit) -> String {
    let mut printer = Printer::default();
    printer.unit(unit);
    printer.out
}

/// Print one method declaration at top-level indentation
pub fn print_method(method: &MethodDecl) -> String {
    let mut printer = Printer::default();
    printer.method(method);
    printer.out
}

/// Print a block, including its braces
pub fn print_block(block: &Block) -> String {
    let mut printer = Printer::default();
    printer.block(block);
    printer.out.push('\n');
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn line(&mut self, text: &str) {
        self.indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        if let Some(package) = &unit.package {
            self.line(&format!("package {};", package));
            self.out.push('\n');
        }
        let class = &unit.class;
        let mut header = String::new();
        for modifier in &class.modifiers {
            header.push_str(modifier.keyword());
            header.push(' ');
        }
        header.push_str("class ");
        header.push_str(&class.name);
        header.push_str(" {");
        self.line(&header);
        self.depth += 1;
        for (i, method) in class.methods.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.method(method);
        }
        self.depth -= 1;
        self.line("}");
    }

    fn method(&mut self, method: &MethodDecl) {
        self.indent();
        for modifier in &method.modifiers {
            self.out.push_str(modifier.keyword());
            self.out.push(' ');
        }
        let params = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(self.out, "{} {}({}) ", method.return_type, method.name, params);
        self.block(&method.body);
        self.out.push('\n');
    }

    /// Writes `{ ... }` starting at the current cursor, without a trailing newline
    fn block(&mut self, block: &Block) {
        self.out.push_str("{\n");
        self.depth += 1;
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.depth -= 1;
        self.indent();
        self.out.push('}');
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.indent();
        self.stmt_body(stmt);
        self.out.push('\n');
    }

    /// Statement text after indentation, without the final newline
    fn stmt_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let _ = write!(self.out, "if ({}) ", cond);
                self.block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.out.push_str(" else ");
                    self.block(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                let _ = write!(self.out, "while ({}) ", cond);
                self.block(body);
            }
            Stmt::DoWhile { body, cond } => {
                self.out.push_str("do ");
                self.block(body);
                let _ = write!(self.out, " while ({});", cond);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let init = init.iter().map(inline_stmt).collect::<Vec<_>>().join(", ");
                let cond = cond.as_ref().map(|c| c.to_string()).unwrap_or_default();
                let update = update.iter().map(inline_stmt).collect::<Vec<_>>().join(", ");
                let _ = write!(self.out, "for ({}; {}; {}) ", init, cond, update);
                self.block(body);
            }
            Stmt::Block(block) => self.block(block),
            Stmt::Labeled { label, body } => {
                let _ = write!(self.out, "{}: ", label);
                self.stmt_body(body);
            }
            simple => {
                self.out.push_str(&inline_stmt(simple));
                self.out.push(';');
            }
        }
    }
}

/// Single-line statement text without the terminating semicolon
fn inline_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Local { ty, name, init } => match init {
            Some(init) => format!("{} {} = {}", ty, name, init),
            None => format!("{} {}", ty, name),
        },
        Stmt::Assign { target, op, value } => format!("{} {} {}", target, op.symbol(), value),
        Stmt::Step { target, step } => match step {
            Step::Increment => format!("{}++", target),
            Step::Decrement => format!("{}--", target),
        },
        Stmt::Expr(expr) => expr.to_string(),
        Stmt::Break(None) => "break".to_string(),
        Stmt::Break(Some(label)) => format!("break {}", label),
        Stmt::Continue(None) => "continue".to_string(),
        Stmt::Continue(Some(label)) => format!("continue {}", label),
        Stmt::Return(None) => "return".to_string(),
        Stmt::Return(Some(value)) => format!("return {}", value),
        Stmt::BoundExceeded => format!("{}()", BOUND_EXCEEDED_INTRINSIC),
        compound => {
            // Compound statements never appear in for-headers
            let mut printer = Printer::default();
            printer.stmt_body(compound);
            printer.out
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Long(v) => write!(f, "{}L", v),
            Literal::Double(v) => f.write_str(&double_literal(*v)),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Source spelling of a double that lexes back to the same value
pub fn double_literal(value: f64) -> String {
    if value.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "(1.0 / 0.0)".to_string()
        } else {
            "(-1.0 / 0.0)".to_string()
        };
    }
    let magnitude = format!("{:?}", value.abs());
    let magnitude = match magnitude.find('e') {
        Some(pos) if !magnitude[..pos].contains('.') => {
            format!("{}.0{}", &magnitude[..pos], &magnitude[pos..])
        }
        _ => magnitude,
    };
    if value.is_sign_negative() {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

/// Escape a string for a double-quoted literal
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Var(name) => f.write_str(name),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => write!(f, "(-{})", expr),
                UnaryOp::Not => write!(f, "(!{})", expr),
            },
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({} ? {} : {})", cond, then_expr, else_expr),
            Expr::Cast { ty, expr } => write!(f, "(({}) {})", ty, expr),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::MethodCall {
                receiver,
                name,
                args,
            } => {
                write!(f, "{}.{}(", receiver, name)?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::Probe { id, kind, expr } => {
                write!(f, "{}({}, {})", kind.intrinsic(), id.0, expr)
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_unit(self))
    }
}

impl fmt::Display for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_method(self))
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
