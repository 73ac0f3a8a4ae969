//! Recursive-descent parser for the Java subset

use crate::error::ParseError;
use crate::lexer::{describe, Lexer, Token};
use std::ops::Range;
use utgen_core::ast::*;

pub type ParseResult<T> = Result<T, ParseError>;

/// Default limit on statement and expression nesting
pub const DEFAULT_MAX_DEPTH: usize = 256;

pub struct Parser<'a> {
    tokens: Vec<(Token<'a>, Range<usize>)>,
    pos: usize,
    source_len: usize,
    depth: usize,
    max_depth: usize,
    pending: Option<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let (tokens, pending) = match Lexer::new(source).tokenize() {
            Ok(tokens) => (tokens, None),
            Err(err) => (Vec::new(), Some(err)),
        };
        Self {
            tokens,
            pos: 0,
            source_len: source.len(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            pending,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a complete compilation unit
    pub fn parse(mut self) -> ParseResult<CompilationUnit> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        self.skip_annotations()?;
        let package = if self.eat(&Token::Package) {
            let name = self.qualified_name()?;
            self.expect(Token::Semicolon, "';'")?;
            Some(name)
        } else {
            None
        };

        while self.eat(&Token::Import) {
            self.eat(&Token::Static);
            self.qualified_name()?;
            if self.eat(&Token::Dot) {
                self.expect(Token::Star, "'*'")?;
            }
            self.expect(Token::Semicolon, "';'")?;
        }

        self.skip_annotations()?;
        let modifiers = self.modifiers()?;
        self.expect(Token::Class, "'class'")?;
        let name = self.ident("class name")?;
        if matches!(self.peek(), Some(Token::Ident("extends" | "implements"))) {
            return Err(self.unsupported("class inheritance"));
        }
        self.expect(Token::LBrace, "'{'")?;

        let mut methods = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(ParseError::UnclosedDelimiter("{".to_string()));
            }
            methods.push(self.method()?);
        }
        self.expect(Token::RBrace, "'}'")?;

        if let Some((token, span)) = self.tokens.get(self.pos) {
            return Err(ParseError::UnexpectedToken {
                position: span.start,
                expected: "end of input".to_string(),
                found: describe(token),
            });
        }

        Ok(CompilationUnit {
            package,
            class: ClassDecl {
                modifiers,
                name,
                methods,
            },
        })
    }

    // ===== Declarations =====

    fn method(&mut self) -> ParseResult<MethodDecl> {
        self.skip_annotations()?;
        let modifiers = self.modifiers()?;
        if self.check(&Token::Class) {
            return Err(self.unsupported("nested class"));
        }
        let return_type = self.parse_type()?;
        if self.check(&Token::LParen) {
            return Err(self.unsupported("constructor"));
        }
        let name = self.ident("method name")?;
        if !self.check(&Token::LParen) {
            return Err(self.unsupported("field declaration"));
        }
        self.expect(Token::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                self.eat(&Token::Final);
                let ty = self.parse_type()?;
                if ty == Type::Void {
                    return Err(self.syntax("parameter of type void"));
                }
                let name = self.ident("parameter name")?;
                params.push(Param { ty, name });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;
        if matches!(self.peek(), Some(Token::Ident("throws"))) {
            return Err(self.unsupported("throws clause"));
        }

        let body = self.block()?;
        Ok(MethodDecl {
            modifiers,
            return_type,
            name,
            params,
            body,
        })
    }

    fn modifiers(&mut self) -> ParseResult<Vec<Modifier>> {
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.peek() {
                Some(Token::Public) => Modifier::Public,
                Some(Token::Private) => Modifier::Private,
                Some(Token::Protected) => Modifier::Protected,
                Some(Token::Static) => Modifier::Static,
                Some(Token::Final) => Modifier::Final,
                Some(Token::At) => {
                    self.skip_annotations()?;
                    continue;
                }
                _ => return Ok(modifiers),
            };
            self.advance();
            modifiers.push(modifier);
        }
    }

    /// `@Name` or `@Name(...)`, ignored
    fn skip_annotations(&mut self) -> ParseResult<()> {
        while self.eat(&Token::At) {
            self.qualified_name()?;
            if self.eat(&Token::LParen) {
                let mut open = 1usize;
                while open > 0 {
                    match self.advance() {
                        Some(Token::LParen) => open += 1,
                        Some(Token::RParen) => open -= 1,
                        Some(_) => {}
                        None => return Err(ParseError::UnclosedDelimiter("(".to_string())),
                    }
                }
            }
        }
        Ok(())
    }

    fn qualified_name(&mut self) -> ParseResult<String> {
        let mut name = self.ident("name")?;
        while self.check(&Token::Dot) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
            self.advance();
            name.push('.');
            name.push_str(&self.ident("name")?);
        }
        Ok(name)
    }

    fn parse_type(&mut self) -> ParseResult<Type> {
        let ty = match self.advance() {
            Some(Token::Int) => Type::Int,
            Some(Token::Long) => Type::Long,
            Some(Token::Double) => Type::Double,
            Some(Token::Boolean) => Type::Boolean,
            Some(Token::Void) => Type::Void,
            Some(Token::Ident(name)) => {
                let mut name = name.to_string();
                while self.check(&Token::Dot) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
                    self.advance();
                    name.push('.');
                    name.push_str(&self.ident("type name")?);
                }
                if name == "java.lang.String" {
                    Type::String
                } else {
                    Type::from_name(&name)
                }
            }
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected("type"));
            }
            None => return Err(ParseError::UnexpectedEof),
        };
        if self.check(&Token::LBracket) {
            return Err(self.unsupported("array type"));
        }
        if self.check(&Token::Less) {
            return Err(self.unsupported("generic type"));
        }
        Ok(ty)
    }

    // ===== Statements =====

    fn block(&mut self) -> ParseResult<Block> {
        self.expect(Token::LBrace, "'{'")?;
        self.enter()?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(ParseError::UnclosedDelimiter("{".to_string()));
            }
            self.block_statement(&mut stmts)?;
        }
        self.advance();
        self.leave();
        Ok(Block::new(stmts))
    }

    /// One statement inside a block; declarations may produce several locals
    fn block_statement(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        if self.eat(&Token::Semicolon) {
            return Ok(());
        }
        if self.at_local_declaration() {
            self.local_declaration(out)?;
            return self.expect(Token::Semicolon, "';'");
        }
        out.push(self.statement()?);
        Ok(())
    }

    /// Body of `if`/`while`/`for`/`do`, always as a block
    fn body(&mut self) -> ParseResult<Block> {
        if self.check(&Token::LBrace) {
            return self.block();
        }
        if self.at_local_declaration() {
            return Err(self.syntax("declaration is not allowed here"));
        }
        let mut stmts = Vec::new();
        if !self.eat(&Token::Semicolon) {
            stmts.push(self.statement()?);
        }
        Ok(Block::new(stmts))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.leave();
        stmt
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(Token::LBrace) => Ok(Stmt::Block(self.block()?)),
            Some(Token::If) => {
                self.advance();
                let cond = self.paren_expression()?;
                let then_branch = self.body()?;
                let else_branch = if self.eat(&Token::Else) {
                    Some(self.body()?)
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            Some(Token::While) => {
                self.advance();
                let cond = self.paren_expression()?;
                let body = self.body()?;
                Ok(Stmt::While { cond, body })
            }
            Some(Token::Do) => {
                self.advance();
                let body = self.body()?;
                self.expect(Token::While, "'while'")?;
                let cond = self.paren_expression()?;
                self.expect(Token::Semicolon, "';'")?;
                Ok(Stmt::DoWhile { body, cond })
            }
            Some(Token::For) => self.for_statement(),
            Some(Token::Break) => {
                self.advance();
                let label = self.optional_label();
                self.expect(Token::Semicolon, "';'")?;
                Ok(Stmt::Break(label))
            }
            Some(Token::Continue) => {
                self.advance();
                let label = self.optional_label();
                self.expect(Token::Semicolon, "';'")?;
                Ok(Stmt::Continue(label))
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(Token::Semicolon, "';'")?;
                Ok(Stmt::Return(value))
            }
            Some(Token::Ident(label)) if matches!(self.peek_at(1), Some(Token::Colon)) => {
                let label = label.to_string();
                self.advance();
                self.advance();
                let body = if self.check(&Token::LBrace) {
                    Stmt::Block(self.block()?)
                } else {
                    self.statement()?
                };
                Ok(Stmt::Labeled {
                    label,
                    body: Box::new(body),
                })
            }
            Some(_) => {
                let stmt = self.simple_statement()?;
                self.expect(Token::Semicolon, "';'")?;
                Ok(stmt)
            }
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::For, "'for'")?;
        self.expect(Token::LParen, "'('")?;

        let mut init = Vec::new();
        if !self.check(&Token::Semicolon) {
            if self.at_local_declaration() {
                self.local_declaration(&mut init)?;
            } else {
                init = self.simple_statement_list()?;
            }
        }
        self.expect(Token::Semicolon, "';'")?;

        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Token::Semicolon, "';'")?;

        let update = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.simple_statement_list()?
        };
        self.expect(Token::RParen, "')'")?;

        let body = self.body()?;
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn simple_statement_list(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![self.simple_statement()?];
        while self.eat(&Token::Comma) {
            stmts.push(self.simple_statement()?);
        }
        Ok(stmts)
    }

    /// Assignment, increment or call; no trailing semicolon
    fn simple_statement(&mut self) -> ParseResult<Stmt> {
        let first = self.peek().cloned();
        let second = self.peek_at(1).cloned();
        match (first, second) {
            (Some(Token::PlusPlus), _) | (Some(Token::MinusMinus), _) => {
                let step = match self.advance() {
                    Some(Token::PlusPlus) => Step::Increment,
                    _ => Step::Decrement,
                };
                let target = self.ident("variable name")?;
                Ok(Stmt::Step { target, step })
            }
            (Some(Token::Ident(name)), Some(next)) => {
                let op = match next {
                    Token::Assign => AssignOp::Set,
                    Token::PlusAssign => AssignOp::Add,
                    Token::MinusAssign => AssignOp::Sub,
                    Token::StarAssign => AssignOp::Mul,
                    Token::SlashAssign => AssignOp::Div,
                    Token::PercentAssign => AssignOp::Rem,
                    Token::PlusPlus | Token::MinusMinus => {
                        let step = if next == Token::PlusPlus {
                            Step::Increment
                        } else {
                            Step::Decrement
                        };
                        self.pos += 2;
                        return Ok(Stmt::Step {
                            target: name.to_string(),
                            step,
                        });
                    }
                    _ => return self.expression_statement(),
                };
                self.pos += 2;
                let value = self.expression()?;
                Ok(Stmt::Assign {
                    target: name.to_string(),
                    op,
                    value,
                })
            }
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let position = self.position();
        let expr = self.expression()?;
        match expr {
            Expr::Call { ref name, ref args } if name == BOUND_EXCEEDED_INTRINSIC => {
                if !args.is_empty() {
                    return Err(self.syntax("__bound_exceeded takes no arguments"));
                }
                Ok(Stmt::BoundExceeded)
            }
            Expr::Call { .. } | Expr::MethodCall { .. } => Ok(Stmt::Expr(expr)),
            _ => Err(ParseError::InvalidSyntax(format!(
                "expression at position {} is not a statement",
                position
            ))),
        }
    }

    fn at_local_declaration(&self) -> bool {
        match self.peek() {
            Some(Token::Int | Token::Long | Token::Double | Token::Boolean | Token::Final) => true,
            Some(Token::Ident(_)) => matches!(self.peek_at(1), Some(Token::Ident(_))),
            _ => false,
        }
    }

    /// `Type a [= e], b [= e]`, pushing one `Local` per declarator
    fn local_declaration(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        self.eat(&Token::Final);
        let ty = self.parse_type()?;
        if ty == Type::Void {
            return Err(self.syntax("variable of type void"));
        }
        loop {
            let name = self.ident("variable name")?;
            let init = if self.eat(&Token::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            out.push(Stmt::Local {
                ty: ty.clone(),
                name,
                init,
            });
            if !self.eat(&Token::Comma) {
                return Ok(());
            }
        }
    }

    fn optional_label(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Ident(label)) => {
                let label = label.to_string();
                self.advance();
                Some(label)
            }
            _ => None,
        }
    }

    // ===== Expressions =====

    fn paren_expression(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LParen, "'('")?;
        let expr = self.expression()?;
        self.expect(Token::RParen, "')'")?;
        Ok(expr)
    }

    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let expr = self.conditional();
        self.leave();
        expr
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let cond = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then_expr = self.expression()?;
        self.expect(Token::Colon, "':'")?;
        let else_expr = self.expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.logical_and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.relational()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::LessEq) => BinaryOp::Le,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::GreaterEq) => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let expr = self.unary_inner();
        self.leave();
        expr
    }

    fn unary_inner(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                // Literals one past the positive range only exist negated
                match self.peek() {
                    Some(Token::Integer(n)) if *n == 1 << 31 => {
                        self.advance();
                        return Ok(Expr::Literal(Literal::Int(i32::MIN)));
                    }
                    Some(Token::LongInteger(n)) if *n == 1 << 63 => {
                        self.advance();
                        return Ok(Expr::Literal(Literal::Long(i64::MIN)));
                    }
                    _ => {}
                }
                let expr = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            Some(Token::Bang) => {
                self.advance();
                let expr = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                })
            }
            Some(Token::PlusPlus | Token::MinusMinus) => {
                Err(self.unsupported("increment inside an expression"))
            }
            Some(Token::LParen) if self.at_cast() => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(Token::RParen, "')'")?;
                let expr = self.unary()?;
                Ok(Expr::cast(ty, expr))
            }
            _ => self.postfix(),
        }
    }

    fn at_cast(&self) -> bool {
        matches!(
            self.peek_at(1),
            Some(Token::Int | Token::Long | Token::Double | Token::Boolean)
        ) && matches!(self.peek_at(2), Some(Token::RParen))
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.eat(&Token::Dot) {
            let name = self.ident("method name")?;
            if !self.check(&Token::LParen) {
                return Err(self.unsupported("field access"));
            }
            let args = self.arguments()?;
            expr = Expr::MethodCall {
                receiver: Box::new(expr),
                name,
                args,
            };
        }
        match self.peek() {
            Some(Token::PlusPlus | Token::MinusMinus) => {
                Err(self.unsupported("increment inside an expression"))
            }
            Some(Token::LBracket) => Err(self.unsupported("array access")),
            _ => Ok(expr),
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        match self.advance() {
            Some(Token::Integer(n)) => {
                let value = i32::try_from(n)
                    .map_err(|_| ParseError::InvalidNumber(n.to_string()))?;
                Ok(Expr::Literal(Literal::Int(value)))
            }
            Some(Token::LongInteger(n)) => {
                let value = i64::try_from(n)
                    .map_err(|_| ParseError::InvalidNumber(format!("{}L", n)))?;
                Ok(Expr::Literal(Literal::Long(value)))
            }
            Some(Token::Float(f)) => Ok(Expr::Literal(Literal::Double(f))),
            Some(Token::String(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::True) => Ok(Expr::bool(true)),
            Some(Token::False) => Ok(Expr::bool(false)),
            Some(Token::Null) => Ok(Expr::Literal(Literal::Null)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(match self.peek() {
                        Some(_) => self.unexpected("')'"),
                        None => ParseError::UnclosedDelimiter("(".to_string()),
                    });
                }
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if !self.check(&Token::LParen) {
                    return Ok(Expr::var(name));
                }
                let args = self.arguments()?;
                intrinsic_or_call(name, args, position)
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(Token::Comma, "',' or ')'")?;
        }
    }

    // ===== Token helpers =====

    fn peek(&self) -> Option<&Token<'a>> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len, |(_, span)| span.start)
    }

    fn expect(&mut self, token: Token, expected: &str) -> ParseResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn ident(&mut self, expected: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some((token, span)) => ParseError::UnexpectedToken {
                position: span.start,
                expected: expected.to_string(),
                found: describe(token),
            },
            None => ParseError::UnexpectedEof,
        }
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        ParseError::Unsupported {
            position: self.position(),
            construct: construct.to_string(),
        }
    }

    fn syntax(&self, message: &str) -> ParseError {
        ParseError::InvalidSyntax(format!("{} at position {}", message, self.position()))
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::MaxDepthExceeded {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Recognize the probe intrinsics, otherwise build a same-class call
fn intrinsic_or_call(name: &str, mut args: Vec<Expr>, position: usize) -> ParseResult<Expr> {
    let kind = match name {
        PROBE_INTRINSIC => ProbeKind::Branch,
        PROBE_VALUE_INTRINSIC => ProbeKind::Value,
        _ => {
            return Ok(Expr::Call {
                name: name.to_string(),
                args,
            })
        }
    };
    if args.len() != 2 {
        return Err(ParseError::InvalidSyntax(format!(
            "{} expects 2 arguments at position {}",
            name, position
        )));
    }
    let expr = args.pop().map(Box::new);
    let id = match args.pop() {
        Some(Expr::Literal(Literal::Int(id))) if id >= 0 => id as u32,
        _ => {
            return Err(ParseError::InvalidSyntax(format!(
                "{} expects a probe id literal at position {}",
                name, position
            )))
        }
    };
    match expr {
        Some(expr) => Ok(Expr::Probe {
            id: ProbeId(id),
            kind,
            expr,
        }),
        None => Err(ParseError::UnexpectedEof),
    }
}
