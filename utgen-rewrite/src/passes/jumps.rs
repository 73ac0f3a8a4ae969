//! Retargeting of `break` and `continue` in copied loop bodies

use utgen_core::ast::{Block, Stmt};

/// Rewrites the jumps that leave one loop body
///
/// Unlabeled jumps are rewritten only outside nested loops; jumps naming
/// `loop_label` are rewritten at any depth. A `None` target leaves that
/// kind of jump untouched.
pub struct JumpRetarget<'a> {
    loop_label: Option<&'a str>,
    break_to: Option<&'a str>,
    continue_to: Option<&'a str>,
    /// Number of `break`s rewritten so far
    pub breaks: usize,
    /// Number of `continue`s rewritten so far
    pub continues: usize,
}

impl<'a> JumpRetarget<'a> {
    /// Create a retargeter for a loop with an optional label
    pub fn new(
        loop_label: Option<&'a str>,
        break_to: Option<&'a str>,
        continue_to: Option<&'a str>,
    ) -> Self {
        Self {
            loop_label,
            break_to,
            continue_to,
            breaks: 0,
            continues: 0,
        }
    }

    /// Rewrite a loop body
    pub fn body(&mut self, block: &Block) -> Block {
        self.block(block, false)
    }

    fn block(&mut self, block: &Block, nested: bool) -> Block {
        Block::new(block.stmts.iter().map(|s| self.stmt(s, nested)).collect())
    }

    fn targets_loop(&self, label: &Option<String>, nested: bool) -> bool {
        match label {
            None => !nested,
            Some(label) => self.loop_label == Some(label.as_str()),
        }
    }

    fn stmt(&mut self, stmt: &Stmt, nested: bool) -> Stmt {
        match stmt {
            Stmt::Break(label) if self.targets_loop(label, nested) => match self.break_to {
                Some(target) => {
                    self.breaks += 1;
                    Stmt::Break(Some(target.to_string()))
                }
                None => stmt.clone(),
            },
            Stmt::Continue(label) if self.targets_loop(label, nested) => match self.continue_to {
                Some(target) => {
                    self.continues += 1;
                    Stmt::Break(Some(target.to_string()))
                }
                None => stmt.clone(),
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::If {
                cond: cond.clone(),
                then_branch: self.block(then_branch, nested),
                else_branch: else_branch.as_ref().map(|b| self.block(b, nested)),
            },
            Stmt::While { cond, body } => Stmt::While {
                cond: cond.clone(),
                body: self.block(body, true),
            },
            Stmt::DoWhile { body, cond } => Stmt::DoWhile {
                body: self.block(body, true),
                cond: cond.clone(),
            },
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => Stmt::For {
                init: init.clone(),
                cond: cond.clone(),
                update: update.clone(),
                body: self.block(body, true),
            },
            Stmt::Block(block) => Stmt::Block(self.block(block, nested)),
            Stmt::Labeled { label, body } => Stmt::Labeled {
                label: label.clone(),
                body: Box::new(self.stmt(body, nested)),
            },
            other => other.clone(),
        }
    }
}

/// Wrap statements in a block, labeled when jumps target it
pub fn wrap_block(stmts: Vec<Stmt>, label: Option<String>) -> Stmt {
    let block = Stmt::Block(Block::new(stmts));
    match label {
        Some(label) => Stmt::Labeled {
            label,
            body: Box::new(block),
        },
        None => block,
    }
}

/// Attach an optional label to a statement
pub fn with_label(stmt: Stmt, label: Option<&str>) -> Stmt {
    match label {
        Some(label) => Stmt::Labeled {
            label: label.to_string(),
            body: Box::new(stmt),
        },
        None => stmt,
    }
}
