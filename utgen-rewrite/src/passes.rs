//! Individual rewrite passes

pub mod jumps;
pub mod loop_unroll;
pub mod preprocess;

use crate::analysis::ReferencedTypes;
use crate::error::Result;
use utgen_core::ast::{Block, GENERATED_LABEL_PREFIX};

/// State shared by the passes of one normalization run
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Declared types of the method being rewritten
    pub referenced: ReferencedTypes,
    /// Number of guarded copies produced per loop
    pub bound: usize,
    next_label: usize,
}

impl RewriteContext {
    /// Create a context for one method
    pub fn new(referenced: ReferencedTypes, bound: usize) -> Self {
        Self {
            referenced,
            bound,
            next_label: 0,
        }
    }

    /// Allocate a fresh label number; labels are unique within a run
    pub fn fresh(&mut self) -> usize {
        let n = self.next_label;
        self.next_label += 1;
        n
    }

    /// Label in the generated namespace, e.g. `__exit3`
    pub fn label(kind: &str, n: usize) -> String {
        format!("{}{}{}", GENERATED_LABEL_PREFIX, kind, n)
    }
}

/// Trait for rewrite passes
///
/// A pass reads a body and returns a new one plus whether anything changed;
/// the input is never modified.
pub trait RewritePass: Send {
    /// Name of the rewrite pass
    fn name(&self) -> &str;

    /// Run the pass over a body
    fn run(&mut self, body: &Block, ctx: &mut RewriteContext) -> Result<(Block, bool)>;

    /// Check if the pass is applicable
    fn is_applicable(&self, body: &Block) -> bool {
        !body.stmts.is_empty()
    }

    /// Get statistics about the pass
    fn stats(&self) -> String {
        format!("{} pass completed", self.name())
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod passes_tests;
