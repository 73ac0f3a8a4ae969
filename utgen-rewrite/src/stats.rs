//! Rewrite statistics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters collected over one normalization and instrumentation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStats {
    /// Fixpoint rounds executed, including the final unchanged round
    pub rounds: usize,
    /// Body size before normalization
    pub nodes_before: usize,
    /// Body size after normalization
    pub nodes_after: usize,
    /// `for` loops lowered to `while`
    pub for_loops_lowered: usize,
    /// `do`-`while` loops lowered to `while`
    pub do_loops_lowered: usize,
    /// Compound assignments and increments lowered
    pub assignments_lowered: usize,
    /// `while` loops unrolled
    pub loops_unrolled: usize,
    /// Probes inserted by instrumentation
    pub probes: usize,
    /// Time spent rewriting in microseconds
    pub rewrite_time_us: u64,
}

impl RewriteStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another run into this one
    pub fn merge(&mut self, other: &RewriteStats) {
        self.rounds += other.rounds;
        self.nodes_before += other.nodes_before;
        self.nodes_after += other.nodes_after;
        self.for_loops_lowered += other.for_loops_lowered;
        self.do_loops_lowered += other.do_loops_lowered;
        self.assignments_lowered += other.assignments_lowered;
        self.loops_unrolled += other.loops_unrolled;
        self.probes += other.probes;
        self.rewrite_time_us += other.rewrite_time_us;
    }
}

impl fmt::Display for RewriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rounds, {} -> {} nodes, {} loops unrolled, {} probes",
            self.rounds, self.nodes_before, self.nodes_after, self.loops_unrolled, self.probes
        )
    }
}
