//! Fixpoint driver for loop normalization

use crate::analysis::{declared_labels, ReferencedTypes};
use crate::error::{Result, RewriteError};
use crate::passes::loop_unroll::LoopUnrollPass;
use crate::passes::preprocess::PreprocessPass;
use crate::passes::{RewriteContext, RewritePass};
use crate::stats::RewriteStats;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utgen_core::ast::{Block, GENERATED_LABEL_PREFIX};
use utgen_core::CancellationToken;

/// Normalization limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Guarded copies produced per loop (`k`)
    pub bound: usize,
    /// Maximum fixpoint rounds, independent of `bound`
    pub max_iterations: usize,
    /// Maximum body size in AST nodes after any round
    pub max_nodes: usize,
}

impl RewriteConfig {
    /// Default limits with a specific bound
    pub fn with_bound(bound: usize) -> Self {
        Self {
            bound,
            ..Self::default()
        }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            bound: 3,
            max_iterations: 64,
            max_nodes: 20_000,
        }
    }
}

/// A loop-free body produced by [`RewritePipeline::normalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBody {
    /// Body without loop statements
    pub body: Block,
    /// Rounds until the fixpoint was observed
    pub rounds: usize,
}

/// One fixpoint round with fresh passes
///
/// Preprocessing runs first; unrolling only runs on a round where
/// preprocessing changed nothing.
pub fn normalize_step(body: &Block, ctx: &mut RewriteContext) -> Result<(Block, bool)> {
    let mut preprocess = PreprocessPass::new();
    let mut unroll = LoopUnrollPass::new();
    step(&mut preprocess, &mut unroll, body, ctx)
}

fn step(
    preprocess: &mut PreprocessPass,
    unroll: &mut LoopUnrollPass,
    body: &Block,
    ctx: &mut RewriteContext,
) -> Result<(Block, bool)> {
    let (body, changed) = preprocess.run(body, ctx)?;
    if changed {
        return Ok((body, true));
    }
    if !unroll.is_applicable(&body) {
        return Ok((body, false));
    }
    unroll.run(&body, ctx)
}

/// Normalization pipeline
pub struct RewritePipeline {
    config: RewriteConfig,
    stats: RewriteStats,
    preprocess: PreprocessPass,
    unroll: LoopUnrollPass,
}

impl RewritePipeline {
    /// Create new rewrite pipeline
    pub fn new(config: RewriteConfig) -> Self {
        Self {
            config,
            stats: RewriteStats::new(),
            preprocess: PreprocessPass::new(),
            unroll: LoopUnrollPass::new(),
        }
    }

    /// Configured limits
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite `body` until no pass reports a change
    ///
    /// The result contains no loop statement: every loop is replaced by
    /// `bound` guarded copies ending in a bound-exceeded marker.
    pub fn normalize(
        &mut self,
        body: &Block,
        referenced: &ReferencedTypes,
        cancel: &CancellationToken,
    ) -> Result<NormalizedBody> {
        if self.config.bound == 0 {
            return Err(RewriteError::InvalidBound(0));
        }
        if let Some(label) = declared_labels(body)
            .into_iter()
            .find(|l| l.starts_with(GENERATED_LABEL_PREFIX))
        {
            return Err(RewriteError::ReservedLabel(label));
        }

        let start = Instant::now();
        self.stats = RewriteStats::new();
        self.preprocess = PreprocessPass::new();
        self.unroll = LoopUnrollPass::new();
        self.stats.nodes_before = body.node_count();

        let mut ctx = RewriteContext::new(referenced.clone(), self.config.bound);
        let mut current = body.clone();
        let mut rounds = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RewriteError::Cancelled);
            }
            if rounds == self.config.max_iterations {
                log::warn!("no fixpoint after {} rounds", rounds);
                return Err(RewriteError::IterationCapExceeded {
                    iterations: rounds,
                    limit: self.config.max_iterations,
                });
            }
            rounds += 1;

            let (next, changed) = step(&mut self.preprocess, &mut self.unroll, &current, &mut ctx)?;
            let nodes = next.node_count();
            log::debug!("round {}: {} nodes, changed: {}", rounds, nodes, changed);
            if nodes > self.config.max_nodes {
                return Err(RewriteError::ExpansionLimitExceeded {
                    nodes,
                    limit: self.config.max_nodes,
                });
            }
            current = next;
            if !changed {
                break;
            }
        }
        debug_assert!(!current.contains_loop());

        self.stats.rounds = rounds;
        self.stats.nodes_after = current.node_count();
        self.stats.for_loops_lowered = self.preprocess.for_loops();
        self.stats.do_loops_lowered = self.preprocess.do_loops();
        self.stats.assignments_lowered = self.preprocess.assignments();
        self.stats.loops_unrolled = self.unroll.unrolled_count();
        self.stats.rewrite_time_us = start.elapsed().as_micros() as u64;
        log::debug!("{}", self.preprocess.stats());
        log::debug!("{}", self.unroll.stats());

        Ok(NormalizedBody {
            body: current,
            rounds,
        })
    }

    /// Get rewrite statistics of the last run
    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }
}

impl Default for RewritePipeline {
    fn default() -> Self {
        Self::new(RewriteConfig::default())
    }
}
