//! Concolic path exploration
//!
//! Runs the instrumented method on default inputs, then repeatedly takes a
//! branch of a discovered path, keeps the conditions before it, negates it
//! and asks the solver for inputs reaching the flipped side. Every newly
//! discovered path that returns normally contributes one [`InputTuple`].

use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestFailure, Result, SolverError};
use crate::sample;
use crate::solver::{Constraint, Solution, Solver};
use crate::tuple::{InputTuple, PathSignature};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, trace};
use utgen_core::{CancellationToken, Type, Value};
use utgen_vm::{LoadableUnit, MethodHandle, Outcome, Vm};

/// Counters of one harvest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestStats {
    pub executions: u64,
    pub evaluations: u64,
    /// Distinct paths, including ones that hit the unrolling bound
    pub paths: usize,
    pub bound_exceeded_paths: usize,
    /// Targets the solver gave up on
    pub abandoned_targets: usize,
    pub duplicates: usize,
}

/// Tuples found for one method, in discovery order
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    pub tuples: Vec<InputTuple>,
    pub stats: HarvestStats,
}

/// Prefix of a known path with one branch flipped
struct Target {
    constraints: Vec<Constraint>,
    start: Vec<Value>,
    key: PathSignature,
}

/// Harvest input tuples for `method(params)` of a loaded unit
pub fn generate_inputs(
    unit: &LoadableUnit,
    method: &str,
    params: &[Type],
    config: &HarvestConfig,
    cancel: &CancellationToken,
) -> Result<Harvest> {
    let handle = unit.resolve_method(method, params).map_err(HarvestError::from)?;
    harvest(&handle, config, cancel)
}

/// Harvest input tuples for a resolved method
pub fn harvest(handle: &MethodHandle, config: &HarvestConfig, cancel: &CancellationToken) -> Result<Harvest> {
    let params = handle.params().to_vec();
    let mut start = Vec::with_capacity(params.len());
    for ty in &params {
        match sample::initial(ty) {
            Some(value) => start.push(value),
            None => return Err(HarvestError::unsupported(handle.signature(), ty).into()),
        }
    }

    info!("harvesting inputs for {}", handle.signature());
    let mut explorer = Explorer {
        vm: handle.vm(config.vm()),
        chunk: handle.chunk(),
        params,
        config,
        cancel,
        solver: Solver::new(config),
        started: Instant::now(),
        queue: VecDeque::new(),
        paths: FxHashSet::default(),
        covered: FxHashSet::default(),
        queued: FxHashSet::default(),
        tuples: Vec::new(),
        stats: HarvestStats::default(),
    };
    explorer.explore(start)?;
    info!(
        "{}: {} inputs from {} paths ({} executions, {} evaluations)",
        handle.signature(),
        explorer.tuples.len(),
        explorer.stats.paths,
        explorer.stats.executions,
        explorer.solver.evaluations()
    );
    explorer.stats.evaluations = explorer.solver.evaluations();
    Ok(Harvest {
        tuples: explorer.tuples,
        stats: explorer.stats,
    })
}

struct Explorer<'h> {
    vm: Vm<'h>,
    chunk: usize,
    params: Vec<Type>,
    config: &'h HarvestConfig,
    cancel: &'h CancellationToken,
    solver: Solver,
    started: Instant,
    queue: VecDeque<Target>,
    /// Full signatures of executed paths
    paths: FxHashSet<PathSignature>,
    /// Every non-empty prefix of an executed path
    covered: FxHashSet<PathSignature>,
    queued: FxHashSet<PathSignature>,
    tuples: Vec<InputTuple>,
    stats: HarvestStats,
}

impl Explorer<'_> {
    fn fail(&mut self, error: HarvestError) -> HarvestFailure {
        self.stats.evaluations = self.solver.evaluations();
        HarvestFailure::new(error, std::mem::take(&mut self.tuples))
    }

    fn check_interrupts(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(self.fail(HarvestError::Cancelled));
        }
        if let Some(limit) = self.config.timeout() {
            if self.started.elapsed() >= limit {
                let limit_ms = limit.as_millis() as u64;
                return Err(self.fail(HarvestError::Timeout { limit_ms }));
            }
        }
        Ok(())
    }

    fn explore(&mut self, start: Vec<Value>) -> Result<()> {
        self.check_interrupts()?;
        self.execute(start)?;

        while let Some(target) = self.queue.pop_front() {
            self.check_interrupts()?;
            if self.paths.len() >= self.config.max_paths {
                debug!("path limit {} reached", self.config.max_paths);
                break;
            }
            if self.covered.contains(&target.key) {
                continue;
            }
            trace!("solving target of depth {}", target.constraints.len());
            match self.solver.solve(&target.constraints, &self.params, &target.start) {
                Ok(Solution::Solved(inputs)) => self.execute(inputs)?,
                Ok(Solution::GaveUp) => {
                    debug!("gave up on target of depth {}", target.constraints.len());
                    self.stats.abandoned_targets += 1;
                }
                Ok(Solution::BudgetExhausted) => {
                    let error = SolverError::BudgetExhausted {
                        budget: self.solver.budget(),
                        pending: self.queue.len() + 1,
                    };
                    return Err(self.fail(error.into()));
                }
                Err(err) => return Err(self.fail(err.into())),
            }
        }
        Ok(())
    }

    fn execute(&mut self, inputs: Vec<Value>) -> Result<()> {
        let execution = match self.vm.invoke(self.chunk, &inputs) {
            Ok(execution) => execution,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.stats.executions += 1;

        let signature: PathSignature = execution
            .branches()
            .map(|(event, taken)| (event.id, taken))
            .collect();
        if !self.paths.insert(signature.clone()) {
            return Ok(());
        }
        self.stats.paths += 1;
        for len in 1..=signature.len() {
            self.covered.insert(signature[..len].to_vec());
        }

        let mut prefix: Vec<Constraint> = Vec::new();
        for (i, (event, taken)) in execution.branches().enumerate() {
            let Some(cond) = &event.sym else {
                continue;
            };
            let mut key = signature[..i].to_vec();
            key.push((event.id, !taken));
            if !self.covered.contains(&key) && self.queued.insert(key.clone()) {
                let mut constraints = prefix.clone();
                constraints.push(Constraint::new(cond.clone(), !taken));
                self.queue.push_back(Target {
                    constraints,
                    start: inputs.clone(),
                    key,
                });
            }
            prefix.push(Constraint::new(cond.clone(), taken));
        }

        match execution.outcome {
            Outcome::Returned(returned) => {
                if self.config.deduplicate && self.tuples.iter().any(|t| t.values == inputs) {
                    self.stats.duplicates += 1;
                    return Ok(());
                }
                trace!("new path {:?}", signature);
                self.tuples.push(InputTuple {
                    values: inputs,
                    returned,
                    path: signature,
                });
            }
            Outcome::BoundExceeded => {
                debug!("path exceeded the unrolling bound; not harvested");
                self.stats.bound_exceeded_paths += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "explorer_tests.rs"]
mod tests;
