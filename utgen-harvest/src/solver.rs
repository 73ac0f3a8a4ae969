//! Alternating variable method over path constraints
//!
//! A target is a conjunction of branch conditions, each wanted true or
//! false. Fitness orders points by how many constraints they still violate,
//! then by the summed raw branch distance of those; the search
//! seeds variables from constants in the conditions, then walks one
//! variable at a time with exploratory `±1` moves followed by doubling
//! pattern moves, and restarts from random values when it stalls.

use crate::config::HarvestConfig;
use crate::distance::distance;
use crate::error::SolverError;
use crate::sample;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;
use utgen_core::{Type, Value};
use utgen_vm::SymExpr;

/// A branch condition and the outcome the target path needs
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub cond: Arc<SymExpr>,
    pub want: bool,
}

impl Constraint {
    pub fn new(cond: Arc<SymExpr>, want: bool) -> Self {
        Self { cond, want }
    }

    /// The same condition with the opposite outcome
    pub fn negated(&self) -> Self {
        Self::new(Arc::clone(&self.cond), !self.want)
    }
}

/// Result of one solve
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    /// Inputs satisfying every constraint
    Solved(Vec<Value>),
    /// The target's own budget ran out; the target is likely infeasible
    GaveUp,
    /// The global evaluation budget ran out
    BudgetExhausted,
}

enum Stop {
    Budget,
    Failed(SolverError),
}

impl From<SolverError> for Stop {
    fn from(err: SolverError) -> Self {
        Stop::Failed(err)
    }
}

/// Violated constraints, then their summed raw distance; compared in that order
///
/// Raw distances are not squashed into `[0, 1)`, so single steps stay
/// visible on conditions that are far from flipping.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Fitness {
    unsatisfied: usize,
    distance: f64,
}

impl Fitness {
    fn of(distances: impl IntoIterator<Item = f64>) -> Self {
        let mut fitness = Fitness {
            unsatisfied: 0,
            distance: 0.0,
        };
        for d in distances {
            if d == 0.0 {
                continue;
            }
            fitness.unsatisfied += 1;
            fitness.distance += if d.is_nan() { f64::INFINITY } else { d };
        }
        fitness
    }
}

/// Current point of a search
struct Search<'c> {
    constraints: &'c [Constraint],
    point: Vec<Value>,
    fitness: Fitness,
}

impl Search<'_> {
    fn solved(&self) -> bool {
        self.fitness.unsatisfied == 0
    }
}

/// Stateful solver shared by all targets of one method
pub struct Solver {
    rng: StdRng,
    max_evaluations: u64,
    per_target: u64,
    evaluations: u64,
    target_evaluations: u64,
}

impl Solver {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            max_evaluations: config.max_evaluations,
            per_target: config.per_target_evaluations,
            evaluations: 0,
            target_evaluations: 0,
        }
    }

    /// Fitness evaluations spent so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn budget(&self) -> u64 {
        self.max_evaluations
    }

    pub fn is_exhausted(&self) -> bool {
        self.evaluations >= self.max_evaluations
    }

    /// Find inputs satisfying `constraints`, starting from `start`
    ///
    /// Only the inputs the constraints read are varied; the others keep
    /// their values from `start`.
    pub fn solve(
        &mut self,
        constraints: &[Constraint],
        types: &[Type],
        start: &[Value],
    ) -> Result<Solution, SolverError> {
        self.target_evaluations = 0;
        match self.search(constraints, types, start) {
            Ok(point) => Ok(Solution::Solved(point)),
            Err(Stop::Budget) if self.is_exhausted() => Ok(Solution::BudgetExhausted),
            Err(Stop::Budget) => Ok(Solution::GaveUp),
            Err(Stop::Failed(err)) => Err(err),
        }
    }

    fn search(
        &mut self,
        constraints: &[Constraint],
        types: &[Type],
        start: &[Value],
    ) -> Result<Vec<Value>, Stop> {
        let vars: Vec<usize> = constraints
            .iter()
            .flat_map(|c| c.cond.inputs())
            .filter(|&i| i < types.len() && sample::supports(&types[i]))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let fitness = self.fitness(constraints, start)?;
        let mut search = Search {
            constraints,
            point: start.to_vec(),
            fitness,
        };
        if search.solved() {
            return Ok(search.point);
        }
        if vars.is_empty() {
            return Err(Stop::Budget);
        }

        self.seed_constants(&mut search, &vars, types)?;
        loop {
            if search.solved() {
                return Ok(search.point);
            }
            let mut improved = false;
            for &v in &vars {
                improved |= self.walk(&mut search, v, &types[v])?;
                if search.solved() {
                    return Ok(search.point);
                }
            }
            if !improved {
                trace!(
                    "restarting search with {} unsatisfied at distance {}",
                    search.fitness.unsatisfied,
                    search.fitness.distance
                );
                self.restart(&mut search, &vars, types)?;
            }
        }
    }

    fn fitness(&mut self, constraints: &[Constraint], inputs: &[Value]) -> Result<Fitness, Stop> {
        if self.is_exhausted() || self.target_evaluations >= self.per_target {
            return Err(Stop::Budget);
        }
        self.evaluations += 1;
        self.target_evaluations += 1;
        let distances = constraints
            .iter()
            .map(|c| distance(&c.cond, c.want, inputs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fitness::of(distances))
    }

    /// Move variable `v` to `candidate` if that improves fitness
    fn try_move(&mut self, search: &mut Search<'_>, v: usize, candidate: Value) -> Result<bool, Stop> {
        if search.point[v] == candidate {
            return Ok(false);
        }
        let previous = std::mem::replace(&mut search.point[v], candidate);
        let fitness = self.fitness(search.constraints, &search.point)?;
        if fitness < search.fitness {
            search.fitness = fitness;
            Ok(true)
        } else {
            search.point[v] = previous;
            Ok(false)
        }
    }

    fn seed_constants(&mut self, search: &mut Search<'_>, vars: &[usize], types: &[Type]) -> Result<(), Stop> {
        let mut constants: Vec<Value> = Vec::new();
        for constraint in search.constraints {
            for constant in constraint.cond.constants() {
                if !constants.contains(&constant) {
                    constants.push(constant);
                }
            }
        }
        for &v in vars {
            for constant in &constants {
                for candidate in sample::around_constant(&types[v], constant) {
                    self.try_move(search, v, candidate)?;
                    if search.solved() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// One alternating-variable pass over `v`; whether it improved
    fn walk(&mut self, search: &mut Search<'_>, v: usize, ty: &Type) -> Result<bool, Stop> {
        match ty {
            Type::Boolean => {
                let flipped = match search.point[v] {
                    Value::Bool(b) => Value::Bool(!b),
                    _ => Value::Bool(false),
                };
                self.try_move(search, v, flipped)
            }
            Type::String => self.walk_string(search, v),
            _ => self.walk_numeric(search, v, ty),
        }
    }

    fn walk_numeric(&mut self, search: &mut Search<'_>, v: usize, ty: &Type) -> Result<bool, Stop> {
        let units: &[f64] = if *ty == Type::Double {
            &[1.0, 0.1, 0.01, 0.001]
        } else {
            &[1.0]
        };
        let mut improved = false;
        for &unit in units {
            loop {
                let mut moved = false;
                for direction in [-1.0, 1.0] {
                    let mut step = unit * direction;
                    let Some(candidate) = sample::shift(&search.point[v], step) else {
                        return Ok(improved);
                    };
                    if !self.try_move(search, v, candidate)? {
                        continue;
                    }
                    moved = true;
                    // Pattern moves: keep going the same way, doubling the step
                    while !search.solved() {
                        step *= 2.0;
                        let Some(candidate) = sample::shift(&search.point[v], step) else {
                            break;
                        };
                        if !self.try_move(search, v, candidate)? {
                            break;
                        }
                    }
                    break;
                }
                if !moved {
                    break;
                }
                improved = true;
                if search.solved() {
                    return Ok(true);
                }
            }
        }
        Ok(improved)
    }

    fn walk_string(&mut self, search: &mut Search<'_>, v: usize) -> Result<bool, Stop> {
        let mut improved = false;
        loop {
            let current = match &search.point[v] {
                Value::Str(s) => s.clone(),
                _ => String::new(),
            };
            let mut moved = false;
            for candidate in sample::string_neighbours(&current) {
                if self.try_move(search, v, candidate)? {
                    moved = true;
                    break;
                }
            }
            if !moved {
                return Ok(improved);
            }
            improved = true;
            if search.solved() {
                return Ok(true);
            }
        }
    }

    fn restart(&mut self, search: &mut Search<'_>, vars: &[usize], types: &[Type]) -> Result<(), Stop> {
        for &v in vars {
            if let Some(value) = sample::random(&types[v], &mut self.rng) {
                search.point[v] = value;
            }
        }
        search.fitness = self.fitness(search.constraints, &search.point)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "solver_tests.rs"]
mod tests;
