//! Generator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utgen_harvest::HarvestConfig;
use utgen_rewrite::RewriteConfig;

/// What happens to the run directory when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempRetention {
    #[default]
    DeleteTemp,
    KeepTemp,
}

/// What happens to tuples harvested before a method failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialResultPolicy {
    /// Render them and report the failure
    #[default]
    Keep,
    /// Drop them; the failed method contributes no test
    Discard,
}

/// How instrumented classes are turned into loadable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStrategy {
    /// Write every stage's source under the run directory and compile from there
    #[default]
    TempDir,
    /// Compile in process without writing artifacts
    InMemory,
}

/// Input search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub seed: u64,
    pub max_evaluations: u64,
    pub per_target_evaluations: u64,
    pub max_paths: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let harvest = HarvestConfig::default();
        Self {
            seed: harvest.seed,
            max_evaluations: harvest.max_evaluations,
            per_target_evaluations: harvest.per_target_evaluations,
            max_paths: harvest.max_paths,
        }
    }
}

/// Interpreter limits for every single execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSettings {
    pub max_steps: u64,
    pub max_call_depth: usize,
}

impl Default for VmSettings {
    fn default() -> Self {
        let harvest = HarvestConfig::default();
        Self {
            max_steps: harvest.max_steps,
            max_call_depth: harvest.max_call_depth,
        }
    }
}

/// Largest accepted unrolling bound
pub const MAX_BOUND: usize = 1_000;

/// Settings of one generation run
///
/// Every field has a default, so a configuration file only needs the
/// keys it changes. Timeouts of `0` disable the deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Loop unrolling bound `k`
    pub bound: usize,
    pub retention: TempRetention,
    pub artifacts: ArtifactStrategy,
    /// Parent of the run directory; the system temp dir when unset
    pub temp_root: Option<PathBuf>,
    pub max_rewrite_iterations: usize,
    pub max_body_nodes: usize,
    pub compile_timeout_ms: u64,
    pub harvest_timeout_ms: u64,
    /// Methods processed concurrently
    pub jobs: usize,
    pub partial_results: PartialResultPolicy,
    pub deduplicate: bool,
    pub solver: SolverSettings,
    pub vm: VmSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bound: 3,
            retention: TempRetention::DeleteTemp,
            artifacts: ArtifactStrategy::TempDir,
            temp_root: None,
            max_rewrite_iterations: 64,
            max_body_nodes: 20_000,
            compile_timeout_ms: 10_000,
            harvest_timeout_ms: 30_000,
            jobs: 1,
            partial_results: PartialResultPolicy::Keep,
            deduplicate: true,
            solver: SolverSettings::default(),
            vm: VmSettings::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_bound(bound: usize) -> Self {
        Self {
            bound,
            ..Self::default()
        }
    }

    /// Reject settings no run can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bound == 0 {
            return Err(ConfigError::InvalidBound(self.bound));
        }
        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs(self.jobs));
        }
        let limits = [
            ("max_rewrite_iterations", self.max_rewrite_iterations as u64),
            ("max_body_nodes", self.max_body_nodes as u64),
            ("solver.max_evaluations", self.solver.max_evaluations),
            ("solver.per_target_evaluations", self.solver.per_target_evaluations),
            ("solver.max_paths", self.solver.max_paths as u64),
            ("vm.max_steps", self.vm.max_steps),
            ("vm.max_call_depth", self.vm.max_call_depth as u64),
        ];
        if let Some(&(field, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroLimit { field });
        }
        // Every unrolled copy adds at least a guard and a block
        let max = MAX_BOUND.min(self.max_body_nodes / 2);
        if self.bound > max {
            return Err(ConfigError::BoundTooLarge {
                bound: self.bound,
                max,
            });
        }
        Ok(())
    }

    pub fn rewrite(&self) -> RewriteConfig {
        RewriteConfig {
            bound: self.bound,
            max_iterations: self.max_rewrite_iterations,
            max_nodes: self.max_body_nodes,
        }
    }

    pub fn harvest(&self) -> HarvestConfig {
        HarvestConfig {
            seed: self.solver.seed,
            max_evaluations: self.solver.max_evaluations,
            per_target_evaluations: self.solver.per_target_evaluations,
            max_paths: self.solver.max_paths,
            deduplicate: self.deduplicate,
            timeout_ms: (self.harvest_timeout_ms > 0).then_some(self.harvest_timeout_ms),
            max_steps: self.vm.max_steps,
            max_call_depth: self.vm.max_call_depth,
        }
    }

    pub fn compile_timeout_ms(&self) -> Option<u64> {
        (self.compile_timeout_ms > 0).then_some(self.compile_timeout_ms)
    }
}

/// Invalid generator settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid unrolling bound {0}: must be at least 1")]
    InvalidBound(usize),

    #[error("unrolling bound {bound} is too large: at most {max} is supported")]
    BoundTooLarge { bound: usize, max: usize },

    #[error("invalid job count {0}: must be at least 1")]
    InvalidJobs(usize),

    #[error("`{field}` must be greater than zero")]
    ZeroLimit { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.bound, 3);
        assert_eq!(config.retention, TempRetention::DeleteTemp);
        assert_eq!(config.partial_results, PartialResultPolicy::Keep);
        assert_eq!(config.jobs, 1);
        assert_eq!(config.solver.seed, 0x5eed);
        assert_eq!(config.vm.max_steps, 1_000_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_derived_configs() {
        let config = GeneratorConfig {
            harvest_timeout_ms: 0,
            deduplicate: false,
            ..GeneratorConfig::with_bound(5)
        };
        assert_eq!(config.rewrite(), RewriteConfig::with_bound(5));
        let harvest = config.harvest();
        assert_eq!(harvest.timeout_ms, None);
        assert!(!harvest.deduplicate);
        assert_eq!(harvest.max_paths, 64);
        assert_eq!(GeneratorConfig::default().harvest().timeout_ms, Some(30_000));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            GeneratorConfig::with_bound(0).validate(),
            Err(ConfigError::InvalidBound(0))
        );
        let config = GeneratorConfig {
            jobs: 0,
            ..GeneratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidJobs(0)));
        let mut config = GeneratorConfig::default();
        config.vm.max_steps = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroLimit { field: "vm.max_steps" })
        );
    }

    #[test]
    fn test_bound_upper_limit() {
        assert_eq!(GeneratorConfig::with_bound(MAX_BOUND).validate(), Ok(()));
        assert_eq!(
            GeneratorConfig::with_bound(1_000_000).validate(),
            Err(ConfigError::BoundTooLarge {
                bound: 1_000_000,
                max: MAX_BOUND,
            })
        );
        let config = GeneratorConfig {
            max_body_nodes: 100,
            ..GeneratorConfig::with_bound(60)
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BoundTooLarge { bound: 60, max: 50 })
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"bound": 2, "retention": "keep_temp", "solver": {"seed": 7}}"#)
                .unwrap();
        assert_eq!(config.bound, 2);
        assert_eq!(config.retention, TempRetention::KeepTemp);
        assert_eq!(config.solver.seed, 7);
        assert_eq!(config.solver.max_paths, 64);
        assert_eq!(config.artifacts, ArtifactStrategy::TempDir);
    }
}
