use serde::{Deserialize, Serialize};
use std::time::Duration;
use utgen_vm::VmConfig;

/// Search parameters for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Seed of the solver's random restarts
    pub seed: u64,
    /// Fitness evaluations across the whole method
    pub max_evaluations: u64,
    /// Fitness evaluations spent on one negated branch before giving up on it
    pub per_target_evaluations: u64,
    /// Distinct paths after which the search stops
    pub max_paths: usize,
    /// Drop tuples structurally equal to an earlier one
    pub deduplicate: bool,
    /// Wall-clock limit checked between executions
    pub timeout_ms: Option<u64>,
    pub max_steps: u64,
    pub max_call_depth: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let vm = VmConfig::default();
        Self {
            seed: 0x5eed,
            max_evaluations: 200_000,
            per_target_evaluations: 4_000,
            max_paths: 64,
            deduplicate: true,
            timeout_ms: None,
            max_steps: vm.max_steps,
            max_call_depth: vm.max_call_depth,
        }
    }
}

impl HarvestConfig {
    pub fn vm(&self) -> VmConfig {
        VmConfig {
            max_steps: self.max_steps,
            max_call_depth: self.max_call_depth,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
