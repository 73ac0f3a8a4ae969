//! Per-method and per-run reports

use crate::error::{FailureKind, MethodError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline states of one method
///
/// A method moves forward through `Selected ..= Rendered`; `Failed` and
/// `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodStage {
    Selected,
    Preprocessing,
    Instrumented,
    Compiled,
    Executed,
    Harvested,
    Rendered,
    Failed,
    Skipped,
}

impl MethodStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MethodStage::Rendered | MethodStage::Failed | MethodStage::Skipped)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MethodStage::Selected => "selected",
            MethodStage::Preprocessing => "preprocessing",
            MethodStage::Instrumented => "instrumented",
            MethodStage::Compiled => "compiled",
            MethodStage::Executed => "executed",
            MethodStage::Harvested => "harvested",
            MethodStage::Rendered => "rendered",
            MethodStage::Failed => "failed",
            MethodStage::Skipped => "skipped",
        }
    }
}

impl fmt::Display for MethodStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a method left the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Succeeded,
    Skipped {
        reason: String,
    },
    Failed {
        kind: FailureKind,
        reason: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        diagnostics: Vec<String>,
    },
    /// Cancellation reached the method before it finished
    Cancelled,
}

impl MethodOutcome {
    pub fn failed(error: &MethodError) -> Self {
        MethodOutcome::Failed {
            kind: error.kind(),
            reason: error.to_string(),
            diagnostics: error.diagnostics(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MethodOutcome::Failed { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            MethodOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// What happened to one selected method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReport {
    /// Position of the method in its class
    pub ordinal: usize,
    /// `name(type, ...)`
    pub method: String,
    /// Furthest pipeline stage reached
    pub stage: MethodStage,
    pub outcome: MethodOutcome,
    /// Fixpoint rounds of loop normalization
    pub rounds: usize,
    pub probes: usize,
    pub branch_probes: usize,
    /// Distinct paths the harvester explored
    pub paths: usize,
    /// Input tuples handed to the suite
    pub tuples: usize,
    /// Test cases that made it into the suite
    pub generated: usize,
    /// Cases dropped because they could not be rendered
    pub render_failures: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl MethodReport {
    pub fn new(ordinal: usize, method: impl Into<String>) -> Self {
        Self {
            ordinal,
            method: method.into(),
            stage: MethodStage::Selected,
            outcome: MethodOutcome::Succeeded,
            rounds: 0,
            probes: 0,
            branch_probes: 0,
            paths: 0,
            tuples: 0,
            generated: 0,
            render_failures: 0,
            warnings: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// Terminal state of the method
    pub fn final_stage(&self) -> MethodStage {
        match self.outcome {
            MethodOutcome::Succeeded => MethodStage::Rendered,
            MethodOutcome::Skipped { .. } => MethodStage::Skipped,
            MethodOutcome::Failed { .. } | MethodOutcome::Cancelled => MethodStage::Failed,
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Qualified name of the class under test
    pub class: String,
    /// One entry per selected method, by ordinal
    pub methods: Vec<MethodReport>,
    pub generated: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, MethodOutcome::Succeeded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MethodOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(MethodOutcome::is_failed)
    }

    pub fn cancelled_methods(&self) -> usize {
        self.count(|o| matches!(o, MethodOutcome::Cancelled))
    }

    /// Methods that finished before cancellation, whatever their outcome
    pub fn completed(&self) -> usize {
        self.methods.len() - self.cancelled_methods()
    }

    pub fn method(&self, name: &str) -> Option<&MethodReport> {
        self.methods
            .iter()
            .find(|m| m.method == name || m.method.split('(').next() == Some(name))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn count(&self, pred: impl Fn(&MethodOutcome) -> bool) -> usize {
        self.methods.iter().filter(|m| pred(&m.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<MethodOutcome>) -> RunReport {
        RunReport {
            class: "demo.Calc".into(),
            methods: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| MethodReport {
                    outcome,
                    ..MethodReport::new(i, format!("m{}(int)", i))
                })
                .collect(),
            generated: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_counts() {
        let report = report(vec![
            MethodOutcome::Succeeded,
            MethodOutcome::Skipped { reason: "no parameters".into() },
            MethodOutcome::Failed {
                kind: FailureKind::Compile,
                reason: "boom".into(),
                diagnostics: vec![],
            },
            MethodOutcome::Cancelled,
        ]);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.completed(), 3);
        assert_eq!(report.method("m2").map(|m| m.final_stage()), Some(MethodStage::Failed));
        assert_eq!(report.method("m1(int)").map(|m| m.final_stage()), Some(MethodStage::Skipped));
    }

    #[test]
    fn test_json_shape() {
        let report = report(vec![MethodOutcome::Failed {
            kind: FailureKind::UnsupportedType,
            reason: "no sample strategy".into(),
            diagnostics: vec![],
        }]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let outcome = &json["methods"][0]["outcome"];
        assert_eq!(outcome["status"], "failed");
        assert_eq!(outcome["kind"], "unsupported_type");
        assert!(outcome.get("diagnostics").is_none());
        assert_eq!(json["methods"][0]["stage"], "selected");
    }

    #[test]
    fn test_stage_order() {
        assert!(MethodStage::Preprocessing < MethodStage::Compiled);
        assert!(MethodStage::Rendered.is_terminal());
        assert!(!MethodStage::Harvested.is_terminal());
    }
}
