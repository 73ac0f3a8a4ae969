//! Harvested input tuples

use serde::{Deserialize, Serialize};
use utgen_core::{ProbeId, Value};

/// Branch outcomes of one execution, in order
pub type PathSignature = Vec<(ProbeId, bool)>;

/// Concrete arguments driving one distinct path, plus what the method returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTuple {
    /// One value per declared parameter
    pub values: Vec<Value>,
    /// Observed return value; `None` for void methods
    pub returned: Option<Value>,
    /// Branch outcomes of the execution that produced it
    pub path: PathSignature,
}

impl InputTuple {
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Structural identity used for deduplication
    pub fn same_inputs(&self, other: &InputTuple) -> bool {
        self.values == other.values
    }
}
