//! Test suite accumulation

use crate::error::RenderError;
use crate::render::{JUnitRenderer, RenderedCase, TestCase};
use crate::selection::MethodUnderTest;
use parking_lot::Mutex;
use tracing::warn;
use utgen_harvest::InputTuple;

/// Result of adding one method's tuples
#[derive(Debug, Default)]
pub struct AppendSummary {
    pub added: usize,
    pub duplicates: usize,
    pub render_errors: Vec<RenderError>,
}

/// Shared accumulator filled by method workers
///
/// Cases are rendered outside the lock; the finalized suite orders them
/// by method ordinal, then by discovery order.
#[derive(Debug)]
pub struct SuiteBuilder {
    renderer: JUnitRenderer,
    deduplicate: bool,
    entries: Mutex<Vec<(usize, Vec<RenderedCase>)>>,
}

impl SuiteBuilder {
    pub fn new(renderer: JUnitRenderer, deduplicate: bool) -> Self {
        Self {
            renderer,
            deduplicate,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn renderer(&self) -> &JUnitRenderer {
        &self.renderer
    }

    /// Render one case per tuple and add them to the suite
    ///
    /// A tuple that cannot be rendered is dropped on its own; the rest of
    /// the method's cases are still added.
    pub fn append(&self, method: &MethodUnderTest, tuples: &[InputTuple]) -> AppendSummary {
        let mut summary = AppendSummary::default();
        let mut seen: Vec<&[utgen_core::Value]> = Vec::new();
        let mut cases = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            if self.deduplicate && seen.contains(&tuple.values.as_slice()) {
                summary.duplicates += 1;
                continue;
            }
            seen.push(&tuple.values);
            let case = TestCase::from_tuple(
                method.name(),
                method.params(),
                method.return_type(),
                method.is_static(),
                tuple,
            );
            match self.renderer.render_case(&case) {
                Ok(rendered) => cases.push(rendered),
                Err(err) => {
                    warn!("{}: dropping test case: {}", method, err);
                    summary.render_errors.push(err);
                }
            }
        }
        summary.added = cases.len();
        if !cases.is_empty() {
            self.entries.lock().push((method.ordinal(), cases));
        }
        summary
    }

    /// Cases added so far
    pub fn len(&self) -> usize {
        self.entries.lock().iter().map(|(_, cases)| cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finalize(self) -> GeneratedTestSuite {
        let mut entries = self.entries.into_inner();
        entries.sort_by_key(|(ordinal, _)| *ordinal);
        let cases: Vec<RenderedCase> = entries.into_iter().flat_map(|(_, cases)| cases).collect();
        GeneratedTestSuite {
            class_name: self.renderer.test_class_name(),
            source: self.renderer.render_suite(&cases),
            count: cases.len(),
        }
    }
}

/// Finalized test class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTestSuite {
    class_name: String,
    source: String,
    count: usize,
}

impl GeneratedTestSuite {
    /// `<Class>Test`
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of generated test methods
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
#[path = "suite_tests.rs"]
mod tests;
