//! Per-method generation pipeline
//!
//! Every selected method goes through
//! `Selected -> Preprocessing -> Instrumented -> Compiled -> Executed -> Harvested -> Rendered`
//! on its own namespace `<package>.instrumented.m<N>_<method>`. Failures
//! are caught at the method boundary and recorded in the run report; only
//! the conditions listed on [`PipelineError`] abort a run.

use crate::config::{GeneratorConfig, PartialResultPolicy};
use crate::error::{MethodError, PipelineError};
use crate::provider::{provider_for, UnitProvider};
use crate::render::JUnitRenderer;
use crate::report::{MethodOutcome, MethodReport, MethodStage, RunReport};
use crate::selection::MethodUnderTest;
use crate::source::ClassModel;
use crate::suite::{GeneratedTestSuite, SuiteBuilder};
use crate::workspace::{method_namespace, RunDirectory};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use utgen_core::{Block, CancellationToken, CompilationUnit, MethodDecl};
use utgen_harvest::{generate_inputs, HarvestError, HarvestFailure, InputTuple};
use utgen_rewrite::{instrument, separate_locals, ReferencedTypes, RewritePipeline};
use utgen_vm::{BuildBridge, UnitLoader};

/// Result of a run that produced a suite
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub suite: GeneratedTestSuite,
    pub report: RunReport,
    /// Run directory, when kept
    pub artifacts: Option<PathBuf>,
}

impl GenerationOutcome {
    pub fn source(&self) -> &str {
        self.suite.source()
    }

    /// Number of generated test methods
    pub fn generated(&self) -> usize {
        self.suite.count()
    }
}

/// Drives selected methods through the pipeline
pub struct Orchestrator {
    config: GeneratorConfig,
    bridge: BuildBridge,
    provider: Box<dyn UnitProvider>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: GeneratorConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let bridge = BuildBridge::new();
        let provider = provider_for(config.artifacts, bridge.clone());
        Ok(Self {
            config,
            bridge,
            provider,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the artifact strategy
    pub fn with_provider(mut self, provider: Box<dyn UnitProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Bridge whose loader the default providers register with
    pub fn bridge(&self) -> &BuildBridge {
        &self.bridge
    }

    pub fn loader(&self) -> &UnitLoader {
        self.bridge.loader()
    }

    /// Generate a test suite for the selected methods of `class`
    pub fn generate(
        &self,
        class: &ClassModel,
        methods: &[MethodUnderTest],
    ) -> Result<GenerationOutcome, PipelineError> {
        let started = Instant::now();
        let qualified = class.qualified_name();

        let mut selected: Vec<(&MethodUnderTest, &MethodDecl)> = Vec::new();
        for method in methods.iter().filter(|m| m.is_selected()) {
            let decl = class
                .method(method.signature())
                .filter(|_| method.class() == qualified)
                .ok_or_else(|| PipelineError::UnknownMethod {
                    class: qualified.clone(),
                    signature: method.signature().to_string(),
                })?;
            selected.push((method, decl));
        }
        if selected.is_empty() {
            return Err(PipelineError::NoMethodSelected);
        }
        info!(
            "generating tests for {} of {} methods of {} (k = {}, {} provider)",
            selected.len(),
            class.class().methods.len(),
            qualified,
            self.config.bound,
            self.provider.name()
        );

        let run_dir = RunDirectory::create(self.config.temp_root.as_deref(), self.config.retention)
            .map_err(|err| {
                let parent = self.config.temp_root.clone().unwrap_or_else(std::env::temp_dir);
                PipelineError::workspace(parent, err)
            })?;
        let renderer = JUnitRenderer::new(class.name(), class.package().map(str::to_string));
        let suite = SuiteBuilder::new(renderer, self.config.deduplicate);

        let reports: Vec<MethodReport> = if self.config.jobs > 1 && selected.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()?;
            pool.install(|| {
                selected
                    .par_iter()
                    .map(|(method, decl)| self.run_method(class, method, decl, &run_dir, &suite))
                    .collect()
            })
        } else {
            selected
                .iter()
                .map(|(method, decl)| self.run_method(class, method, decl, &run_dir, &suite))
                .collect()
        };

        let run_path = run_dir.path().to_path_buf();
        let artifacts = run_dir
            .release()
            .map_err(|err| PipelineError::workspace(run_path, err))?;
        let suite = suite.finalize();
        let mut report = RunReport {
            class: qualified,
            methods: reports,
            generated: suite.count(),
            cancelled: false,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        report.cancelled = report.cancelled_methods() > 0;
        info!(
            "{}: {} test cases; {} succeeded, {} skipped, {} failed in {} ms",
            report.class,
            report.generated,
            report.succeeded(),
            report.skipped(),
            report.failed(),
            report.elapsed_ms
        );

        if report.cancelled && report.completed() == 0 {
            return Err(PipelineError::Cancelled);
        }
        if report.failed() == report.methods.len() {
            return Err(PipelineError::AllMethodsFailed {
                report: Box::new(report),
            });
        }
        Ok(GenerationOutcome {
            suite,
            report,
            artifacts,
        })
    }

    fn run_method(
        &self,
        class: &ClassModel,
        method: &MethodUnderTest,
        decl: &MethodDecl,
        run_dir: &RunDirectory,
        suite: &SuiteBuilder,
    ) -> MethodReport {
        let started = Instant::now();
        let mut report = MethodReport::new(method.ordinal(), method.signature().to_string());
        let result = self.pipeline(class, method, decl, run_dir, suite, &mut report);
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => debug!("{}: {} test cases", method, report.generated),
            Err(MethodError::Cancelled) => {
                info!("{}: cancelled while {}", method, report.stage);
                report.outcome = MethodOutcome::Cancelled;
            }
            Err(err) => {
                warn!("{} failed after {}: {}", method, report.stage, err);
                report.outcome = MethodOutcome::failed(&err);
            }
        }
        report
    }

    fn pipeline(
        &self,
        class: &ClassModel,
        method: &MethodUnderTest,
        decl: &MethodDecl,
        run_dir: &RunDirectory,
        suite: &SuiteBuilder,
        report: &mut MethodReport,
    ) -> Result<(), MethodError> {
        if self.cancel.is_cancelled() {
            return Err(MethodError::Cancelled);
        }
        if decl.params.is_empty() {
            info!("{}: skipped, no parameters", method);
            report.outcome = MethodOutcome::Skipped {
                reason: "method has no parameters".to_string(),
            };
            return Ok(());
        }
        if let Some(ty) = method.unsupported_params().first() {
            return Err(HarvestError::unsupported(method.signature().to_string(), ty).into());
        }
        let dir = run_dir.method_dir(method.ordinal(), method.name());
        let package = instrumented_package(class.package(), method.ordinal(), method.name());

        advance(report, method, MethodStage::Preprocessing);
        let decl = &separate_locals(decl);
        let referenced = ReferencedTypes::collect(decl)?.with_class_methods(class.class());
        let mut rewriter = RewritePipeline::new(self.config.rewrite());
        let normalized = rewriter.normalize(&decl.body, &referenced, &self.cancel)?;
        report.rounds = normalized.rounds;
        debug!("{}: {}", method, rewriter.stats());
        let preprocessed = with_body(class.unit(), decl, normalized.body.clone(), &package);
        if let Some(path) = self.provider.record_preprocessed(&preprocessed, &dir)? {
            debug!("{}: preprocessed source at {}", method, path.display());
        }

        let instrumented = instrument(&normalized.body, &referenced);
        report.probes = instrumented.probes.len();
        report.branch_probes = instrumented.branch_count();
        let unit = with_body(class.unit(), decl, instrumented.body, &package);
        advance(report, method, MethodStage::Instrumented);

        if self.cancel.is_cancelled() {
            return Err(MethodError::Cancelled);
        }
        let compile_started = Instant::now();
        let loadable = self.provider.load(&unit, &dir)?;
        if let Some(limit_ms) = self.config.compile_timeout_ms() {
            if compile_started.elapsed().as_millis() > u128::from(limit_ms) {
                return Err(MethodError::Timeout {
                    stage: MethodStage::Compiled,
                    limit_ms,
                });
            }
        }
        report.warnings = loadable.warnings().iter().map(|w| w.to_string()).collect();
        advance(report, method, MethodStage::Compiled);

        let harvested = generate_inputs(
            &loadable,
            method.name(),
            method.params(),
            &self.config.harvest(),
            &self.cancel,
        );
        advance(report, method, MethodStage::Executed);
        match harvested {
            Ok(harvest) => {
                report.paths = harvest.stats.paths;
                advance(report, method, MethodStage::Harvested);
                append(suite, method, &harvest.tuples, report);
                advance(report, method, MethodStage::Rendered);
                Ok(())
            }
            Err(HarvestFailure { error, partial }) => {
                if self.config.partial_results == PartialResultPolicy::Keep && !partial.is_empty() {
                    debug!("{}: keeping {} tuples harvested before the failure", method, partial.len());
                    append(suite, method, &partial, report);
                }
                Err(error.into())
            }
        }
    }
}

fn advance(report: &mut MethodReport, method: &MethodUnderTest, stage: MethodStage) {
    debug_assert!(stage > report.stage);
    info!("{}: {} -> {}", method, report.stage, stage);
    report.stage = stage;
}

fn append(suite: &SuiteBuilder, method: &MethodUnderTest, tuples: &[InputTuple], report: &mut MethodReport) {
    let summary = suite.append(method, tuples);
    report.tuples += tuples.len();
    report.generated += summary.added;
    report.render_failures += summary.render_errors.len();
}

/// `<package>.instrumented.m<N>_<method>`
pub fn instrumented_package(package: Option<&str>, ordinal: usize, method: &str) -> String {
    let namespace = method_namespace(ordinal, method);
    match package {
        Some(package) => format!("{}.instrumented.{}", package, namespace),
        None => format!("instrumented.{}", namespace),
    }
}

/// Copy of `unit` moved to `package`, with `decl`'s body replaced
fn with_body(unit: &CompilationUnit, decl: &MethodDecl, body: Block, package: &str) -> CompilationUnit {
    let mut unit = unit.clone();
    unit.package = Some(package.to_string());
    let mut method = decl.clone();
    method.body = body;
    unit.class.replace_method(method);
    unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumented_package() {
        assert_eq!(
            instrumented_package(Some("demo"), 2, "clamp"),
            "demo.instrumented.m2_clamp"
        );
        assert_eq!(instrumented_package(None, 0, "f"), "instrumented.m0_f");
    }

    #[test]
    fn test_with_body_keeps_other_methods() {
        let unit = utgen_parser::parse(
            "package demo; class T { static int f(int x) { return x; } static int g() { return 1; } }",
        )
        .unwrap();
        let decl = &unit.class.methods[0];
        let body = Block::new(Vec::new());
        let moved = with_body(&unit, decl, body.clone(), "demo.instrumented.m0_f");
        assert_eq!(moved.qualified_name(), "demo.instrumented.m0_f.T");
        assert_eq!(moved.class.methods[0].body, body);
        assert_eq!(moved.class.methods[1], unit.class.methods[1]);
    }
}
