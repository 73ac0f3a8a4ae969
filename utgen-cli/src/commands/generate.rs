//! Generate a JUnit test class for the selected methods of a class

use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use utgen_core::CancellationToken;
use utgen_engine::{
    all_methods, load_class, select_named, store, ArtifactStrategy, GeneratorConfig,
    MethodOutcome, Orchestrator, PipelineError, RunReport, TempRetention,
};

/// Command line overrides of the configured generator settings
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub bound: Option<usize>,
    pub methods: Vec<String>,
    pub keep_temp: bool,
    pub jobs: Option<usize>,
    pub in_memory: bool,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
    pub report: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn apply(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(bound) = self.bound {
            config.bound = bound;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(seed) = self.seed {
            config.solver.seed = seed;
        }
        if self.keep_temp {
            config.retention = TempRetention::KeepTemp;
        }
        if self.in_memory {
            config.artifacts = ArtifactStrategy::InMemory;
        }
        config
    }
}

pub async fn generate(file: &Path, config: Config, options: GenerateOptions) -> Result<()> {
    let start = Instant::now();
    let generator = options.apply(config.generator.clone());
    debug!("generator settings: {:?}", generator);

    let class = load_class(file)?;
    let mut methods = all_methods(&class);
    let unmatched = select_named(&mut methods, &options.methods);
    if !unmatched.is_empty() {
        bail!(
            "{} has no method matching {}",
            class.qualified_name(),
            unmatched.join(", ")
        );
    }
    let selected = methods.iter().filter(|m| m.is_selected()).count();

    println!("{} Generating tests for {}", "→".blue().bold(), class.qualified_name());
    println!("  Methods: {} of {}", selected, methods.len());
    println!("  Bound: {}", generator.bound);

    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(generator)?.with_cancellation(cancel.clone());
    let mut worker = tokio::task::spawn_blocking(move || {
        let result = orchestrator.generate(&class, &methods);
        (class, result)
    });
    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = tokio::signal::ctrl_c() => {
            println!("{} Cancelling, finishing the current step...", "!".yellow());
            cancel.cancel();
            worker.await
        }
    };
    let (class, result) = joined.context("generation worker failed")?;

    match result {
        Ok(outcome) => {
            println!();
            print_summary(&outcome.report);
            write_report(options.report.as_deref(), &outcome.report)?;

            let dir = output_dir(file, options.output.as_deref(), config.output.directory.as_deref());
            let path = store(
                &dir,
                ".java",
                outcome.source(),
                outcome.suite.class_name(),
                config.output.encoding,
            )
            .with_context(|| format!("cannot write {} to {}", outcome.suite.class_name(), dir.display()))?;

            if let Some(artifacts) = &outcome.artifacts {
                println!("  Intermediate files kept in {}", artifacts.display());
            }
            println!(
                "{} Wrote {} test cases for {} to {} in {:.2}s",
                "✓".green().bold(),
                outcome.generated(),
                class.name(),
                path.display(),
                start.elapsed().as_secs_f64()
            );
            if outcome.report.cancelled {
                println!("{} Run was cancelled; the suite is partial", "!".yellow());
            }
            Ok(())
        }
        Err(PipelineError::AllMethodsFailed { report }) => {
            println!();
            print_summary(&report);
            write_report(options.report.as_deref(), &report)?;
            Err(anyhow!("no tests generated: all {} selected methods failed", report.methods.len()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Explicit flag, then configuration, then the directory of the source file
fn output_dir(file: &Path, flag: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    flag.or(configured)
        .map(Path::to_path_buf)
        .or_else(|| {
            file.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

fn write_report(path: Option<&Path>, report: &RunReport) -> Result<()> {
    if let Some(path) = path {
        let json = report.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write report {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    for method in &report.methods {
        match &method.outcome {
            MethodOutcome::Succeeded => println!(
                "  {} {} ({} cases)",
                "✓".green(),
                method.method,
                method.generated
            ),
            MethodOutcome::Skipped { reason } => {
                println!("  {} {} skipped: {}", "-".yellow(), method.method, reason)
            }
            MethodOutcome::Failed {
                reason,
                diagnostics,
                ..
            } => {
                println!(
                    "  {} {} failed after {}: {}",
                    "✗".red(),
                    method.method,
                    method.stage,
                    reason
                );
                for diagnostic in diagnostics {
                    println!("      {}", diagnostic.dimmed());
                }
                if method.generated > 0 {
                    println!("      kept {} cases found before the failure", method.generated);
                }
            }
            MethodOutcome::Cancelled => {
                println!("  {} {} cancelled", "!".yellow(), method.method)
            }
        }
    }

    println!("\n{}", "─".repeat(60));
    println!(
        "{} succeeded, {} skipped, {} failed, {} test cases",
        report.succeeded().to_string().green(),
        report.skipped().to_string().yellow(),
        if report.failed() > 0 {
            report.failed().to_string().red()
        } else {
            report.failed().to_string().normal()
        },
        report.generated
    );
}
