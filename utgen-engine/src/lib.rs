//! Unit test generation engine
//!
//! Loads a source class, lets callers select methods, and drives each
//! selected method through loop normalization, instrumentation,
//! compilation and input harvesting into a JUnit test suite.
//!
//! ```no_run
//! use utgen_engine::{all_methods, load_class, GeneratorConfig, Orchestrator};
//!
//! let class = load_class("src/demo/Calc.java")?;
//! let mut methods = all_methods(&class);
//! methods.iter_mut().for_each(|m| m.set_selected(true));
//! let outcome = Orchestrator::new(GeneratorConfig::with_bound(3))?.generate(&class, &methods)?;
//! println!("{} test cases", outcome.generated());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod render;
pub mod report;
pub mod selection;
pub mod source;
pub mod storage;
pub mod suite;
pub mod workspace;

pub use config::{
    ArtifactStrategy, ConfigError, GeneratorConfig, PartialResultPolicy, SolverSettings,
    TempRetention, VmSettings, MAX_BOUND,
};
pub use error::{FailureKind, LoadError, MethodError, PipelineError, RenderError};
pub use orchestrator::{GenerationOutcome, Orchestrator};
pub use provider::{provider_for, InMemoryProvider, TempDirProvider, UnitProvider};
pub use render::{JUnitRenderer, RenderedCase, TestCase};
pub use report::{MethodOutcome, MethodReport, MethodStage, RunReport};
pub use selection::{select_named, MethodUnderTest};
pub use source::{all_methods, load_class, ClassModel};
pub use storage::{store, Encoding};
pub use suite::{GeneratedTestSuite, SuiteBuilder};
pub use workspace::RunDirectory;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
