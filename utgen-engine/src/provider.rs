//! Strategies for turning generated classes into loadable units

use crate::config::ArtifactStrategy;
use crate::error::MethodError;
use crate::storage::{self, package_dir, Encoding};
use std::path::{Path, PathBuf};
use utgen_core::printer::print_unit;
use utgen_core::CompilationUnit;
use utgen_vm::{BuildBridge, LoadableUnit};

/// Turns generated classes into loadable units for one run
///
/// `dir` is the method's own directory under the run directory.
pub trait UnitProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Keep the loop-free class produced by preprocessing; returns where
    /// it was written, if anywhere
    fn record_preprocessed(&self, unit: &CompilationUnit, dir: &Path) -> Result<Option<PathBuf>, MethodError>;

    /// Compile the instrumented class and load it
    fn load(&self, unit: &CompilationUnit, dir: &Path) -> Result<LoadableUnit, MethodError>;
}

/// Writes each stage under the run directory and compiles from there
#[derive(Debug, Clone, Default)]
pub struct TempDirProvider {
    bridge: BuildBridge,
}

impl TempDirProvider {
    pub fn new(bridge: BuildBridge) -> Self {
        Self { bridge }
    }
}

impl UnitProvider for TempDirProvider {
    fn name(&self) -> &'static str {
        "temp-dir"
    }

    fn record_preprocessed(&self, unit: &CompilationUnit, dir: &Path) -> Result<Option<PathBuf>, MethodError> {
        let target = package_dir(&dir.join("preprocess"), unit.package.as_deref());
        storage::store(&target, ".java", &print_unit(unit), &unit.class.name, Encoding::Utf8)
            .map(Some)
            .map_err(|err| MethodError::storage(&target, err))
    }

    fn load(&self, unit: &CompilationUnit, dir: &Path) -> Result<LoadableUnit, MethodError> {
        let out = dir.join("compiled");
        Ok(self.bridge.compile(&unit.qualified_name(), &print_unit(unit), &out)?)
    }
}

/// Compiles in process; nothing touches the file system
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bridge: BuildBridge,
}

impl InMemoryProvider {
    pub fn new(bridge: BuildBridge) -> Self {
        Self { bridge }
    }
}

impl UnitProvider for InMemoryProvider {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn record_preprocessed(&self, _unit: &CompilationUnit, _dir: &Path) -> Result<Option<PathBuf>, MethodError> {
        Ok(None)
    }

    fn load(&self, unit: &CompilationUnit, _dir: &Path) -> Result<LoadableUnit, MethodError> {
        Ok(self.bridge.compile_in_memory(&unit.qualified_name(), &print_unit(unit))?)
    }
}

/// Provider for a configured strategy, registering units with `bridge`'s loader
pub fn provider_for(strategy: ArtifactStrategy, bridge: BuildBridge) -> Box<dyn UnitProvider> {
    match strategy {
        ArtifactStrategy::TempDir => Box::new(TempDirProvider::new(bridge)),
        ArtifactStrategy::InMemory => Box::new(InMemoryProvider::new(bridge)),
    }
}
