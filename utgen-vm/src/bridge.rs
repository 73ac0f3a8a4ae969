//! Build bridge: source text in, loadable unit out
//!
//! [`BuildBridge::compile`] compiles one class, writes its source and
//! bytecode under an output directory and registers the result with a
//! shared [`UnitLoader`]. The loader keeps exactly one live revision per
//! qualified name; compiling the same name again supersedes the previous
//! unit, whose handles then report themselves as stale.

use crate::bytecode::Bytecode;
use crate::compiler::compile_source;
use crate::error::{CompileError, Diagnostic, VmResult};
use crate::vm::{Execution, Vm, VmConfig};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};
use utgen_core::{Type, Value};

/// Failure to turn source text into a loadable unit
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("source declares {found}, expected {expected}")]
    NameMismatch { expected: String, found: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bytecode serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BuildError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Compiler diagnostics, when the failure came from the compiler
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BuildError::Compile(err) => &err.diagnostics,
            _ => &[],
        }
    }
}

/// Failure to find a method in a loaded unit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("no method {signature} in {class}")]
    NotFound { class: String, signature: String },

    #[error("{name} revision {revision} was superseded by a newer build")]
    Stale { name: String, revision: u64 },
}

#[derive(Debug, Default)]
struct LoaderState {
    live: RwLock<FxHashMap<String, u64>>,
    last_revision: AtomicU64,
}

/// Registry of the live revision of every loaded qualified name
#[derive(Debug, Clone, Default)]
pub struct UnitLoader {
    state: Arc<LoaderState>,
}

impl UnitLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh revision and make it the live one for `name`
    fn register(&self, name: &str) -> u64 {
        let revision = self.state.last_revision.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.state.live.write().insert(name.to_string(), revision);
        if let Some(previous) = previous {
            debug!("{} revision {} supersedes {}", name, revision, previous);
        }
        revision
    }

    /// Live revision of a name
    pub fn current_revision(&self, name: &str) -> Option<u64> {
        self.state.live.read().get(name).copied()
    }

    /// Forget a name; its units become stale. Returns whether it was loaded
    pub fn unload(&self, name: &str) -> bool {
        self.state.live.write().remove(name).is_some()
    }

    /// Number of live names
    pub fn len(&self) -> usize {
        self.state.live.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One compiled class revision
#[derive(Debug, Clone)]
pub struct LoadableUnit {
    qualified_name: String,
    revision: u64,
    bytecode: Arc<Bytecode>,
    warnings: Vec<Diagnostic>,
    source_path: Option<PathBuf>,
    artifact_path: Option<PathBuf>,
    loader: UnitLoader,
}

impl LoadableUnit {
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Warning diagnostics produced while compiling
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Written `.java` file; `None` for in-memory builds
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Written `.bytecode.json` file; `None` for in-memory builds
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// Whether this is still the live revision of its name
    pub fn is_current(&self) -> bool {
        self.loader.current_revision(&self.qualified_name) == Some(self.revision)
    }

    /// Find a method by name and exact parameter types
    pub fn resolve_method(&self, name: &str, params: &[Type]) -> Result<MethodHandle, ResolveError> {
        if !self.is_current() {
            return Err(ResolveError::Stale {
                name: self.qualified_name.clone(),
                revision: self.revision,
            });
        }
        let chunk = self
            .bytecode
            .find_method(name, params)
            .ok_or_else(|| ResolveError::NotFound {
                class: self.qualified_name.clone(),
                signature: utgen_core::MethodSignature {
                    name: name.to_string(),
                    params: params.to_vec(),
                }
                .to_string(),
            })?;
        trace!("resolved {} in {} to chunk {}", name, self.qualified_name, chunk);
        Ok(MethodHandle {
            bytecode: Arc::clone(&self.bytecode),
            chunk,
        })
    }
}

/// Invocable method of a loaded unit
#[derive(Debug, Clone)]
pub struct MethodHandle {
    bytecode: Arc<Bytecode>,
    chunk: usize,
}

impl MethodHandle {
    pub fn name(&self) -> &str {
        &self.bytecode.chunks[self.chunk].name
    }

    pub fn params(&self) -> &[Type] {
        &self.bytecode.chunks[self.chunk].params
    }

    pub fn return_type(&self) -> &Type {
        &self.bytecode.chunks[self.chunk].return_type
    }

    /// `name(type, ...)`
    pub fn signature(&self) -> String {
        self.bytecode.chunks[self.chunk].signature()
    }

    /// Interpreter bound to this method's unit, reusable across invocations
    pub fn vm(&self, config: VmConfig) -> Vm<'_> {
        Vm::new(&self.bytecode, config)
    }

    /// Run once on fresh interpreter state
    pub fn invoke(&self, args: &[Value], config: VmConfig) -> VmResult<Execution> {
        self.vm(config).invoke(self.chunk, args)
    }

    /// Chunk index inside the unit
    pub fn chunk(&self) -> usize {
        self.chunk
    }
}

/// Compiles generated source into [`LoadableUnit`]s
#[derive(Debug, Clone, Default)]
pub struct BuildBridge {
    loader: UnitLoader,
}

impl BuildBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge registering its units with an existing loader
    pub fn with_loader(loader: UnitLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &UnitLoader {
        &self.loader
    }

    /// Compile `source`, which must declare `qualified_name`, writing
    /// `<out_dir>/<package path>/<Class>.java` and `<Class>.bytecode.json`
    pub fn compile(
        &self,
        qualified_name: &str,
        source: &str,
        out_dir: &Path,
    ) -> Result<LoadableUnit, BuildError> {
        let (bytecode, warnings) = self.build(qualified_name, source)?;

        let dir = package_dir(out_dir, qualified_name);
        fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
        let class_name = bytecode.class_name.clone();
        let source_path = dir.join(format!("{}.java", class_name));
        fs::write(&source_path, source).map_err(|e| BuildError::io(&source_path, e))?;
        let artifact_path = dir.join(format!("{}.bytecode.json", class_name));
        let json = serde_json::to_string_pretty(&bytecode)?;
        fs::write(&artifact_path, json).map_err(|e| BuildError::io(&artifact_path, e))?;

        Ok(self.load(qualified_name, bytecode, warnings, Some(source_path), Some(artifact_path)))
    }

    /// Compile without touching the file system
    pub fn compile_in_memory(
        &self,
        qualified_name: &str,
        source: &str,
    ) -> Result<LoadableUnit, BuildError> {
        let (bytecode, warnings) = self.build(qualified_name, source)?;
        Ok(self.load(qualified_name, bytecode, warnings, None, None))
    }

    /// Load a bytecode artifact written by [`BuildBridge::compile`]
    pub fn load_artifact(&self, path: &Path) -> Result<LoadableUnit, BuildError> {
        let json = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let bytecode: Bytecode = serde_json::from_str(&json)?;
        let name = bytecode.qualified_name();
        Ok(self.load(&name, bytecode, Vec::new(), None, Some(path.to_path_buf())))
    }

    fn build(&self, qualified_name: &str, source: &str) -> Result<(Bytecode, Vec<Diagnostic>), BuildError> {
        let compiled = compile_source(source)?;
        let found = compiled.bytecode.qualified_name();
        if found != qualified_name {
            return Err(BuildError::NameMismatch {
                expected: qualified_name.to_string(),
                found,
            });
        }
        for warning in &compiled.warnings {
            debug!("{}: {}", qualified_name, warning);
        }
        Ok((compiled.bytecode, compiled.warnings))
    }

    fn load(
        &self,
        qualified_name: &str,
        bytecode: Bytecode,
        warnings: Vec<Diagnostic>,
        source_path: Option<PathBuf>,
        artifact_path: Option<PathBuf>,
    ) -> LoadableUnit {
        let revision = self.loader.register(qualified_name);
        debug!(
            "loaded {} revision {} ({} methods)",
            qualified_name,
            revision,
            bytecode.chunks.len()
        );
        LoadableUnit {
            qualified_name: qualified_name.to_string(),
            revision,
            bytecode: Arc::new(bytecode),
            warnings,
            source_path,
            artifact_path,
            loader: self.loader.clone(),
        }
    }
}

/// Directory of a class inside an output root: one level per package segment
fn package_dir(out_dir: &Path, qualified_name: &str) -> PathBuf {
    let mut dir = out_dir.to_path_buf();
    let mut segments: Vec<&str> = qualified_name.split('.').collect();
    segments.pop();
    for segment in segments {
        dir.push(segment);
    }
    dir
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
