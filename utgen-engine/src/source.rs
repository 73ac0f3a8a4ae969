//! Source model provider

use crate::error::LoadError;
use crate::selection::MethodUnderTest;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use utgen_core::{ClassDecl, CompilationUnit, MethodDecl, MethodSignature};

/// A parsed source class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    path: Option<PathBuf>,
    unit: CompilationUnit,
}

impl ClassModel {
    pub fn new(unit: CompilationUnit, path: Option<PathBuf>) -> Self {
        Self { path, unit }
    }

    /// Parse source text that did not come from a file
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        parse(source, Path::new("<memory>")).map(|unit| Self::new(unit, None))
    }

    /// File the class was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    pub fn class(&self) -> &ClassDecl {
        &self.unit.class
    }

    pub fn name(&self) -> &str {
        &self.unit.class.name
    }

    pub fn package(&self) -> Option<&str> {
        self.unit.package.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        self.unit.qualified_name()
    }

    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDecl> {
        self.unit.class.method(signature)
    }

    /// Ordinal of a method, its index in declaration order
    pub fn ordinal(&self, signature: &MethodSignature) -> Option<usize> {
        self.unit
            .class
            .methods
            .iter()
            .position(|m| m.name == signature.name && m.param_types() == signature.params)
    }
}

/// Load and parse a source class
pub fn load_class(path: impl AsRef<Path>) -> Result<ClassModel, LoadError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let unit = parse(&source, path)?;
    debug!(
        "loaded {} with {} methods from {}",
        unit.qualified_name(),
        unit.class.methods.len(),
        path.display()
    );
    Ok(ClassModel::new(unit, Some(path.to_path_buf())))
}

/// Every method of the class, unselected, in declaration order
pub fn all_methods(class: &ClassModel) -> Vec<MethodUnderTest> {
    let qualified = class.qualified_name();
    class
        .class()
        .methods
        .iter()
        .enumerate()
        .map(|(ordinal, method)| MethodUnderTest::new(&qualified, ordinal, method))
        .collect()
}

fn parse(source: &str, path: &Path) -> Result<CompilationUnit, LoadError> {
    utgen_parser::parse(source).map_err(|err| {
        let (line, column) = err
            .position()
            .map(|pos| utgen_parser::line_col(source, pos))
            .unwrap_or((0, 0));
        LoadError::Parse {
            path: path.to_path_buf(),
            line,
            column,
            source: err,
        }
    })
}
