//! Writing generated sources to disk

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Character encoding of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1; characters above U+00FF cannot be stored
    Latin1,
}

impl Encoding {
    pub fn encode(&self, content: &str) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(content.as_bytes().to_vec()),
            Encoding::Latin1 => content
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("character {:?} is not representable in ISO-8859-1", c),
                        )
                    })
                })
                .collect(),
        }
    }
}

/// Write `content` to `<dir>/<filename><extension>`, creating `dir`
///
/// The extension may be given with or without its leading dot.
pub fn store(
    dir: &Path,
    extension: &str,
    content: &str,
    filename: &str,
    encoding: Encoding,
) -> io::Result<PathBuf> {
    let bytes = encoding.encode(content)?;
    fs::create_dir_all(dir)?;
    let extension = extension.trim_start_matches('.');
    let path = if extension.is_empty() {
        dir.join(filename)
    } else {
        dir.join(format!("{}.{}", filename, extension))
    };
    fs::write(&path, bytes)?;
    trace!("stored {}", path.display());
    Ok(path)
}

/// Directory of a package below `root`
pub fn package_dir(root: &Path, package: Option<&str>) -> PathBuf {
    match package {
        Some(package) => package.split('.').fold(root.to_path_buf(), |dir, part| dir.join(part)),
        None => root.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
