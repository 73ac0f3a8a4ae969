//! Run directory holding every temporary artifact of one run

use crate::config::TempRetention;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Temporary directory with one sub-directory per method
#[derive(Debug)]
pub struct RunDirectory {
    dir: TempDir,
    retention: TempRetention,
}

impl RunDirectory {
    /// Create a fresh directory under `parent`, or the system temp dir
    pub fn create(parent: Option<&Path>, retention: TempRetention) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("utgen-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        debug!("run directory {}", dir.path().display());
        Ok(Self { dir, retention })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `m<ordinal>_<method>` below the run directory
    pub fn method_dir(&self, ordinal: usize, method: &str) -> PathBuf {
        self.dir.path().join(method_namespace(ordinal, method))
    }

    /// Delete or keep the directory; returns its path when kept
    pub fn release(self) -> io::Result<Option<PathBuf>> {
        match self.retention {
            TempRetention::DeleteTemp => {
                debug!("deleting run directory {}", self.dir.path().display());
                self.dir.close()?;
                Ok(None)
            }
            TempRetention::KeepTemp => {
                #[allow(deprecated)]
                let path = self.dir.into_path();
                debug!("keeping run directory {}", path.display());
                Ok(Some(path))
            }
        }
    }
}

/// Per-method namespace segment, unique within a class
pub fn method_namespace(ordinal: usize, method: &str) -> String {
    format!("m{}_{}", ordinal, method)
}
