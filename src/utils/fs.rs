//! File system helpers
//!
//! Splits host file paths into a bind-mountable directory and a bare file name,
//! and checks tarballs before they are handed to a helper container.

use crate::error::{Result, VackupError};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// A host file split for bind-mounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute, symlink-free directory containing the file
    pub dir: PathBuf,
    /// Bare file name inside `dir`
    pub file_name: OsString,
}

impl ResolvedPath {
    /// Full path of the file on the host
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Directory as a string suitable for a `-v` mount argument
    #[must_use]
    pub fn dir_arg(&self) -> String {
        self.dir.to_string_lossy().into_owned()
    }

    /// File name as a string suitable for a container command argument
    #[must_use]
    pub fn file_name_arg(&self) -> String {
        self.file_name.to_string_lossy().into_owned()
    }
}

/// Resolves and validates host paths
#[derive(Debug)]
pub struct PathResolver;

impl PathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        Self
    }

    /// Split `path` into its canonical containing directory and file name
    ///
    /// A path without a directory part resolves against the current directory.
    /// Directories containing `:` are rejected since they cannot be bind-mounted.
    #[instrument(skip(self))]
    pub fn resolve<P: AsRef<Path> + std::fmt::Debug>(&self, path: P) -> Result<ResolvedPath> {
        let path = path.as_ref();

        let file_name = match path.components().next_back() {
            Some(Component::Normal(name)) => name.to_os_string(),
            _ => {
                return Err(VackupError::precondition(format!(
                    "{} does not name a file",
                    path.display()
                )));
            }
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let dir = fs::canonicalize(parent).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => VackupError::precondition(format!(
                "Directory {} does not exist",
                parent.display()
            )),
            _ => VackupError::file_system("resolve", parent, e),
        })?;

        // `-v SOURCE:TARGET` has no escaping for the separator
        if dir.to_string_lossy().contains(':') {
            return Err(VackupError::precondition(format!(
                "Directory {} contains ':' and cannot be mounted",
                dir.display()
            )));
        }

        debug!("Resolved {} to {} + {:?}", path.display(), dir.display(), file_name);
        Ok(ResolvedPath { dir, file_name })
    }

    /// Check that `path` exists, is not a directory, and can be opened for reading
    #[instrument(skip(self))]
    pub fn check_readable_file<P: AsRef<Path> + std::fmt::Debug>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VackupError::precondition(format!(
                    "File {} does not exist",
                    path.display()
                )));
            }
            Err(e) => return Err(VackupError::file_system("stat", path, e)),
        };

        if metadata.is_dir() {
            return Err(VackupError::precondition(format!(
                "File {} is a directory",
                path.display()
            )));
        }

        File::open(path).map_err(|e| {
            debug!("Open failed for {}: {}", path.display(), e);
            VackupError::precondition(format!("File {} is not readable", path.display()))
        })?;

        Ok(())
    }

    /// Check if a path exists and is a directory
    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().is_dir()
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}
