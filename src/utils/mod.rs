//! Utility modules for common functionality
//!
//! Provides external process execution and host path handling.

pub mod fs;
pub mod process;

pub use fs::{PathResolver, ResolvedPath};
pub use process::ProcessRunner;
