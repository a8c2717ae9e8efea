//! Error types for vackup
//!
//! Every error remembers the source line it was raised on. That line, together
//! with the exit code, is what the failure hook receives.

use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vackup
#[derive(Error, Debug)]
pub enum VackupError {
    /// Missing, empty or unrecognized command line arguments
    #[error("{message}")]
    Usage { message: String, line: u32 },

    /// A volume or file is not in the state the command requires
    #[error("{message}")]
    Precondition { message: String, line: u32 },

    /// A container engine step failed
    #[error("{message}{}", reason_suffix(.reason))]
    Engine {
        message: String,
        reason: Option<String>,
        exit_code: Option<i32>,
        line: u32,
    },

    /// Process execution errors
    #[error("Process error: {command} failed")]
    Process {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        line: u32,
    },

    /// File system operation errors
    #[error("File system error: {operation} failed on {path}")]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
        line: u32,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String, line: u32 },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

#[track_caller]
fn caller_line() -> u32 {
    Location::caller().line()
}

impl VackupError {
    /// Create a new usage error
    #[track_caller]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            line: caller_line(),
        }
    }

    /// Create a new precondition error
    #[track_caller]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            line: caller_line(),
        }
    }

    /// Wrap a failed engine invocation, keeping its exit code and whatever
    /// the engine wrote to stderr
    #[track_caller]
    pub fn engine(message: impl Into<String>, cause: &Self) -> Self {
        let reason = match cause {
            Self::Process { stderr, .. } => {
                let lines: Vec<&str> = stderr
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect();
                (!lines.is_empty()).then(|| lines.join("; "))
            }
            _ => None,
        };

        Self::Engine {
            message: message.into(),
            reason,
            exit_code: cause.external_exit_code(),
            line: caller_line(),
        }
    }

    /// Create a new process error
    #[track_caller]
    pub fn process(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            line: caller_line(),
        }
    }

    /// Create a new file system error
    #[track_caller]
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
            line: caller_line(),
        }
    }

    /// Create a new configuration error
    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            line: caller_line(),
        }
    }

    /// Source line the error was raised on
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::Usage { line, .. }
            | Self::Precondition { line, .. }
            | Self::Engine { line, .. }
            | Self::Process { line, .. }
            | Self::FileSystem { line, .. }
            | Self::Config { line, .. } => *line,
        }
    }

    /// Process exit code for this error
    ///
    /// Engine and process failures pass the external command's status through;
    /// everything else exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.external_exit_code()
            .filter(|code| *code != 0)
            .unwrap_or(1)
    }

    const fn external_exit_code(&self) -> Option<i32> {
        match self {
            Self::Engine { exit_code, .. } | Self::Process { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, VackupError>;
