//! Process execution utilities
//!
//! Runs the container engine and the failure hook as blocking child processes.

use crate::error::{Result, VackupError};
use std::env;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument};

/// Utility for running external processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    debug: bool,
}

/// Result of a process execution
#[derive(Debug)]
pub struct ProcessResult {
    /// Exit status code
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl ProcessRunner {
    /// Create a new process runner
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Whether debug output was requested
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Run a command with arguments, inheriting stdout/stderr
    ///
    /// The command line is echoed at info level, or logged at debug level
    /// when debug output was requested.
    #[instrument(skip(self))]
    pub fn run_command(&self, command: &str, args: &[&str]) -> Result<()> {
        let cmd_str = format_command(command, args);

        if self.debug {
            debug!("Running command: {}", cmd_str);
        } else {
            info!("+ {}", cmd_str);
        }

        let status = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| {
                VackupError::process(
                    cmd_str.clone(),
                    None,
                    String::new(),
                    format!("Failed to execute command: {e}"),
                )
            })?;

        // stderr already went to the terminal
        if !status.success() {
            debug!("Command failed with exit code: {:?}", status.code());
            return Err(VackupError::process(
                cmd_str,
                status.code(),
                String::new(),
                String::new(),
            ));
        }

        debug!("Command completed successfully");
        Ok(())
    }

    /// Run a command and capture its output
    #[instrument(skip(self))]
    pub fn run_command_with_output(&self, command: &str, args: &[&str]) -> Result<ProcessResult> {
        let cmd_str = format_command(command, args);
        debug!("+ {} (capturing output)", cmd_str);

        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                VackupError::process(
                    cmd_str.clone(),
                    None,
                    String::new(),
                    format!("Failed to execute command: {e}"),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        debug!(
            "Command finished: success={}, exit_code={:?}, stdout_len={}, stderr_len={}",
            output.status.success(),
            exit_code,
            stdout.len(),
            stderr.len()
        );

        if !output.status.success() {
            debug!("Command stderr: {}", stderr.trim_end());
            return Err(VackupError::process(cmd_str, exit_code, stdout, stderr));
        }

        Ok(ProcessResult {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Check if a command exists, either as a path or somewhere in PATH
    #[instrument(skip(self))]
    pub fn command_exists(&self, command: &str) -> bool {
        let exists = if command.contains(std::path::MAIN_SEPARATOR) {
            Path::new(command).is_file()
        } else {
            env::var_os("PATH").is_some_and(|paths| {
                env::split_paths(&paths).any(|dir| dir.join(command).is_file())
            })
        };

        debug!("Command '{}' exists: {}", command, exists);
        exists
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(false)
    }
}

fn format_command(command: &str, args: &[&str]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}
