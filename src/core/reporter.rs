//! Failure reporting
//!
//! Every failed invocation ends here: the error is printed as a single line,
//! the optional failure hook is notified, and the exit code is chosen.

use crate::{config::Config, error::VackupError, utils::process::ProcessRunner};
use std::panic::Location;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Notified once per failed invocation
pub trait FailureHook {
    /// Called with the line the failure was raised on and the exit code
    fn notify(&self, line: u32, exit_code: i32) -> crate::error::Result<()>;
}

/// Runs an external executable as `script LINE EXIT_CODE`
#[derive(Debug)]
pub struct ScriptHook {
    script: PathBuf,
    process_runner: ProcessRunner,
}

impl ScriptHook {
    /// Create a hook for `script`
    pub fn new(script: impl Into<PathBuf>, debug: bool) -> Self {
        Self {
            script: script.into(),
            process_runner: ProcessRunner::new(debug),
        }
    }
}

impl FailureHook for ScriptHook {
    #[instrument(skip(self))]
    fn notify(&self, line: u32, exit_code: i32) -> crate::error::Result<()> {
        let script = self.script.to_string_lossy();
        self.process_runner
            .run_command(&script, &[&line.to_string(), &exit_code.to_string()])
    }
}

/// Maps errors to output, hook notifications and exit codes
pub struct FailureReporter {
    hook: Option<Box<dyn FailureHook>>,
}

impl FailureReporter {
    /// Create a reporter with an optional hook
    #[must_use]
    pub fn new(hook: Option<Box<dyn FailureHook>>) -> Self {
        Self { hook }
    }

    /// Create a reporter using the configured failure script, if any
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let hook = config.failure_script.as_ref().map(|script| {
            Box::new(ScriptHook::new(script.clone(), config.debug)) as Box<dyn FailureHook>
        });
        Self::new(hook)
    }

    /// Report a failure and return the exit code to terminate with
    ///
    /// Errors that are not a [`VackupError`] are attributed to the caller's line.
    #[track_caller]
    pub fn report(&self, error: &anyhow::Error) -> i32 {
        let caller = Location::caller().line();
        eprintln!("{}", render(error));

        for cause in error.chain().skip(1) {
            debug!("caused by: {}", cause);
        }

        let (line, exit_code) = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<VackupError>())
            .map_or((caller, 1), |e| (e.line(), e.exit_code()));

        if let Some(hook) = &self.hook {
            // The hook's own outcome never changes the exit code
            if let Err(e) = hook.notify(line, exit_code) {
                debug!("Failure hook did not complete: {}", e);
            }
        }

        exit_code
    }
}

/// Render an error as the single line printed to stderr
#[must_use]
pub fn render(error: &anyhow::Error) -> String {
    match error.downcast_ref::<VackupError>() {
        Some(VackupError::Usage { message, .. }) => message.trim_end().to_string(),
        _ => format!("Error: {error:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct RecordingHook {
        calls: Rc<RefCell<Vec<(u32, i32)>>>,
        fail: bool,
    }

    impl FailureHook for RecordingHook {
        fn notify(&self, line: u32, exit_code: i32) -> crate::error::Result<()> {
            self.calls.borrow_mut().push((line, exit_code));
            if self.fail {
                Err(VackupError::process("hook", Some(9), "", ""))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_report_without_hook_returns_exit_code() {
        let reporter = FailureReporter::new(None);
        let cause = VackupError::process("docker run", Some(125), "", "");
        let error = anyhow::Error::new(VackupError::engine("Failed to start busybox container", &cause));

        assert_eq!(reporter.report(&error), 125);
    }

    #[test]
    fn test_report_invokes_hook_with_line_and_code() {
        let hook = RecordingHook::default();
        let reporter = FailureReporter::new(Some(Box::new(hook.clone())));

        let line = line!() + 1;
        let error = anyhow::Error::new(VackupError::precondition("Volume data does not exist"));
        let code = reporter.report(&error);

        assert_eq!(code, 1);
        assert_eq!(*hook.calls.borrow(), vec![(line, 1)]);
    }

    #[test]
    fn test_hook_failure_does_not_change_exit_code() {
        let hook = RecordingHook {
            fail: true,
            ..RecordingHook::default()
        };
        let reporter = FailureReporter::new(Some(Box::new(hook.clone())));

        let error = anyhow::Error::new(VackupError::usage("error: missing FILE"));
        assert_eq!(reporter.report(&error), 1);
        assert_eq!(hook.calls.borrow().len(), 1);
    }

    #[test]
    fn test_foreign_errors_use_caller_line() {
        let hook = RecordingHook::default();
        let reporter = FailureReporter::new(Some(Box::new(hook.clone())));

        let error = anyhow::anyhow!("logging setup failed");
        let line = line!() + 1;
        let code = reporter.report(&error);

        assert_eq!(code, 1);
        assert_eq!(*hook.calls.borrow(), vec![(line, 1)]);
    }

    #[test]
    fn test_context_is_looked_through() {
        let reporter = FailureReporter::new(None);
        let cause = VackupError::process("docker commit", Some(2), "", "");
        let error = anyhow::Error::new(VackupError::engine("Failed to commit", &cause))
            .context("save failed");

        assert_eq!(reporter.report(&error), 2);
    }

    #[test]
    fn test_render_prefixes_errors() {
        let error = anyhow::Error::new(VackupError::precondition("File a.tgz is a directory"));
        assert_eq!(render(&error), "Error: File a.tgz is a directory");

        let usage = anyhow::Error::new(VackupError::usage("error: unrecognized subcommand\n"));
        assert_eq!(render(&usage), "error: unrecognized subcommand");
    }

    #[cfg(unix)]
    #[test]
    fn test_script_hook_passes_arguments() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let out = temp_dir.path().join("hook.out");
        let script = temp_dir.path().join("hook.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$1 $2\" > '{}'\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        ScriptHook::new(&script, false).notify(42, 3).unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "42 3");
    }
}
