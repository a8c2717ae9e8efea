//! Container engine adapter
//!
//! Thin wrapper over the engine CLI (`docker` by default). Each method is one
//! blocking invocation with a fixed argument template.

use crate::{
    config::EngineConfig,
    error::{Result, VackupError},
    utils::process::ProcessRunner,
};
use tracing::{debug, instrument};

/// Identifier printed by the engine for a created container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerId(String);

impl ContainerId {
    /// Identifier as passed back to the engine
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Description of a helper container invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    image: String,
    mounts: Vec<(String, String)>,
    command: Vec<String>,
    remove: bool,
}

impl ContainerSpec {
    /// Start a spec for a container running `image`
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Bind-mount a volume name or host directory at `target`
    #[must_use]
    pub fn mount(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.mounts.push((source.into(), target.into()));
        self
    }

    /// Remove the container once it exits
    #[must_use]
    pub fn remove_on_exit(mut self) -> Self {
        self.remove = true;
        self
    }

    /// Command run inside the container
    #[must_use]
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Engine arguments for `verb` (`run` or `create`)
    #[must_use]
    pub fn to_args(&self, verb: &str) -> Vec<String> {
        let mut args = vec![verb.to_string()];

        if self.remove {
            args.push("--rm".to_string());
        }

        for (source, target) in &self.mounts {
            args.push("-v".to_string());
            args.push(format!("{source}:{target}"));
        }

        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Runs engine commands through [`ProcessRunner`]
#[derive(Debug)]
pub struct ContainerEngine {
    program: String,
    process_runner: ProcessRunner,
}

impl ContainerEngine {
    /// Create an engine adapter for the configured program
    #[must_use]
    pub fn new(config: &EngineConfig, debug: bool) -> Self {
        Self {
            program: config.program.clone(),
            process_runner: ProcessRunner::new(debug),
        }
    }

    /// Engine program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Fail early when the engine program cannot be found
    pub fn ensure_available(&self) -> Result<()> {
        if self.process_runner.command_exists(&self.program) {
            Ok(())
        } else {
            Err(VackupError::precondition(format!(
                "Container engine '{}' not found",
                self.program
            )))
        }
    }

    /// Check whether a volume exists
    ///
    /// A non-zero `volume inspect` means the volume is absent. Failing to spawn
    /// the engine at all is an error.
    #[instrument(skip(self))]
    pub fn volume_exists(&self, name: &str) -> Result<bool> {
        match self.process_runner.run_command_with_output(
            &self.program,
            &["volume", "inspect", "--format", "{{.Name}}", name],
        ) {
            Ok(_) => Ok(true),
            Err(VackupError::Process {
                exit_code: Some(code),
                ..
            }) => {
                debug!("volume inspect {} exited with {}", name, code);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a named volume
    #[instrument(skip(self))]
    pub fn create_volume(&self, name: &str) -> Result<()> {
        self.process_runner
            .run_command_with_output(&self.program, &["volume", "create", name])
            .map(|_| ())
    }

    /// Run a container to completion, streaming its output
    #[instrument(skip(self))]
    pub fn run(&self, spec: &ContainerSpec) -> Result<()> {
        self.run_args(&spec.to_args("run"))
    }

    /// Create a container without starting it and return its id
    #[instrument(skip(self))]
    pub fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let args = spec.to_args("create");
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = self
            .process_runner
            .run_command_with_output(&self.program, &args)?;

        // Pull progress may precede the id on stdout
        let id = result
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .ok_or_else(|| {
                VackupError::process(
                    format!("{} {}", self.program, args.join(" ")),
                    result.exit_code,
                    result.stdout.clone(),
                    "engine printed no container id",
                )
            })?;

        debug!("Created container {}", id);
        Ok(ContainerId(id.to_string()))
    }

    /// Start a created container and wait for it to exit
    #[instrument(skip(self))]
    pub fn start_attached(&self, id: &ContainerId) -> Result<()> {
        self.run_args(&["start".to_string(), "--attach".to_string(), id.0.clone()])
    }

    /// Commit a container's filesystem as a new image
    #[instrument(skip(self))]
    pub fn commit(&self, id: &ContainerId, image: &str, message: &str) -> Result<()> {
        self.process_runner
            .run_command_with_output(&self.program, &["commit", "-m", message, id.as_str(), image])
            .map(|_| ())
    }

    /// Remove a stopped container
    #[instrument(skip(self))]
    pub fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.process_runner
            .run_command_with_output(&self.program, &["container", "rm", id.as_str()])
            .map(|_| ())
    }

    fn run_args(&self, args: &[String]) -> Result<()> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.process_runner.run_command(&self.program, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(program: &str) -> ContainerEngine {
        ContainerEngine::new(
            &EngineConfig {
                program: program.to_string(),
                helper_image: "busybox".to_string(),
            },
            false,
        )
    }

    #[test]
    fn test_run_args_with_mounts() {
        let spec = ContainerSpec::new("busybox")
            .remove_on_exit()
            .mount("data", "/vackup-volume")
            .mount("/home/me", "/vackup")
            .command(["tar", "-zcf", "/vackup/data.tgz", "/vackup-volume"]);

        assert_eq!(
            spec.to_args("run"),
            vec![
                "run",
                "--rm",
                "-v",
                "data:/vackup-volume",
                "-v",
                "/home/me:/vackup",
                "busybox",
                "tar",
                "-zcf",
                "/vackup/data.tgz",
                "/vackup-volume",
            ]
        );
    }

    #[test]
    fn test_create_args_keep_container() {
        let spec = ContainerSpec::new("busybox")
            .mount("data", "/mount-volume")
            .command(["cp", "-Rp", "/mount-volume/.", "/volume-data/"]);

        let args = spec.to_args("create");
        assert_eq!(args[0], "create");
        assert!(!args.contains(&"--rm".to_string()));
    }

    #[test]
    fn test_volume_exists_follows_exit_status() {
        assert!(engine("true").volume_exists("data").unwrap());
        assert!(!engine("false").volume_exists("data").unwrap());
    }

    #[test]
    fn test_volume_exists_errors_when_engine_missing() {
        let engine = engine("nonexistent_engine_12345");
        assert!(engine.volume_exists("data").is_err());
        assert!(matches!(
            engine.ensure_available(),
            Err(VackupError::Precondition { .. })
        ));
    }

    #[test]
    fn test_create_container_reads_last_stdout_line() {
        // `echo` prints its arguments back as one line
        let id = engine("echo")
            .create_container(&ContainerSpec::new("f00dcafe"))
            .unwrap();
        assert_eq!(id.as_str(), "create f00dcafe");
    }

    #[test]
    fn test_create_container_without_output_fails() {
        let result = engine("true").create_container(&ContainerSpec::new("busybox"));
        assert!(result.is_err());
    }
}
