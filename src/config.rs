//! Configuration management for vackup
//!
//! The process environment is read here and nowhere else. Command line options
//! override the environment.

use crate::{cli::Args, error::VackupError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the failure hook executable
pub const FAILURE_SCRIPT_ENV: &str = "VACKUP_FAILURE_SCRIPT";
/// Environment variable naming the container engine CLI
pub const ENGINE_ENV: &str = "VACKUP_ENGINE";
/// Environment variable naming the helper image
pub const HELPER_IMAGE_ENV: &str = "VACKUP_HELPER_IMAGE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Enable debug logging
    pub debug: bool,
    /// Container engine configuration
    pub engine: EngineConfig,
    /// Executable run as `script LINE EXIT_CODE` on failure
    pub failure_script: Option<PathBuf>,
}

/// Container engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine CLI program (docker, podman, or a path)
    pub program: String,
    /// Image used for helper containers
    pub helper_image: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            helper_image: "busybox".to_string(),
        }
    }
}

impl Config {
    /// Create configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let defaults = EngineConfig::default();

        Self {
            debug: false,
            engine: EngineConfig {
                program: var(ENGINE_ENV).unwrap_or(defaults.program),
                helper_image: var(HELPER_IMAGE_ENV).unwrap_or(defaults.helper_image),
            },
            failure_script: var(FAILURE_SCRIPT_ENV).map(PathBuf::from),
        }
    }

    /// Apply command line options on top of this configuration
    pub fn with_args(mut self, args: &Args) -> Result<Self, VackupError> {
        self.debug = args.debug;

        if let Some(program) = &args.engine {
            self.engine.program.clone_from(program);
        }
        if let Some(image) = &args.helper_image {
            self.engine.helper_image.clone_from(image);
        }
        self = self.with_failure_script(args.failure_script.clone());

        self.validate()?;
        Ok(self)
    }

    /// Replace the failure hook when `script` is given
    #[must_use]
    pub fn with_failure_script(mut self, script: Option<PathBuf>) -> Self {
        if script.is_some() {
            self.failure_script = script;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VackupError> {
        if self.engine.program.trim().is_empty() {
            return Err(VackupError::config("container engine program is empty"));
        }

        if self.engine.helper_image.trim().is_empty() {
            return Err(VackupError::config("helper image name is empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_env_with(lookup_from(&[]));

        assert!(!config.debug);
        assert_eq!(config.engine.program, "docker");
        assert_eq!(config.engine.helper_image, "busybox");
        assert!(config.failure_script.is_none());
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = Config::from_env_with(lookup_from(&[
            (FAILURE_SCRIPT_ENV, "/usr/local/bin/notify"),
            (ENGINE_ENV, "podman"),
            (HELPER_IMAGE_ENV, "alpine:3"),
        ]));

        assert_eq!(config.engine.program, "podman");
        assert_eq!(config.engine.helper_image, "alpine:3");
        assert_eq!(
            config.failure_script,
            Some(PathBuf::from("/usr/local/bin/notify"))
        );
    }

    #[test]
    fn test_empty_environment_values_are_ignored() {
        let config = Config::from_env_with(lookup_from(&[
            (FAILURE_SCRIPT_ENV, ""),
            (ENGINE_ENV, ""),
        ]));

        assert!(config.failure_script.is_none());
        assert_eq!(config.engine.program, "docker");
    }

    #[test]
    fn test_args_override_environment() {
        let env = Config::from_env_with(lookup_from(&[(ENGINE_ENV, "podman")]));
        let args = Args::try_parse_from([
            "vackup",
            "--debug",
            "--engine",
            "nerdctl",
            "--failure-script",
            "/tmp/hook",
            "export",
            "data",
            "data.tgz",
        ])
        .unwrap();

        let config = env.with_args(&args).unwrap();

        assert!(config.debug);
        assert_eq!(config.engine.program, "nerdctl");
        assert_eq!(config.engine.helper_image, "busybox");
        assert_eq!(config.failure_script, Some(PathBuf::from("/tmp/hook")));
    }

    #[test]
    fn test_failure_script_keeps_environment_when_absent() {
        let env = Config::from_env_with(lookup_from(&[(FAILURE_SCRIPT_ENV, "/env/hook")]));

        let kept = env.clone().with_failure_script(None);
        assert_eq!(kept.failure_script, Some(PathBuf::from("/env/hook")));

        let replaced = env.with_failure_script(Some(PathBuf::from("/flag/hook")));
        assert_eq!(replaced.failure_script, Some(PathBuf::from("/flag/hook")));
    }

    #[test]
    fn test_default_matches_empty_environment() {
        let config = Config::default();

        assert!(!config.debug);
        assert_eq!(config.engine.program, "docker");
        assert!(config.failure_script.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_engine() {
        let mut config = Config::default();
        config.engine.program = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, VackupError::Config { .. }));
    }
}
