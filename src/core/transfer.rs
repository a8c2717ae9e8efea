//! Volume transfer operations
//!
//! Export, import, save and load. Each one validates its inputs, makes sure the
//! volume is in the right state, then hands the actual copying to a helper
//! container.

use crate::{
    config::Config,
    core::engine::{ContainerEngine, ContainerSpec},
    error::{Result, VackupError},
    utils::{fs::PathResolver, process::ProcessRunner},
};
use tracing::{debug, info, instrument, warn};

/// Where the volume is mounted for export and import
pub const VOLUME_MOUNT: &str = "/vackup-volume";
/// Where the host directory holding the tarball is mounted
pub const HOST_MOUNT: &str = "/vackup";
/// Where the volume is mounted for save and load
pub const SAVE_MOUNT: &str = "/mount-volume";
/// Directory inside saved images holding the volume contents
pub const IMAGE_DATA_DIR: &str = "/volume-data";

/// Copies data between volumes, tarballs and images
pub struct VolumeTransfer {
    config: Config,
    engine: ContainerEngine,
    resolver: PathResolver,
    process_runner: ProcessRunner,
}

impl VolumeTransfer {
    /// Create a new transfer with the given configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            engine: ContainerEngine::new(&config.engine, config.debug),
            resolver: PathResolver::new(),
            process_runner: ProcessRunner::new(config.debug),
            config,
        }
    }

    /// Write a gzip'ed tarball of `volume` to `file`
    ///
    /// The volume must already exist. The tarball is handed back to the
    /// invoking user, since the helper container runs as root.
    #[instrument(skip(self))]
    pub fn export(&self, volume: &str, file: &str) -> Result<()> {
        require("VOLUME", volume)?;
        require("FILE", file)?;
        self.engine.ensure_available()?;

        if !self.volume_exists(volume)? {
            return Err(VackupError::precondition(format!(
                "Volume {volume} does not exist"
            )));
        }

        if self.resolver.is_dir(file) {
            return Err(VackupError::precondition(format!(
                "File {file} is a directory"
            )));
        }

        let target = self.resolver.resolve(file)?;
        let tar_flags = if self.config.debug { "-zcvf" } else { "-zcf" };

        let mut script = format!("tar {tar_flags} \"{HOST_MOUNT}/$1\" {VOLUME_MOUNT}");
        let mut script_args = vec![target.file_name_arg()];
        match self.invoking_owner() {
            Some((uid, gid)) => {
                script.push_str(&format!(" && chown \"$2:$3\" \"{HOST_MOUNT}/$1\""));
                script_args.push(uid);
                script_args.push(gid);
            }
            None => warn!("Could not determine the invoking user; {file} will be owned by root"),
        }

        let mut command = vec!["sh".to_string(), "-c".to_string(), script, "vackup".to_string()];
        command.extend(script_args);

        let spec = ContainerSpec::new(&self.config.engine.helper_image)
            .remove_on_exit()
            .mount(volume, VOLUME_MOUNT)
            .mount(target.dir_arg(), HOST_MOUNT)
            .command(command);

        info!("Archiving volume {} into {}", volume, target.full_path().display());
        self.engine.run(&spec).map_err(|e| {
            debug!("Backup container failed: {}", e);
            VackupError::engine(
                format!("Failed to start {} backup container", self.config.engine.helper_image),
                &e,
            )
        })
    }

    /// Extract the gzip'ed tarball `file` into `volume`, creating it if needed
    #[instrument(skip(self))]
    pub fn import(&self, file: &str, volume: &str) -> Result<()> {
        require("FILE", file)?;
        require("VOLUME", volume)?;
        self.resolver.check_readable_file(file)?;
        self.engine.ensure_available()?;

        let source = self.resolver.resolve(file)?;
        self.ensure_volume(volume)?;

        let tar_flags = if self.config.debug { "-xzvf" } else { "-xzf" };
        let spec = ContainerSpec::new(&self.config.engine.helper_image)
            .remove_on_exit()
            .mount(volume, VOLUME_MOUNT)
            .mount(source.dir_arg(), HOST_MOUNT)
            .command([
                "tar".to_string(),
                tar_flags.to_string(),
                format!("{HOST_MOUNT}/{}", source.file_name_arg()),
                "-C".to_string(),
                "/".to_string(),
            ]);

        info!("Extracting {} into volume {}", source.full_path().display(), volume);
        self.engine.run(&spec).map_err(|e| {
            debug!("Restore container failed: {}", e);
            VackupError::engine(
                format!("Failed to start {} container", self.config.engine.helper_image),
                &e,
            )
        })
    }

    /// Commit the contents of `volume` as `image`, under [`IMAGE_DATA_DIR`]
    ///
    /// The helper container is created first so its id is known before it
    /// runs; that id is what gets committed and removed.
    #[instrument(skip(self))]
    pub fn save(&self, volume: &str, image: &str) -> Result<()> {
        require("VOLUME", volume)?;
        require("IMAGE", image)?;
        self.engine.ensure_available()?;

        if !self.volume_exists(volume)? {
            return Err(VackupError::precondition(format!(
                "Volume {volume} does not exist"
            )));
        }

        let spec = ContainerSpec::new(&self.config.engine.helper_image)
            .mount(volume, SAVE_MOUNT)
            .command([
                "cp".to_string(),
                "-Rp".to_string(),
                format!("{SAVE_MOUNT}/."),
                format!("{IMAGE_DATA_DIR}/"),
            ]);

        let helper = &self.config.engine.helper_image;
        let container = self.engine.create_container(&spec).map_err(|e| {
            debug!("Container creation failed: {}", e);
            VackupError::engine(format!("Failed to create {helper} container"), &e)
        })?;

        info!("Copying volume {} in container {}", volume, container);
        let outcome = self
            .engine
            .start_attached(&container)
            .map_err(|e| {
                debug!("Copy container failed: {}", e);
                VackupError::engine(format!("Failed to start {helper} container"), &e)
            })
            .and_then(|()| {
                let message = format!("saving volume {volume} to {IMAGE_DATA_DIR}");
                self.engine.commit(&container, image, &message).map_err(|e| {
                    debug!("Commit failed: {}", e);
                    VackupError::engine(
                        format!("Failed to commit container {container} as image {image}"),
                        &e,
                    )
                })
            });

        match (outcome, self.engine.remove_container(&container)) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(VackupError::engine(
                format!("Failed to remove container {container}"),
                &e,
            )),
            (Err(err), removal) => {
                if let Err(e) = removal {
                    warn!("Failed to remove container {}: {}", container, e);
                }
                Err(err)
            }
        }
    }

    /// Copy [`IMAGE_DATA_DIR`] from `image` into `volume`, creating it if needed
    #[instrument(skip(self))]
    pub fn load(&self, image: &str, volume: &str) -> Result<()> {
        require("IMAGE", image)?;
        require("VOLUME", volume)?;
        self.engine.ensure_available()?;

        self.ensure_volume(volume)?;

        let spec = ContainerSpec::new(image)
            .remove_on_exit()
            .mount(volume, SAVE_MOUNT)
            .command([
                "cp".to_string(),
                "-Rp".to_string(),
                format!("{IMAGE_DATA_DIR}/."),
                format!("{SAVE_MOUNT}/"),
            ]);

        info!("Copying {} from {} into volume {}", IMAGE_DATA_DIR, image, volume);
        self.engine.run(&spec).map_err(|e| {
            debug!("Load container failed: {}", e);
            VackupError::engine(format!("Failed to start container from {image}"), &e)
        })
    }

    fn volume_exists(&self, volume: &str) -> Result<bool> {
        self.engine.volume_exists(volume).map_err(|e| {
            VackupError::engine(
                format!("Failed to query volume {volume} with {}", self.engine.program()),
                &e,
            )
        })
    }

    /// Create `volume` when it is missing; restoring never requires pre-provisioning
    fn ensure_volume(&self, volume: &str) -> Result<()> {
        if self.volume_exists(volume)? {
            return Ok(());
        }

        warn!("Volume {} does not exist, creating it", volume);
        self.engine
            .create_volume(volume)
            .map_err(|e| VackupError::engine(format!("Failed to create volume {volume}"), &e))
    }

    /// `uid`/`gid` of the invoking user, if they can be determined
    fn invoking_owner(&self) -> Option<(String, String)> {
        let lookup = |flag: &str| {
            self.process_runner
                .run_command_with_output("id", &[flag])
                .map(|result| result.stdout.trim().to_string())
                .ok()
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        };

        Some((lookup("-u")?, lookup("-g")?))
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VackupError::usage(format!(
            "error: {name} must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn transfer(program: &str) -> VolumeTransfer {
        VolumeTransfer::new(Config {
            debug: false,
            engine: EngineConfig {
                program: program.to_string(),
                helper_image: "busybox".to_string(),
            },
            failure_script: None,
        })
    }

    #[test]
    fn test_empty_arguments_are_usage_errors() {
        let transfer = transfer("true");

        assert!(matches!(
            transfer.export("", "data.tgz"),
            Err(VackupError::Usage { .. })
        ));
        assert!(matches!(
            transfer.import("data.tgz", " "),
            Err(VackupError::Usage { .. })
        ));
        assert!(matches!(
            transfer.save("data", ""),
            Err(VackupError::Usage { .. })
        ));
        assert!(matches!(
            transfer.load("", "data"),
            Err(VackupError::Usage { .. })
        ));
    }

    #[test]
    fn test_export_requires_existing_volume() {
        // `false` answers every volume inspect with a non-zero exit
        let err = transfer("false").export("data", "data.tgz").unwrap_err();

        assert!(matches!(err, VackupError::Precondition { .. }));
        assert_eq!(err.to_string(), "Volume data does not exist");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_save_requires_existing_volume() {
        let err = transfer("false").save("data", "img").unwrap_err();
        assert_eq!(err.to_string(), "Volume data does not exist");
    }

    #[test]
    fn test_import_checks_file_before_engine() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = temp_dir.path().to_string_lossy().to_string();

        // The engine is never reached, so a missing one does not matter
        let err = transfer("nonexistent_engine_12345")
            .import(&dir, "data")
            .unwrap_err();

        assert_eq!(err.to_string(), format!("File {dir} is a directory"));
    }

    #[test]
    fn test_missing_engine_is_reported() {
        let err = transfer("nonexistent_engine_12345")
            .load("img", "data")
            .unwrap_err();
        assert!(err.to_string().contains("nonexistent_engine_12345"));
    }

    #[test]
    fn test_load_fails_when_volume_cannot_be_created() {
        // Every engine call exits non-zero: the volume looks absent and
        // creating it fails
        let err = transfer("false").load("img", "data").unwrap_err();

        assert_eq!(err.to_string(), "Failed to create volume data");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_save_with_silent_engine_fails_to_create_container() {
        // `true` reports the volume as present but prints no container id
        let err = transfer("true").save("data", "img").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create busybox container: engine printed no container id"
        );
    }

    #[test]
    fn test_invoking_owner_is_numeric() {
        if let Some((uid, gid)) = transfer("true").invoking_owner() {
            assert!(uid.parse::<u32>().is_ok());
            assert!(gid.parse::<u32>().is_ok());
        }
    }
}
