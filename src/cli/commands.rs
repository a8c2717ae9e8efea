//! Command implementations for the CLI

use crate::{cli::Command, config::Config, core::transfer::VolumeTransfer};
use tracing::{debug, instrument};

/// Execute the appropriate command based on CLI arguments
///
/// Returns the confirmation line printed on success.
#[instrument(skip(config))]
pub fn execute_command(config: &Config, command: &Command) -> anyhow::Result<String> {
    debug!("Configuration: {:?}", config);
    let transfer = VolumeTransfer::new(config.clone());

    let confirmation = match command {
        Command::Export { volume, file } => {
            transfer.export(volume, file)?;
            format!("Successfully tar'ed volume {volume} into file {file}")
        }
        Command::Import { file, volume } => {
            transfer.import(file, volume)?;
            format!("Successfully unpacked {file} into volume {volume}")
        }
        Command::Save { volume, image } => {
            transfer.save(volume, image)?;
            format!("Successfully copied volume {volume} into image {image}, under /volume-data")
        }
        Command::Load { image, volume } => {
            transfer.load(image, volume)?;
            format!("Successfully copied /volume-data from {image} into volume {volume}")
        }
    };

    Ok(confirmation)
}
