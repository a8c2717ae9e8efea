//! Command-line argument parsing and routing

use crate::error::VackupError;
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

const AFTER_HELP: &str = "\
Examples:
  vackup export my-volume backup.tar.gz
  vackup import backup.tar.gz my-volume
  vackup save my-volume my-volume-image:latest
  vackup load my-volume-image:latest my-volume

Set VACKUP_FAILURE_SCRIPT to an executable to have it run as
`script LINE EXIT_CODE` whenever a command fails.";

/// vackup - back up and restore Docker volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "vackup", arg_required_else_help = true, after_help = AFTER_HELP)]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Container engine CLI to invoke [env: VACKUP_ENGINE] [default: docker]
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Image used for helper containers [env: VACKUP_HELPER_IMAGE] [default: busybox]
    #[arg(long, global = true, value_name = "IMAGE")]
    pub helper_image: Option<String>,

    /// Executable run as `script LINE EXIT_CODE` on failure [env: VACKUP_FAILURE_SCRIPT]
    #[arg(long, global = true, value_name = "PATH")]
    pub failure_script: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a gzip'ed tarball from a volume
    Export {
        /// Volume to back up
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        volume: String,
        /// Tarball to write
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        file: String,
    },

    /// Extract a gzip'ed tarball into a volume, creating the volume if needed
    Import {
        /// Tarball to read
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        file: String,
        /// Volume to restore into
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        volume: String,
    },

    /// Copy volume contents into a new image under /volume-data
    Save {
        /// Volume to copy
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        volume: String,
        /// Image to commit
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        image: String,
    },

    /// Copy /volume-data from an image into a volume, creating the volume if needed
    Load {
        /// Image holding /volume-data
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        image: String,
        /// Volume to restore into
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        volume: String,
    },
}

/// Outcome of routing the raw argument list
#[derive(Debug)]
pub enum Invocation {
    /// Help or version text for stdout; the process exits successfully
    Info(String),
    /// A command to execute
    Run(Args),
}

/// Parse an explicit argument list (first item is the program name)
pub fn parse_args_from<I, T>(args: I) -> Result<Invocation, VackupError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => Ok(Invocation::Run(args)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Ok(Invocation::Info(e.render().to_string()))
            }
            _ => Err(VackupError::usage(e.render().to_string())),
        },
    }
}

/// Pick `--failure-script` out of an argument list that may not parse
///
/// Lets usage errors reach the hook named on the command line.
pub fn failure_script_from<I, T>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Args::command()
        .ignore_errors(true)
        .try_get_matches_from(args)
        .ok()?;

    matches
        .try_get_one::<PathBuf>("failure_script")
        .ok()
        .flatten()
        .cloned()
}
