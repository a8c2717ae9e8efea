//! Command-line interface module
//!
//! Provides argument parsing and command execution.

pub mod args;
pub mod commands;

pub use args::{failure_script_from, parse_args_from, Args, Command, Invocation};
pub use commands::execute_command;
