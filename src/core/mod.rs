//! Core functionality for volume transfers
//!
//! Contains the container engine adapter, the four transfer operations, and
//! failure reporting.

pub mod engine;
pub mod reporter;
pub mod transfer;

pub use engine::{ContainerEngine, ContainerId, ContainerSpec};
pub use reporter::{FailureHook, FailureReporter, ScriptHook};
pub use transfer::VolumeTransfer;
