//! CLI, configuration, sync pipeline and calendar publishing
//!
//! This crate provides the `untiscal` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod publish;
pub mod secret;
pub mod sync;

pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use error::{SyncError, SyncResult};
pub use sync::{RawInput, SyncPlan, build_calendar};
