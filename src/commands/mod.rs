//! Command dispatch and handlers.

pub mod check_config;
pub mod sync;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Sync { config, project } => sync::run(config, project.as_deref()),
        Command::CheckConfig { config } => check_config::run(config),
    }
}
