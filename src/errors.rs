use rustyline::error::ReadlineError;
use subfox_config::ConfigError;
use subfox_core::CoreError;
use thiserror::Error;

/// Failures that stop the shell itself. Per-command failures are reported
/// and the loop continues.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
    #[error("Line editor failed: {0}")]
    Readline(#[from] ReadlineError),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}
