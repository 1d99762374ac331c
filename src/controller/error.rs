use thiserror::Error;

use crate::config::ConfigError;

/// The error type for host-level orchestration.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Another worker owns the pointer right now.
    #[error("Cannot start: {task} is already running")]
    Busy { task: &'static str },

    #[error("Config error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

impl ControllerError {
    pub fn is_busy(&self) -> bool {
        matches!(self, ControllerError::Busy { .. })
    }
}
