use thiserror::Error;

use crate::input::InputError;

/// A specialized `Result` type for clicker operations.
pub type ClickerResult<T> = Result<T, ClickerError>;

/// Failures raised while grabbing the screen.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No monitor available for screen capture")]
    NoMonitor,

    #[error("Screen capture failed: {description}")]
    Backend { description: String },

    #[error("Screen capture is not supported here: {description}")]
    Unsupported { description: String },

    /// The blocking capture task panicked or was cancelled.
    #[error("Screen capture worker failed: {description}")]
    Worker { description: String },
}

impl CaptureError {
    /// Transient failures are treated as a missed poll; the rest abort the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::Backend { .. })
    }
}

/// The error type for the image clicker engine.
#[derive(Debug, Error)]
pub enum ClickerError {
    #[error("Image clicker is already running")]
    AlreadyRunning,

    #[error("Capture failed: {source}")]
    Capture {
        #[from]
        source: CaptureError,
    },

    #[error("Click failed: {source}")]
    Input {
        #[from]
        source: InputError,
    },
}
