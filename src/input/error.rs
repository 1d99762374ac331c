use thiserror::Error;

/// A specialized `Result` type for synthetic input operations.
pub type InputResult<T> = Result<T, InputError>;

/// The error type for pointer driving and the global input hook.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to open input connection: {description}")]
    Init { description: String },

    #[error("Click at ({x}, {y}) failed: {description}")]
    Click { x: i32, y: i32, description: String },

    #[error("Global input listener failed: {description}")]
    Listener { description: String },
}
