use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Unsupported image format: {0} (expected jpg, jpeg or png)")]
    UnsupportedFormat(String),

    #[error("Invalid quality level: {0} (must be between 0 and 100)")]
    InvalidQuality(u32),

    #[error("No variant for quality level {0}%")]
    UnknownQuality(u8),

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
