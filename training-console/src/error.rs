use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Training stopped with error: {0}")]
    TrainingFailed(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Failures of the request itself rather than an answer from the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_) | Self::Decode(_))
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ConsoleError::Decode(error.to_string())
        } else {
            ConsoleError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(error: serde_json::Error) -> Self {
        ConsoleError::Decode(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ConsoleError {
    fn from(error: validator::ValidationErrors) -> Self {
        ConsoleError::Validation(error.to_string())
    }
}

impl From<config::ConfigError> for ConsoleError {
    fn from(error: config::ConfigError) -> Self {
        ConsoleError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
