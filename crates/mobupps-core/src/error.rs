use mobupps_client::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Bad user input, reported before any request is sent
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Text shown to the user; network failures carry a retry suggestion.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
