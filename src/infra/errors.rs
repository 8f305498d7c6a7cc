// src/infra/errors.rs — Error types for fitdash

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitdashError {
    // Transport errors (retriable)
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    // Payload errors (not retriable)
    #[error("{message}")]
    Api { message: String },

    #[error("Failed to decode {widget} response: {message}")]
    Decode { widget: String, message: String },

    // User errors
    #[error("Unknown widget '{name}'")]
    UnknownWidget { name: String },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FitdashError {
    /// Timeouts, connection failures, 429 and 5xx are worth another attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            FitdashError::Network(_) => true,
            FitdashError::Http { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FitdashError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FitdashError::Http {
                status: status.as_u16(),
            };
        }
        FitdashError::Network(e.to_string())
    }
}
