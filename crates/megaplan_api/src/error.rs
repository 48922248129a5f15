//! Error model used by Megaplan API client operations.

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MegaplanError>;

/// Failure of a call to the Megaplan API: a non-success HTTP status, rejected credentials, a timeout, a broken connection, an undecodable payload or a local file problem.
#[derive(Debug, Error)]
pub enum MegaplanError {
    #[error("http {status}: {message}")]
    Http { status: StatusCode, message: String },
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl MegaplanError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        MegaplanError::Http {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for MegaplanError {
    /// Converts reqwest errors into semantic MegaplanError variants.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MegaplanError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            MegaplanError::Http {
                status,
                message: err.to_string(),
            }
        } else if err.is_connect() {
            MegaplanError::Network(err.to_string())
        } else if err.is_decode() {
            MegaplanError::Serialization(err.to_string())
        } else {
            MegaplanError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MegaplanError {
    fn from(err: serde_json::Error) -> Self {
        MegaplanError::Serialization(err.to_string())
    }
}
