use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::TaskKind;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Scenario dataset {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0} cannot start: {1}")]
    StartFailed(TaskKind, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl SimError {
    pub fn dataset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Dataset {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Why a batch did not reach the ingestion service.
///
/// Delivery failures never propagate out of a run loop; they are logged and
/// counted, and the next tick's batch supersedes the lost one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request failed: {0}")]
    Request(String),
}
