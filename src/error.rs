use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by submission and the record store.
///
/// Scorer failures and single malformed rows never show up here; both are
/// recovered where they happen.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Bad user input, such as an out-of-range rating or an unknown mood tag.
    #[error("invalid feedback: {0}")]
    Validation(String),

    #[error("could not save feedback to {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store-level corruption beyond what per-row skipping can absorb.
    #[error("could not read feedback from {path}: {message}")]
    StoreRead { path: PathBuf, message: String },
}

impl FeedbackError {
    pub fn validation(message: impl Into<String>) -> Self {
        FeedbackError::Validation(message.into())
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FeedbackError::StoreWrite {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        FeedbackError::StoreRead {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
