use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::dom::DomError;

/// Errors surfaced by the search core and its loaders.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index is malformed: {message}")]
    MalformedIndex { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    ExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl SearchError {
    pub fn malformed(message: impl Into<String>) -> Self {
        SearchError::MalformedIndex {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
