use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing a snapshot on local storage.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to parse cached snapshot '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid collection key: {0:?}")]
    InvalidKey(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}
