//! Error types for session storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`SessionStore`](crate::store::SessionStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("session store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session document could not be encoded.
    #[error("failed to encode session document: {0}")]
    Encode(#[from] serde_json::Error),
}
