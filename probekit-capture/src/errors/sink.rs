use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Capture document {0} is missing; it must be reset before appending")]
    Missing(PathBuf),

    #[error("Capture document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode capture document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error on capture document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
