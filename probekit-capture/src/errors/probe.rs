use std::io;
use std::path::PathBuf;
use std::time::Duration;

use super::SinkError;

/// Failure of a single CoAP exchange. The prober logs and skips these.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed packet: {0}")]
    Malformed(String),

    #[error("Peer reset the exchange")]
    Reset,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to read resource list {path}: {source}")]
    ResourceList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown request method {0:?}")]
    UnknownMethod(String),

    #[error("Failed to open CoAP transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
