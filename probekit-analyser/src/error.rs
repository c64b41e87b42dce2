use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum AnalyseError {
    #[error("Failed to read capture log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed coordinate {text:?} on line {line}")]
    MalformedCoordinate { line: usize, text: String },
}
