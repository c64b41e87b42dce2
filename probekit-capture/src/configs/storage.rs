use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::errors::SinkError;
use crate::models::{LogDocument, Record};

/// Owns the on-disk capture document.
///
/// Every append reloads and rewrites the whole document. There is no locking:
/// one process, one writer, one append at a time.
#[derive(Debug, Clone)]
pub struct RecordSink {
    path: PathBuf,
}

impl RecordSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces whatever is at the path, corrupt or not, with an empty document.
    pub fn reset(&self) -> Result<(), SinkError> {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("removed previous capture {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(self.io_error(source)),
        }

        self.store(&LogDocument::default())
    }

    pub fn load(&self) -> Result<LogDocument, SinkError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SinkError::Missing(self.path.clone()));
            }
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_slice(&raw).map_err(|source| SinkError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Returns the number of records in the document after the append.
    pub fn append(&self, record: Record) -> Result<usize, SinkError> {
        let mut document = self.load()?;
        document.messages.push(record);
        self.store(&document)?;

        Ok(document.messages.len())
    }

    fn store(&self, document: &LogDocument) -> Result<(), SinkError> {
        let mut buffer = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        document.serialize(&mut serializer)?;

        self.write_atomic(&buffer).map_err(|source| self.io_error(source))
    }

    fn write_atomic(&self, contents: &[u8]) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }

    fn io_error(&self, source: io::Error) -> SinkError {
        SinkError::Io { path: self.path.clone(), source }
    }
}
