use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProbeError::UnknownMethod(s.to_string()))
    }
}

/// A target path on the probed host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub path: String,
}

impl ResourceDescriptor {
    pub fn new(path: &str) -> Self {
        let path = path.trim();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Self { path }
    }

    /// Path segments as they travel in `Uri-Path` options.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// One path per line; blank lines are skipped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(Self::new)
            .collect()
    }

    pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, ProbeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ProbeError::ResourceList {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse_list(&raw))
    }
}
