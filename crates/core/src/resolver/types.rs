//! Types for the resolver module.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Caller-facing pointer to a finished artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultReference {
    Url(String),
    Path(PathBuf),
}

impl ResultReference {
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl fmt::Display for ResultReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}
