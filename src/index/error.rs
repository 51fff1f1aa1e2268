use std::error::Error;
use std::fmt::{self, Display};
use std::path::PathBuf;

/// Typed errors returned by index building operations.
#[derive(Debug)]
pub enum IndexError {
    /// The build root does not exist or is not a directory.
    InvalidRoot(PathBuf),
    /// A build is already running on this builder instance.
    BuildInProgress,
    /// Fallback for other textual errors.
    Other(String),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::InvalidRoot(p) => {
                write!(f, "invalid root: {} is not an existing directory", p.display())
            }
            IndexError::BuildInProgress => write!(f, "a build is already in progress"),
            IndexError::Other(s) => write!(f, "error: {}", s),
        }
    }
}

impl Error for IndexError {}

// Conversions from common error types into IndexError for easier propagation.
impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}

impl From<anyhow::Error> for IndexError {
    fn from(e: anyhow::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}
