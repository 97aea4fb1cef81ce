//! Error types for configuration loading and persistence.

use crate::config::Format;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the configuration store and its file codec.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file exists but its contents are malformed.
    ///
    /// Never swallowed: a broken user-edited file should halt rather than
    /// silently discard data.
    #[error("Cannot parse {format} config at {path}: {message}")]
    Parse {
        format: Format,
        path: PathBuf,
        message: String,
    },

    /// A tree could not be rendered in the requested format.
    #[error("Cannot serialize config as {format}: {message}")]
    Serialize { format: Format, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to determine home directory; set AIO_CONFIG_FILE or XDG_CONFIG_HOME")]
    HomeDirUnavailable,
}

impl ConfigError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(format: Format, path: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// True when this is an I/O error for a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
