//! Configuration error types.

use std::path::PathBuf;

/// Errors from reading, writing or parsing `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config directory or file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid RON for [`Config`](crate::Config).
    #[error("invalid config in {}: {source}", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// RON error with line and column.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}
