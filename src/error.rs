//! Error types for the Chrome for Testing updater.
//!
//! Every fallible operation in the library returns [`UpdaterError`]. A missing
//! install is not an error: it is reported as `None` by the version readers.
//! Failing to delete a downloaded archive is not an error either, see
//! [`crate::install::CleanupWarning`].

use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried by the network-facing variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consolidated error type for updater operations.
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Invalid install root, platform, artifact selection or config file.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// The version endpoint could not be queried.
    #[error("network error: {message}")]
    Network {
        /// Description of the failed request.
        message: String,
        /// The underlying transport error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// An archive could not be downloaded to disk.
    #[error("download error: {message}")]
    Download {
        /// Description of the failed transfer.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// The archive is malformed or the filesystem cannot hold its entries.
    #[error("extraction error: {message}")]
    Extraction {
        /// Description of the failure, naming the offending path.
        message: String,
        /// The path that could not be created or written.
        path: Option<PathBuf>,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// The install manifest could not be written or parsed.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the manifest failure.
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Any other filesystem failure.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl UpdaterError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Network {
            message: message.into(),
            source,
        }
    }

    pub fn download(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Download {
            message: message.into(),
            source,
        }
    }

    /// Extraction failure that names the path which could not be handled.
    pub fn extraction(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Extraction {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    pub fn manifest(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Manifest {
            message: message.into(),
            source,
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Whether a caller may reasonably retry the whole operation later.
    ///
    /// Requests are already retried internally with backoff, so this only
    /// tells a caller that the failure came from the network rather than
    /// from local state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Download { .. })
    }
}

/// Result alias used throughout the library.
pub type Result<T, E = UpdaterError> = std::result::Result<T, E>;
