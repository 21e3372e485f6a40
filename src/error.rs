use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by loading, preparing and plotting field data.
///
/// None of these are retried: the caller reports them to the user.
#[derive(Debug, Error)]
pub enum Error {
    /// Expected directory or monthly file is absent.
    #[error("missing data: {}: {reason}", .path.display())]
    MissingData { path: PathBuf, reason: String },

    /// File is present but cannot be parsed or is inconsistent.
    #[error("malformed data in {origin}: {reason}")]
    MalformedData { origin: String, reason: String },

    /// Nothing to plot or aggregate.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Drawing the figure failed.
    #[error("rendering failed: {0}")]
    Render(String),

    /// The rendered image could not be written.
    #[error("encoding {} failed: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedData {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MissingData {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
