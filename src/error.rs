//! Error types for the catalog library

use thiserror::Error;

/// Errors surfaced by the catalog library
#[derive(Debug, Error)]
pub enum Error {
    /// A URI does not match its route template, or a record cannot be encoded
    #[error("malformed URI `{uri}`: {reason}")]
    MalformedUri { uri: String, reason: String },

    /// A metadata search was requested for a record kind outside artist/album/track
    #[error("unsupported search type: {0}")]
    UnsupportedSearchType(String),

    #[error("unknown record kind `{0}`")]
    UnknownKind(String),

    /// The metadata provider answered with an error payload
    #[error("metadata provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document store error: {0}")]
    Store(String),

    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0} not found")]
    NotFound(String),
}

impl Error {
    pub(crate) fn malformed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
