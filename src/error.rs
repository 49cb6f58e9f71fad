use std::path::PathBuf;

/// Error type for portage-lint parsing and repository loading.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid EAPI value.
    #[error("invalid EAPI: {0}")]
    InvalidEapi(String),

    /// Invalid keyword string.
    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),

    /// Invalid IUSE flag entry.
    #[error("invalid IUSE entry: {0}")]
    InvalidIUse(String),

    /// Invalid REQUIRED_USE expression.
    #[error("invalid REQUIRED_USE: {0}")]
    InvalidRequiredUse(String),

    /// Invalid package version.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// Invalid package atom.
    #[error("invalid atom: {0}")]
    InvalidAtom(String),

    /// Invalid dependency specification.
    #[error("invalid dependency: {0}")]
    InvalidDepSpec(String),

    /// Error parsing a metadata cache entry.
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Missing mandatory field in a cache entry.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Malformed GLSA document or range.
    #[error("invalid GLSA: {0}")]
    InvalidGlsa(String),

    /// Unknown check name.
    #[error("unknown check: {0}")]
    UnknownCheck(String),

    /// A profile directory could not be resolved.
    #[error("invalid profile: {0}")]
    Profile(String),

    /// Filesystem error while reading repository data.
    #[error("{}: {message}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for portage-lint operations.
pub type Result<T> = std::result::Result<T, Error>;
