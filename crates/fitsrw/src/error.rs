use std::sync::Arc;

use thiserror::Error;

/// All errors that can occur during FITS I/O operations.
///
/// The type is `Clone` so the row cursor can latch its terminal error
/// while still returning it to the caller; I/O errors are shared through
/// an [`Arc`] for that reason.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The underlying byte source or sink failed.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The stream ended inside a mandatory structure.
    #[error("truncated FITS stream while reading {0}")]
    Truncated(&'static str),

    /// A header card line could not be parsed.
    #[error("malformed header card: {0}")]
    MalformedCard(String),

    /// A required keyword was not found in the header.
    #[error("missing mandatory keyword {0}")]
    MissingKey(String),

    /// The HDU carries no recognisable SIMPLE/XTENSION classification.
    #[error("invalid HDU: {0}")]
    InvalidHdu(String),

    /// An element type does not match the stored BITPIX or column type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// ASCII tables hold scalars only.
    #[error("ASCII tables cannot hold {0} values")]
    UnsupportedAsciiType(&'static str),

    /// User append of a card whose name already exists in the header.
    #[error("duplicate card {0}")]
    DuplicateKey(String),

    /// A second primary HDU was written to the same file.
    #[error("file already has a primary HDU")]
    DuplicatePrimary,

    /// A formatted ASCII value did not fit its column width.
    #[error("value does not fit column width: {0}")]
    FormatWidth(String),

    /// A caller-supplied argument is out of range or inconsistent.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
