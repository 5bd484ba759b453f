//! Error types for document parsing and writing

use thiserror::Error;

/// Errors raised while reading or writing a document package
///
/// Every variant carries a plain message so the type stays `Clone` and
/// comparable in tests; the underlying zip/xml/pdf errors are rendered
/// into that message at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    /// The bytes are not a readable zip package
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// A required part is missing from the package
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// A part exists but is not well-formed XML
    #[error("Malformed XML in '{part}': {message}")]
    MalformedXml { part: String, message: String },

    /// The PDF could not be parsed or yielded no text layer
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Writing the output package failed
    #[error("Failed to write package: {0}")]
    Write(String),
}

/// Result type for document operations
pub type DocResult<T> = Result<T, DocError>;

impl From<zip::result::ZipError> for DocError {
    fn from(error: zip::result::ZipError) -> Self {
        DocError::InvalidPackage(error.to_string())
    }
}
