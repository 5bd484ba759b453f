//! Error types for the translation pipeline

use doclingua::DocError;
use thiserror::Error;

/// Errors raised while translating text or documents
///
/// Provider and transport failures are rendered to strings where they occur,
/// keeping the type `Clone` so a stored initialisation failure can be handed
/// to every request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MtError {
    /// The translator is not configured (missing key, bad setting)
    #[error("Translator not configured: {0}")]
    Config(String),

    /// The request itself is unusable (empty text, missing field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),

    /// The uploaded document could not be read
    #[error("Document error: {0}")]
    Document(#[from] DocError),

    /// The provider answered with an error status or refused the request
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Authentication with provider failed: {0}")]
    Authentication(String),

    /// The call did not complete within the client timeout
    #[error("Translation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The provider answered, but not in the expected shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A batch response split into the wrong number of segments
    #[error("Batch translation returned {actual} segments for {expected} fragments")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A fragment contains the batch delimiter, so the batch cannot be framed
    #[error("Fragment {index} contains the batch delimiter {delimiter:?}")]
    DelimiterCollision { index: usize, delimiter: String },

    /// A background parsing task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;

impl From<reqwest::Error> for MtError {
    fn from(error: reqwest::Error) -> Self {
        MtError::Network(error.to_string())
    }
}

impl MtError {
    /// True for failures caused by the caller's request rather than the
    /// provider or the deployment
    pub fn is_client_error(&self) -> bool {
        match self {
            MtError::InvalidInput(_) | MtError::UnsupportedFormat(_) | MtError::InvalidLanguage(_) => {
                true
            }
            MtError::Document(e) => !matches!(e, DocError::Write(_)),
            _ => false,
        }
    }

    /// True for failures of this process itself (task failures, packaging)
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MtError::Internal(_) | MtError::Document(DocError::Write(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_converts() {
        let error: MtError = DocError::MissingPart("word/document.xml".to_string()).into();
        assert_eq!(
            error,
            MtError::Document(DocError::MissingPart("word/document.xml".to_string()))
        );
        assert!(error.is_client_error());
    }

    #[test]
    fn test_shape_mismatch_message() {
        let error = MtError::ShapeMismatch { expected: 3, actual: 2 };
        assert_eq!(
            error.to_string(),
            "Batch translation returned 2 segments for 3 fragments"
        );
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_provider_errors_are_not_client_errors() {
        assert!(!MtError::Timeout { millis: 5000 }.is_client_error());
        assert!(!MtError::Config("missing key".to_string()).is_client_error());
        assert!(!MtError::RateLimited("slow down".to_string()).is_client_error());
    }

    #[test]
    fn test_packaging_failure_is_internal() {
        let error: MtError = DocError::Write("disk full".to_string()).into();
        assert!(!error.is_client_error());
        assert!(error.is_internal());

        let error: MtError = DocError::InvalidPackage("not a zip".to_string()).into();
        assert!(error.is_client_error());
        assert!(!error.is_internal());
        assert!(MtError::Internal("task panicked".to_string()).is_internal());
    }
}
