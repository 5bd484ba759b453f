//! Provider abstraction for the generative-language backend
//!
//! A provider performs exactly one model call per [`TranslationProvider::generate`].
//! It is neither idempotent nor free, so callers must not retry behind the
//! user's back.

use crate::error::MtResult;
use async_trait::async_trait;

/// Instruction plus the content it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System-level instruction (target language, framing rules)
    pub instruction: String,
    /// The text to operate on; may be empty when media carries the content
    pub content: String,
}

impl Prompt {
    pub fn new(instruction: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            content: content.into(),
        }
    }
}

/// Binary attachment sent inline with a prompt
#[derive(Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaPart {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl std::fmt::Debug for MediaPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPart")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Generic trait for generative translation backends
///
/// Implementations handle one request/response exchange with the model,
/// whether over HTTP (Gemini) or deterministically (mock).
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Send one prompt, with optional inline media, and return the model's text
    async fn generate(&self, prompt: &Prompt, media: Option<&MediaPart>) -> MtResult<String>;

    /// Name used in logs and the health endpoint
    fn provider_name(&self) -> &str;
}
