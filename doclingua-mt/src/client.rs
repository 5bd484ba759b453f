//! Translation client: one bounded provider call per request

use crate::error::{MtError, MtResult};
use crate::language::SourceLanguage;
use crate::prompts;
use crate::provider::{MediaPart, Prompt, TranslationProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Wraps a provider with a per-call timeout
///
/// Every failure, including the timeout, comes back as an `MtError`; nothing
/// is retried.
#[derive(Clone)]
pub struct TranslationClient {
    provider: Arc<dyn TranslationProvider>,
    timeout: Duration,
}

impl TranslationClient {
    pub fn new(provider: Arc<dyn TranslationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a raw prompt, bounded by the client timeout
    pub async fn complete(&self, prompt: &Prompt, media: Option<&MediaPart>) -> MtResult<String> {
        debug!(
            provider = self.provider_name(),
            chars = prompt.content.chars().count(),
            media = media.is_some(),
            "Calling provider"
        );
        match tokio::time::timeout(self.timeout, self.provider.generate(prompt, media)).await {
            Ok(result) => result,
            Err(_) => Err(MtError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Translate one text into `target`
    ///
    /// Empty input is the caller's concern and is sent as is. An empty reply
    /// to non-empty input is a `MalformedResponse`, never a translation.
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &SourceLanguage,
    ) -> MtResult<String> {
        let prompt = Prompt::new(prompts::text_instruction(source, target), text);
        let translated = self.complete(&prompt, None).await?;
        let translated = translated.trim();
        if translated.is_empty() && !text.trim().is_empty() {
            return Err(MtError::MalformedResponse(
                "Provider returned an empty translation".to_string(),
            ));
        }
        Ok(translated.to_string())
    }

    /// Read the text out of an image and translate it into `target`
    pub async fn translate_image(&self, image: &MediaPart, target: &str) -> MtResult<String> {
        let prompt = Prompt::new(prompts::image_instruction(target), "");
        let translated = self.complete(&prompt, Some(image)).await?;
        Ok(translated.trim().to_string())
    }
}

impl std::fmt::Debug for TranslationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationClient")
            .field("provider", &self.provider_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMode, MockProvider};

    fn client(mock: MockProvider) -> TranslationClient {
        TranslationClient::new(Arc::new(mock), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_translate_returns_trimmed_text() {
        let client = client(MockProvider::new(MockMode::Fixed("  Bonjour \n".to_string())));
        let result = client
            .translate("Hello", "French", &SourceLanguage::Auto)
            .await
            .unwrap();
        assert_eq!(result, "Bonjour");
    }

    #[tokio::test]
    async fn test_translate_sends_text_as_content() {
        let mock = MockProvider::new(MockMode::Suffix("_fr".to_string()));
        let client = TranslationClient::new(Arc::new(mock.clone()), Duration::from_secs(5));

        let result = client
            .translate("Hello", "French", &SourceLanguage::Named("English".to_string()))
            .await
            .unwrap();

        assert_eq!(result, "Hello_fr");
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].content, "Hello");
        assert!(calls[0].instruction.contains("from English into French"));
    }

    #[tokio::test]
    async fn test_provider_error_is_returned() {
        let client = client(MockProvider::new(MockMode::Error(MtError::RateLimited(
            "quota".to_string(),
        ))));
        let result = client.translate("Hello", "fr", &SourceLanguage::Auto).await;
        assert_eq!(result, Err(MtError::RateLimited("quota".to_string())));
    }

    #[tokio::test]
    async fn test_timeout_is_an_ordinary_failure() {
        let mock = MockProvider::new(MockMode::NoOp).with_delay(Duration::from_millis(200));
        let client = TranslationClient::new(Arc::new(mock), Duration::from_millis(20));

        let result = client.translate("Hello", "fr", &SourceLanguage::Auto).await;
        assert_eq!(result, Err(MtError::Timeout { millis: 20 }));
    }

    #[tokio::test]
    async fn test_empty_reply_is_malformed() {
        let client = client(MockProvider::new(MockMode::Fixed(" \n ".to_string())));
        let result = client.translate("Hello", "French", &SourceLanguage::Auto).await;
        assert!(matches!(result, Err(MtError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_translate_image_attaches_media() {
        let mock = MockProvider::new(MockMode::Fixed("Sortie".to_string()));
        let client = TranslationClient::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let image = MediaPart::new("image/png", vec![0x89, b'P', b'N', b'G']);

        let result = client.translate_image(&image, "French").await.unwrap();

        assert_eq!(result, "Sortie");
        let calls = mock.calls();
        assert_eq!(calls[0].media_mime.as_deref(), Some("image/png"));
        assert!(calls[0].content.is_empty());
    }

    #[test]
    fn test_provider_name() {
        let client = client(MockProvider::new(MockMode::NoOp));
        assert_eq!(client.provider_name(), "Mock Provider");
    }
}
