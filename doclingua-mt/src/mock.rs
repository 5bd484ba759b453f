//! Mock provider for testing
//!
//! A deterministic, network-free [`TranslationProvider`]. It understands both
//! batch framings, so pipeline tests run the real batch protocol against it:
//! indexed JSON envelopes and delimited envelopes are split, each segment is
//! transformed, and the reply is framed the same way.
//!
//! # Example
//!
//! ```ignore
//! use doclingua_mt::{MockMode, MockProvider, TranslationClient};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockProvider::new(MockMode::Suffix("_fr".to_string()));
//!     let client = TranslationClient::new(Arc::new(mock.clone()), Duration::from_secs(5));
//!     let result = client.translate("hello", "French", &SourceLanguage::Auto).await.unwrap();
//!     assert_eq!(result, "hello_fr");
//!     assert_eq!(mock.call_count(), 1);
//! }
//! ```

use crate::batch::{DEFAULT_DELIMITER, Record};
use crate::error::{MtError, MtResult};
use crate::provider::{MediaPart, Prompt, TranslationProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock behaviours for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append a suffix to every segment: "hello" → "hello_fr"
    Suffix(String),

    /// Look up every segment; unknown segments come back unchanged
    Dictionary(HashMap<String, String>),

    /// Scripted raw replies, one per call, in order
    Replies(Vec<String>),

    /// The same raw reply for every call
    Fixed(String),

    /// Fail every call with this error
    Error(MtError),

    /// Echo every segment unchanged
    NoOp,
}

/// One call as the provider saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub instruction: String,
    pub content: String,
    pub media_mime: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    replies_served: usize,
}

/// Mock provider that simulates model replies
///
/// Clones share the call log, so a test can keep one handle and give
/// another to a [`crate::TranslationClient`].
#[derive(Debug, Clone)]
pub struct MockProvider {
    mode: MockMode,
    delay: Duration,
    content_delays: Vec<(String, Duration)>,
    failing_on: Vec<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            content_delays: Vec::new(),
            failing_on: Vec::new(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Dictionary mode from `(source, translation)` pairs
    pub fn dictionary(pairs: &[(&str, &str)]) -> Self {
        let map = pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self::new(MockMode::Dictionary(map))
    }

    /// Delay every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay calls whose content contains `needle`, instead of the default delay
    pub fn with_delay_for(mut self, needle: &str, delay: Duration) -> Self {
        self.content_delays.push((needle.to_string(), delay));
        self
    }

    /// Fail calls whose content contains `needle` with a provider error
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing_on.push(needle.to_string());
        self
    }

    /// Every call made so far, in the order they started
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn delay_for(&self, content: &str) -> Duration {
        self.content_delays
            .iter()
            .find(|(needle, _)| content.contains(needle.as_str()))
            .map(|(_, delay)| *delay)
            .unwrap_or(self.delay)
    }

    fn next_reply(&self, replies: &[String]) -> MtResult<String> {
        let mut state = self.lock();
        let reply = replies.get(state.replies_served).cloned().ok_or_else(|| {
            MtError::Provider(format!("Mock ran out of replies after {}", replies.len()))
        })?;
        state.replies_served += 1;
        Ok(reply)
    }

    fn transform(&self, segment: &str) -> String {
        match &self.mode {
            MockMode::Suffix(suffix) => format!("{}{}", segment, suffix),
            MockMode::Dictionary(map) => map
                .get(segment.trim())
                .cloned()
                .unwrap_or_else(|| segment.to_string()),
            _ => segment.to_string(),
        }
    }

    /// Transform each framed segment and frame the reply the same way
    fn rewrite(&self, content: &str) -> String {
        if let Ok(records) = serde_json::from_str::<Vec<Record>>(content) {
            let translated: Vec<Record> = records
                .into_iter()
                .map(|r| Record {
                    i: r.i,
                    t: self.transform(&r.t),
                })
                .collect();
            if let Ok(json) = serde_json::to_string(&translated) {
                return json;
            }
        }

        if content.contains(DEFAULT_DELIMITER) {
            return content
                .split(DEFAULT_DELIMITER)
                .map(|segment| self.transform(segment.trim()))
                .collect::<Vec<_>>()
                .join(&format!("\n{}\n", DEFAULT_DELIMITER));
        }

        self.transform(content)
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn generate(&self, prompt: &Prompt, media: Option<&MediaPart>) -> MtResult<String> {
        self.lock().calls.push(RecordedCall {
            instruction: prompt.instruction.clone(),
            content: prompt.content.clone(),
            media_mime: media.map(|m| m.mime_type.clone()),
        });

        let delay = self.delay_for(&prompt.content);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(needle) = self
            .failing_on
            .iter()
            .find(|needle| prompt.content.contains(needle.as_str()))
        {
            return Err(MtError::Provider(format!("Mock failure on {:?}", needle)));
        }

        match &self.mode {
            MockMode::Error(error) => Err(error.clone()),
            MockMode::Fixed(reply) => Ok(reply.clone()),
            MockMode::Replies(replies) => self.next_reply(replies),
            _ => Ok(self.rewrite(&prompt.content)),
        }
    }

    fn provider_name(&self) -> &str {
        "Mock Provider"
    }
}
