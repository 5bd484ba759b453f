//! Per-fragment protocol: one provider call per fragment
//!
//! Calls may run concurrently and finish in any order; results are put back
//! in input order before they are returned. A failed call never fails the
//! document: that fragment keeps its original text and the outcome records
//! why.

use crate::client::TranslationClient;
use crate::language::SourceLanguage;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::warn;

/// What happened to one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FragmentStatus {
    Translated,
    /// The call failed; the original text was kept
    KeptOriginal { reason: String },
}

/// Text to write back for one fragment, and how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentOutcome {
    pub text: String,
    pub status: FragmentStatus,
}

impl FragmentOutcome {
    pub fn translated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: FragmentStatus::Translated,
        }
    }

    pub fn kept_original(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: FragmentStatus::KeptOriginal {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.status, FragmentStatus::KeptOriginal { .. })
    }
}

/// Translate every text with its own call, at most `concurrency` at a time
///
/// The result has one outcome per input text, in input order. `document`
/// names the source of the texts in fallback logs.
pub async fn translate_each(
    client: &TranslationClient,
    texts: &[String],
    source: &SourceLanguage,
    target: &str,
    concurrency: usize,
    document: &str,
) -> Vec<FragmentOutcome> {
    // Each call owns its inputs so the stream holds no borrows.
    let calls: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let client = client.clone();
            let text = text.clone();
            let source = source.clone();
            let target = target.to_string();
            let document = document.to_string();
            async move {
                if text.trim().is_empty() {
                    return (index, FragmentOutcome::translated(text));
                }
                let outcome = match client.translate(&text, &target, &source).await {
                    Ok(translated) => FragmentOutcome::translated(translated),
                    Err(e) => {
                        warn!(
                            document = %document,
                            fragment = index,
                            source = %source,
                            target_lang = %target,
                            provider = client.provider_name(),
                            error = %e,
                            "Keeping original text for fragment"
                        );
                        FragmentOutcome::kept_original(text, e.to_string())
                    }
                };
                (index, outcome)
            }
        })
        .collect();

    let mut results: Vec<(usize, FragmentOutcome)> = stream::iter(calls)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // Sort by index to restore input order
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MtError;
    use crate::mock::{MockMode, MockProvider};
    use std::sync::Arc;
    use std::time::Duration;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn client(mock: &MockProvider) -> TranslationClient {
        TranslationClient::new(Arc::new(mock.clone()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_one_call_per_fragment() {
        let mock = MockProvider::new(MockMode::Suffix("_fr".to_string()));
        let texts = strings(&["a", "b", "c"]);

        let outcomes = translate_each(&client(&mock), &texts, &SourceLanguage::Auto, "fr", 2, "test.docx").await;

        let texts: Vec<&str> = outcomes.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["a_fr", "b_fr", "c_fr"]);
        assert!(outcomes.iter().all(|o| o.status == FragmentStatus::Translated));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_order_survives_out_of_order_completion() {
        let mock = MockProvider::new(MockMode::Suffix("!".to_string()))
            .with_delay_for("first", Duration::from_millis(80))
            .with_delay_for("second", Duration::from_millis(40));
        let texts = strings(&["first", "second", "third"]);

        let outcomes = translate_each(&client(&mock), &texts, &SourceLanguage::Auto, "fr", 3, "test.docx").await;

        let texts: Vec<&str> = outcomes.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["first!", "second!", "third!"]);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_fragment_keeps_original() {
        let mock = MockProvider::new(MockMode::Suffix("_fr".to_string())).failing_on("c");
        let texts = strings(&["a", "b", "c", "d", "e"]);

        let outcomes = translate_each(&client(&mock), &texts, &SourceLanguage::Auto, "fr", 1, "test.docx").await;

        assert_eq!(outcomes[0], FragmentOutcome::translated("a_fr"));
        assert_eq!(outcomes[1], FragmentOutcome::translated("b_fr"));
        assert_eq!(outcomes[2].text, "c");
        assert!(outcomes[2].is_fallback());
        assert_eq!(outcomes[3], FragmentOutcome::translated("d_fr"));
        assert_eq!(outcomes[4], FragmentOutcome::translated("e_fr"));
    }

    #[tokio::test]
    async fn test_empty_reply_keeps_original() {
        let mock = MockProvider::new(MockMode::Fixed(String::new()));
        let texts = strings(&["Hello", "World"]);

        let outcomes = translate_each(&client(&mock), &texts, &SourceLanguage::Auto, "fr", 2, "test.docx").await;

        assert_eq!(outcomes[0].text, "Hello");
        assert_eq!(outcomes[1].text, "World");
        assert!(outcomes.iter().all(FragmentOutcome::is_fallback));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_per_fragment() {
        let mock = MockProvider::new(MockMode::NoOp).with_delay_for("slow", Duration::from_millis(200));
        let client = TranslationClient::new(Arc::new(mock), Duration::from_millis(20));
        let texts = strings(&["slow", "fast"]);

        let outcomes = translate_each(&client, &texts, &SourceLanguage::Auto, "fr", 2, "test.docx").await;

        assert_eq!(
            outcomes[0].status,
            FragmentStatus::KeptOriginal {
                reason: MtError::Timeout { millis: 20 }.to_string()
            }
        );
        assert_eq!(outcomes[1], FragmentOutcome::translated("fast"));
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let mock = MockProvider::new(MockMode::NoOp);
        let outcomes = translate_each(&client(&mock), &strings(&["x"]), &SourceLanguage::Auto, "fr", 0, "test.docx").await;
        assert_eq!(outcomes, vec![FragmentOutcome::translated("x")]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mock = MockProvider::new(MockMode::NoOp);
        let outcomes = translate_each(&client(&mock), &[], &SourceLanguage::Auto, "fr", 4, "test.docx").await;
        assert!(outcomes.is_empty());
        assert_eq!(mock.call_count(), 0);
    }
}
