//! Batch protocol: all fragments of a document in a single provider call
//!
//! The fragment texts are framed into one envelope, sent with one
//! instruction, and the reply is split with the same framing. The batch is
//! fail-closed: unless the reply splits into exactly as many segments as
//! were sent, the whole batch is rejected and nothing is written.
//!
//! # Example
//!
//! ```ignore
//! let texts = vec!["Hello".to_string(), "World".to_string()];
//! let translated =
//!     translate_batch(&client, &texts, &SourceLanguage::Auto, "French", &BatchFraming::Indexed).await?;
//! assert_eq!(translated.len(), texts.len());
//! ```

use crate::client::TranslationClient;
use crate::error::{MtError, MtResult};
use crate::language::SourceLanguage;
use crate::prompts;
use crate::provider::Prompt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Delimiter used by [`BatchFraming::delimited`]
pub const DEFAULT_DELIMITER: &str = "<|||>";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```\s*$")
        .expect("code fence pattern is valid")
});

/// How fragment texts are packed into one request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BatchFraming {
    /// JSON array of `{"i": index, "t": text}` records
    #[default]
    Indexed,
    /// Texts joined by a literal delimiter
    Delimited { delimiter: String },
}

/// One framed segment of an indexed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Record {
    pub(crate) i: usize,
    pub(crate) t: String,
}

impl BatchFraming {
    /// Delimited framing with [`DEFAULT_DELIMITER`]
    pub fn delimited() -> Self {
        BatchFraming::Delimited {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Pack `texts` into one envelope
    pub fn frame(&self, texts: &[String]) -> MtResult<String> {
        match self {
            BatchFraming::Indexed => {
                let records: Vec<Record> = texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| Record { i, t: t.clone() })
                    .collect();
                serde_json::to_string(&records)
                    .map_err(|e| MtError::InvalidInput(format!("Failed to frame batch: {}", e)))
            }
            BatchFraming::Delimited { delimiter } => {
                if let Some(index) = texts.iter().position(|t| t.contains(delimiter.as_str())) {
                    return Err(MtError::DelimiterCollision {
                        index,
                        delimiter: delimiter.clone(),
                    });
                }
                Ok(texts.join(&format!("\n{}\n", delimiter)))
            }
        }
    }

    /// Split a reply into one trimmed segment per source text, in order
    ///
    /// Fails unless the reply holds exactly `sources.len()` segments and every
    /// non-empty source got a non-empty segment.
    pub fn split(&self, response: &str, sources: &[String]) -> MtResult<Vec<String>> {
        let expected = sources.len();
        let segments = match self {
            BatchFraming::Indexed => split_indexed(response, expected)?,
            BatchFraming::Delimited { delimiter } => {
                let segments: Vec<String> = response
                    .split(delimiter.as_str())
                    .map(|s| s.trim().to_string())
                    .collect();
                if segments.len() != expected {
                    return Err(MtError::ShapeMismatch {
                        expected,
                        actual: segments.len(),
                    });
                }
                segments
            }
        };

        if let Some(index) = segments
            .iter()
            .zip(sources)
            .position(|(segment, source)| segment.is_empty() && !source.trim().is_empty())
        {
            return Err(MtError::MalformedResponse(format!(
                "Segment {} came back empty",
                index
            )));
        }
        Ok(segments)
    }
}

fn strip_code_fence(response: &str) -> &str {
    match CODE_FENCE.captures(response).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => response.trim(),
    }
}

/// Parse the records of an indexed reply
///
/// A bare JSON array is taken as is. Otherwise a surrounding code fence is
/// removed, and failing that the outermost brackets are tried.
fn parse_records(response: &str) -> MtResult<Vec<Record>> {
    if let Ok(records) = serde_json::from_str(response.trim()) {
        return Ok(records);
    }

    let body = strip_code_fence(response);
    match serde_json::from_str(body) {
        Ok(records) => Ok(records),
        Err(first_error) => {
            let array = match (body.find('['), body.rfind(']')) {
                (Some(start), Some(end)) if start < end => &body[start..=end],
                _ => return Err(MtError::MalformedResponse(first_error.to_string())),
            };
            serde_json::from_str(array).map_err(|e| MtError::MalformedResponse(e.to_string()))
        }
    }
}

fn split_indexed(response: &str, expected: usize) -> MtResult<Vec<String>> {
    let records = parse_records(response)?;

    if records.len() != expected {
        return Err(MtError::ShapeMismatch {
            expected,
            actual: records.len(),
        });
    }

    let mut slots: Vec<Option<String>> = vec![None; expected];
    for record in records {
        let Some(slot) = slots.get_mut(record.i) else {
            return Err(MtError::MalformedResponse(format!(
                "Segment index {} is out of range",
                record.i
            )));
        };
        if slot.is_some() {
            return Err(MtError::MalformedResponse(format!(
                "Segment index {} appears more than once",
                record.i
            )));
        }
        *slot = Some(record.t.trim().to_string());
    }

    // Every slot is filled: the count matched and no index repeated.
    Ok(slots.into_iter().flatten().collect())
}

/// Translate all `texts` with one provider call
///
/// Returns the translations in input order, or an error if the call fails or
/// the reply does not split into `texts.len()` segments.
pub async fn translate_batch(
    client: &TranslationClient,
    texts: &[String],
    source: &SourceLanguage,
    target: &str,
    framing: &BatchFraming,
) -> MtResult<Vec<String>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let envelope = framing.frame(texts)?;
    let prompt = Prompt::new(
        prompts::batch_instruction(framing, texts.len(), source, target),
        envelope,
    );
    debug!(
        fragments = texts.len(),
        chars = prompt.content.chars().count(),
        "Sending batch"
    );

    let response = client.complete(&prompt, None).await?;
    framing.split(&response, texts).inspect_err(|e| {
        warn!(
            fragments = texts.len(),
            provider = client.provider_name(),
            error = %e,
            "Rejected batch reply"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMode, MockProvider};
    use std::sync::Arc;
    use std::time::Duration;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn client(mock: &MockProvider) -> TranslationClient {
        TranslationClient::new(Arc::new(mock.clone()), Duration::from_secs(5))
    }

    // ========== Framing ==========

    #[test]
    fn test_frame_indexed() {
        let framed = BatchFraming::Indexed.frame(&strings(&["a", "b \"q\""])).unwrap();
        assert_eq!(framed, r#"[{"i":0,"t":"a"},{"i":1,"t":"b \"q\""}]"#);
    }

    #[test]
    fn test_frame_delimited() {
        let framed = BatchFraming::delimited().frame(&strings(&["a", "b"])).unwrap();
        assert_eq!(framed, "a\n<|||>\nb");
    }

    #[test]
    fn test_frame_delimited_collision() {
        let result = BatchFraming::delimited().frame(&strings(&["fine", "bad <|||> text"]));
        assert_eq!(
            result,
            Err(MtError::DelimiterCollision {
                index: 1,
                delimiter: DEFAULT_DELIMITER.to_string()
            })
        );
    }

    #[test]
    fn test_split_indexed_reorders_by_index() {
        let reply = r#"[{"i":1,"t":" Monde "},{"i":0,"t":"Bonjour"}]"#;
        let segments = BatchFraming::Indexed.split(reply, &strings(&["Hello", "World"])).unwrap();
        assert_eq!(segments, vec!["Bonjour", "Monde"]);
    }

    #[test]
    fn test_split_indexed_strips_code_fence() {
        let reply = "```json\n[{\"i\":0,\"t\":\"Bonjour\"}]\n```";
        assert_eq!(BatchFraming::Indexed.split(reply, &strings(&["Hello"])).unwrap(), vec!["Bonjour"]);
    }

    #[test]
    fn test_split_indexed_tolerates_surrounding_prose() {
        let reply = "Here you go: [{\"i\":0,\"t\":\"Hola\"}] Enjoy!";
        assert_eq!(BatchFraming::Indexed.split(reply, &strings(&["Hello"])).unwrap(), vec!["Hola"]);
    }

    #[test]
    fn test_split_indexed_count_mismatch() {
        let reply = r#"[{"i":0,"t":"a"},{"i":1,"t":"b"}]"#;
        assert_eq!(
            BatchFraming::Indexed.split(reply, &strings(&["x", "y", "z"])),
            Err(MtError::ShapeMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_split_indexed_duplicate_index() {
        let reply = r#"[{"i":0,"t":"a"},{"i":0,"t":"b"}]"#;
        assert!(matches!(
            BatchFraming::Indexed.split(reply, &strings(&["x", "y"])),
            Err(MtError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_split_indexed_out_of_range_index() {
        let reply = r#"[{"i":0,"t":"a"},{"i":5,"t":"b"}]"#;
        assert!(matches!(
            BatchFraming::Indexed.split(reply, &strings(&["x", "y"])),
            Err(MtError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_split_indexed_not_json() {
        assert!(matches!(
            BatchFraming::Indexed.split("Bonjour, Monde", &strings(&["Hello", "World"])),
            Err(MtError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_split_delimited_trims_segments() {
        let reply = " Bonjour \n<|||>\n Monde\n";
        assert_eq!(
            BatchFraming::delimited().split(reply, &strings(&["Hello", "World"])).unwrap(),
            vec!["Bonjour", "Monde"]
        );
    }

    #[test]
    fn test_split_delimited_mismatch() {
        assert_eq!(
            BatchFraming::delimited().split("A <|||> B", &strings(&["x", "y", "z"])),
            Err(MtError::ShapeMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_split_rejects_extra_segments() {
        let sources = strings(&["x", "y", "z"]);
        assert_eq!(
            BatchFraming::delimited().split("A <|||> B <|||> C <|||> D", &sources),
            Err(MtError::ShapeMismatch { expected: 3, actual: 4 })
        );
        let reply = r#"[{"i":0,"t":"a"},{"i":1,"t":"b"},{"i":2,"t":"c"},{"i":3,"t":"d"}]"#;
        assert_eq!(
            BatchFraming::Indexed.split(reply, &sources),
            Err(MtError::ShapeMismatch { expected: 3, actual: 4 })
        );
    }

    #[test]
    fn test_split_rejects_empty_segment_for_text() {
        assert!(matches!(
            BatchFraming::delimited().split("Bonjour <|||>  ", &strings(&["Hello", "World"])),
            Err(MtError::MalformedResponse(_))
        ));
        assert!(matches!(
            BatchFraming::Indexed.split(r#"[{"i":0,"t":"Un"},{"i":1,"t":""}]"#, &strings(&["One", "Two"])),
            Err(MtError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_split_delimited_keeps_code_fences() {
        let text = "```rust fn main() ```";
        assert_eq!(
            BatchFraming::delimited().split(text, &strings(&[text])).unwrap(),
            vec![text]
        );
    }

    #[test]
    fn test_split_indexed_bare_array_is_not_unfenced() {
        let reply = r#"[{"i":0,"t":"```sh ls ```"}]"#;
        assert_eq!(
            BatchFraming::Indexed.split(reply, &strings(&["```sh ls ```"])).unwrap(),
            vec!["```sh ls ```"]
        );
    }

    // ========== Protocol ==========

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let mock = MockProvider::new(MockMode::Suffix("_fr".to_string()));
        let result = translate_batch(&client(&mock), &[], &SourceLanguage::Auto, "fr", &BatchFraming::Indexed)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_makes_exactly_one_call() {
        let mock = MockProvider::new(MockMode::Suffix("_fr".to_string()));
        let texts = strings(&["one", "two", "three"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "fr", &BatchFraming::Indexed)
            .await
            .unwrap();

        assert_eq!(result, vec!["one_fr", "two_fr", "three_fr"]);
        assert_eq!(mock.call_count(), 1);
        assert!(mock.calls()[0].instruction.contains("exactly 3 objects"));
    }

    #[tokio::test]
    async fn test_delimited_batch_round_trip() {
        let mock = MockProvider::new(MockMode::Suffix("_de".to_string()));
        let texts = strings(&["Hello", "World"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "de", &BatchFraming::delimited())
            .await
            .unwrap();

        assert_eq!(result, vec!["Hello_de", "World_de"]);
    }

    #[tokio::test]
    async fn test_collision_fails_before_calling_provider() {
        let mock = MockProvider::new(MockMode::NoOp);
        let texts = strings(&["a <|||> b"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "fr", &BatchFraming::delimited()).await;

        assert!(matches!(result, Err(MtError::DelimiterCollision { index: 0, .. })));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_two_segment_reply_for_three_fragments_is_rejected() {
        let mock = MockProvider::new(MockMode::Fixed("A <|||> B".to_string()));
        let texts = strings(&["x", "y", "z"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "fr", &BatchFraming::delimited()).await;

        assert_eq!(result, Err(MtError::ShapeMismatch { expected: 3, actual: 2 }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_four_segment_reply_for_three_fragments_is_rejected() {
        let mock = MockProvider::new(MockMode::Fixed("A <|||> B <|||> C <|||> D".to_string()));
        let texts = strings(&["x", "y", "z"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "fr", &BatchFraming::delimited()).await;

        assert_eq!(result, Err(MtError::ShapeMismatch { expected: 3, actual: 4 }));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let mock = MockProvider::new(MockMode::Error(MtError::Provider("boom".to_string())));
        let texts = strings(&["x", "y"]);

        let result = translate_batch(&client(&mock), &texts, &SourceLanguage::Auto, "fr", &BatchFraming::Indexed).await;

        assert_eq!(result, Err(MtError::Provider("boom".to_string())));
        assert_eq!(mock.call_count(), 1);
    }
}
