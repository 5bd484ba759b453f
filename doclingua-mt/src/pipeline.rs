//! Upload pipeline: detect, extract, translate, reassemble
//!
//! Word-processor uploads are translated in place and keep their structure.
//! PDFs, slide decks and images are flattened to text, translated as one
//! piece, and returned as a new single-paragraph document.

use crate::batch::{BatchFraming, translate_batch};
use crate::client::TranslationClient;
use crate::error::{MtError, MtResult};
use crate::language::{SourceLanguage, validate_language};
use crate::per_fragment::translate_each;
use crate::provider::MediaPart;
use doclingua::{DOCX_MIME, DocResult, DocumentFormat, DocxDocument, extract, translated_file_name};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How the fragments of a word-processor document are sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One call, index-tagged JSON framing
    #[default]
    Batch,
    /// One call, delimiter framing
    BatchDelimited,
    /// One call per fragment; failures keep the original text
    PerFragment,
}

impl Strategy {
    /// Framing for the batch strategies
    pub fn framing(&self) -> Option<BatchFraming> {
        match self {
            Strategy::Batch => Some(BatchFraming::Indexed),
            Strategy::BatchDelimited => Some(BatchFraming::delimited()),
            Strategy::PerFragment => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Batch => "batch",
            Strategy::BatchDelimited => "batch-delimited",
            Strategy::PerFragment => "per-fragment",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = MtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Strategy::Batch),
            "batch-delimited" => Ok(Strategy::BatchDelimited),
            "per-fragment" => Ok(Strategy::PerFragment),
            other => Err(MtError::Config(format!(
                "Unknown strategy '{}' (expected batch, batch-delimited or per-fragment)",
                other
            ))),
        }
    }
}

/// Per-request translation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    pub source: SourceLanguage,
    pub target: String,
    pub strategy: Strategy,
    pub concurrency: usize,
}

impl TranslateOptions {
    /// Options for `target`, auto-detected source, default strategy
    pub fn new(target: &str) -> MtResult<Self> {
        Ok(Self {
            source: SourceLanguage::Auto,
            target: validate_language(target)?,
            strategy: Strategy::default(),
            concurrency: crate::config::DEFAULT_CONCURRENCY,
        })
    }

    pub fn with_source(mut self, source: SourceLanguage) -> Self {
        self.source = source;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// What a translation did, for logs and response headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    pub format: DocumentFormat,
    /// Strategy used for word-processor input; `None` for flattened input
    pub strategy: Option<Strategy>,
    pub fragments: usize,
    /// Fragments that kept their original text
    pub fallbacks: Vec<usize>,
}

impl TranslationReport {
    fn flattened(format: DocumentFormat) -> Self {
        Self {
            format,
            strategy: None,
            fragments: 1,
            fallbacks: Vec::new(),
        }
    }
}

/// Translated output ready to send back
#[derive(Debug, Clone)]
pub struct TranslatedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
    pub report: TranslationReport,
}

/// Translate a free-standing text
///
/// Blank text is rejected without calling the provider.
pub async fn translate_text(
    client: &TranslationClient,
    text: &str,
    options: &TranslateOptions,
) -> MtResult<String> {
    if text.trim().is_empty() {
        return Err(MtError::InvalidInput("Text is empty".to_string()));
    }
    client.translate(text, &options.target, &options.source).await
}

/// Translate every fragment of `document` in place
///
/// With a batch strategy a rejected batch leaves the document untouched and
/// returns the error. With the per-fragment strategy the document is always
/// rewritten and failed fragments are listed in the report. `label` names
/// the document in logs.
pub async fn translate_docx(
    client: &TranslationClient,
    document: &mut DocxDocument,
    options: &TranslateOptions,
    label: &str,
) -> MtResult<TranslationReport> {
    let fragments = document.fragments();
    let mut report = TranslationReport {
        format: DocumentFormat::Docx,
        strategy: Some(options.strategy),
        fragments: fragments.len(),
        fallbacks: Vec::new(),
    };
    if fragments.is_empty() {
        debug!(document = label, "Document has no text to translate");
        return Ok(report);
    }

    let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
    let translated = match options.strategy.framing() {
        Some(framing) => {
            translate_batch(client, &texts, &options.source, &options.target, &framing).await?
        }
        None => {
            let outcomes = translate_each(
                client,
                &texts,
                &options.source,
                &options.target,
                options.concurrency,
                label,
            )
            .await;
            report.fallbacks = outcomes
                .iter()
                .enumerate()
                .filter(|(_, outcome)| outcome.is_fallback())
                .map(|(index, _)| index)
                .collect();
            outcomes.into_iter().map(|outcome| outcome.text).collect()
        }
    };

    document.reassemble(&fragments, &translated);
    Ok(report)
}

/// Translate an uploaded file and produce a `.docx`
pub async fn translate_upload(
    client: &TranslationClient,
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    options: &TranslateOptions,
) -> MtResult<TranslatedFile> {
    if bytes.is_empty() {
        return Err(MtError::InvalidInput("Uploaded file is empty".to_string()));
    }
    let format = DocumentFormat::detect(file_name, content_type).ok_or_else(|| {
        MtError::UnsupportedFormat(format!(
            "'{}' (supported: .docx, .pdf, .pptx, .png, .jpg)",
            file_name
        ))
    })?;

    info!(
        document = file_name,
        format = %format,
        source = %options.source,
        target_lang = %options.target,
        provider = client.provider_name(),
        "Translating document"
    );

    let (output, report) = match format {
        DocumentFormat::Docx => {
            let owned = bytes.to_vec();
            let mut document = blocking(move || DocxDocument::parse(&owned)).await?;
            let report = translate_docx(client, &mut document, options, file_name)
                .await
                .inspect_err(|e| {
                    warn!(document = file_name, target_lang = %options.target, error = %e, "Document translation failed");
                })?;
            (blocking(move || document.to_bytes()).await?, report)
        }
        _ if format.is_image() => {
            let image = MediaPart::new(format.mime_type(), bytes.to_vec());
            let translated = client.translate_image(&image, &options.target).await?;
            if translated.is_empty() {
                return Err(MtError::InvalidInput("No text found in image".to_string()));
            }
            (
                plain_text_docx(translated).await?,
                TranslationReport::flattened(format),
            )
        }
        _ => {
            let owned = bytes.to_vec();
            let text = match format {
                DocumentFormat::Pdf => blocking(move || extract::pdf_text(&owned)).await?,
                _ => blocking(move || extract::slide_text(&owned)).await?,
            };
            if text.trim().is_empty() {
                return Err(MtError::InvalidInput(format!(
                    "No extractable text in {} file",
                    format
                )));
            }
            debug!(document = file_name, chars = text.chars().count(), "Extracted text");
            let translated = client.translate(&text, &options.target, &options.source).await?;
            (
                plain_text_docx(translated).await?,
                TranslationReport::flattened(format),
            )
        }
    };

    info!(
        document = file_name,
        fragments = report.fragments,
        fallbacks = report.fallbacks.len(),
        "Document translated"
    );

    Ok(TranslatedFile {
        bytes: output,
        file_name: translated_file_name(file_name),
        mime_type: DOCX_MIME,
        report,
    })
}

/// Run CPU-bound document work off the async workers
async fn blocking<T, F>(task: F) -> MtResult<T>
where
    F: FnOnce() -> DocResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| MtError::Internal(format!("Document task panicked: {}", e)))?;
    Ok(result?)
}

async fn plain_text_docx(text: String) -> MtResult<Vec<u8>> {
    blocking(move || DocxDocument::from_plain_text(&text)?.to_bytes()).await
}
