//! Machine translation for doclingua documents
//!
//! This crate translates the fragments of a [`doclingua::DocxDocument`]
//! through a generative-language provider and writes the results back in
//! place. PDFs, slide decks and images are flattened to text and returned as
//! a new document.
//!
//! # Workflow Example
//!
//! ```ignore
//! use doclingua_mt::{MtConfig, TranslateOptions, TranslatorState, translate_upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Build the translator once
//!     let config = MtConfig::from_env()?;
//!     let client = TranslatorState::from_config(&config).client()?;
//!
//!     // 2. Translate an upload
//!     let bytes = std::fs::read("report.docx")?;
//!     let options = TranslateOptions::new("Arabic")?.with_strategy(config.strategy);
//!     let output = translate_upload(&client, "report.docx", None, &bytes, &options).await?;
//!
//!     // 3. Save the result
//!     std::fs::write(&output.file_name, &output.bytes)?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod language;
pub mod mock;
pub mod per_fragment;
pub mod pipeline;
pub mod prompts;
pub mod provider;


// Re-export main types for convenient access
pub use batch::{BatchFraming, DEFAULT_DELIMITER, translate_batch};
pub use client::TranslationClient;
pub use config::{MtConfig, TranslatorState};
pub use doclingua::DocumentFormat;
pub use error::{MtError, MtResult};
pub use gemini::GeminiProvider;
pub use language::{SourceLanguage, validate_language};
pub use mock::{MockMode, MockProvider, RecordedCall};
pub use per_fragment::{FragmentOutcome, FragmentStatus, translate_each};
pub use pipeline::{
    Strategy, TranslateOptions, TranslatedFile, TranslationReport, translate_docx, translate_text,
    translate_upload,
};
pub use provider::{MediaPart, Prompt, TranslationProvider};
