//! Structure-preserving document model for in-place translation
//!
//! A `.docx` package is parsed into an ordered tree of paragraphs and tables.
//! The non-empty paragraphs are exposed as [`Fragment`]s in a fixed order:
//! every body paragraph first, then table cells row by row. After the
//! fragment texts are translated, [`DocxDocument::reassemble`] writes them
//! back into the very same paragraphs and [`DocxDocument::to_bytes`] produces
//! a package whose styles, tables and untouched parts are unchanged.
//!
//! PDFs and slide decks have no reassembly path; [`extract`] flattens them to
//! plain text instead.
//!
//! ```ignore
//! use doclingua::DocxDocument;
//!
//! let mut document = DocxDocument::parse(&std::fs::read("report.docx")?)?;
//! let fragments = document.fragments();
//! let translated = vec!["Bonjour".to_string(); fragments.len()];
//! document.reassemble(&fragments, &translated);
//! std::fs::write("translated_report.docx", document.to_bytes()?)?;
//! ```

pub mod docx;
pub mod error;
pub mod extract;
pub mod format;
pub mod model;
pub mod package;

pub use docx::DocxDocument;
pub use error::{DocError, DocResult};
pub use format::{DOCX_MIME, DocumentFormat, translated_file_name};
pub use model::{Cell, Fragment, Node, ParagraphHandle, Row, Shape, Table};
