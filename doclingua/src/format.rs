//! Recognised upload formats

use serde::Serialize;
use std::fmt;

/// MIME type of `.docx` output
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Formats accepted for translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Word-processor document, translated in place
    Docx,
    Pdf,
    /// Slide deck
    Pptx,
    Png,
    Jpeg,
}

impl DocumentFormat {
    /// Detect the format from a file name, falling back to the declared
    /// content type
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(DocumentFormat::detect("report.DOCX", None), Some(DocumentFormat::Docx));
    /// assert_eq!(DocumentFormat::detect("blob", Some("application/pdf")), Some(DocumentFormat::Pdf));
    /// ```
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        let by_extension = match extension.as_deref() {
            Some("docx") => Some(Self::Docx),
            Some("pdf") => Some(Self::Pdf),
            Some("pptx") => Some(Self::Pptx),
            Some("png") => Some(Self::Png),
            Some("jpg") | Some("jpeg") => Some(Self::Jpeg),
            _ => None,
        };

        by_extension.or_else(|| content_type.and_then(Self::from_mime))
    }

    /// Map a MIME type (parameters ignored) to a format
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
        match essence.as_str() {
            DOCX_MIME => Some(Self::Docx),
            "application/pdf" => Some(Self::Pdf),
            PPTX_MIME => Some(Self::Pptx),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Docx => DOCX_MIME,
            Self::Pdf => "application/pdf",
            Self::Pptx => PPTX_MIME,
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Images carry no text layer; their text comes from the provider
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        };
        write!(f, "{}", name)
    }
}

/// Name for a translated upload: `translated_<stem>.docx`
pub fn translated_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let stem = if stem.trim().is_empty() { "document" } else { stem };
    format!("translated_{}.docx", stem)
}
