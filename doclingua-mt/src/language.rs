//! Language arguments
//!
//! Languages are passed to the model by name ("Arabic", "Chinese
//! (Simplified)") or by code ("fr", "pt-BR"); both reach the prompt verbatim
//! once validated.

use crate::error::{MtError, MtResult};
use std::fmt;

/// Source value meaning "detect the language"
pub const AUTO: &str = "auto";

/// Longest accepted language argument, in characters
pub const MAX_LANGUAGE_LEN: usize = 64;

/// Validate a language argument and return it trimmed
///
/// # Example
///
/// ```ignore
/// assert_eq!(validate_language(" Arabic ")?, "Arabic");
/// assert!(validate_language("").is_err());
/// ```
pub fn validate_language(language: &str) -> MtResult<String> {
    let language = language.trim();
    if language.is_empty() {
        return Err(MtError::InvalidLanguage(
            "Language is empty".to_string(),
        ));
    }
    if language.chars().count() > MAX_LANGUAGE_LEN {
        return Err(MtError::InvalidLanguage(format!(
            "Language exceeds {} characters",
            MAX_LANGUAGE_LEN
        )));
    }
    if language.chars().any(char::is_control) {
        return Err(MtError::InvalidLanguage(
            "Language contains control characters".to_string(),
        ));
    }
    Ok(language.to_string())
}

/// Language of the text being translated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceLanguage {
    /// Let the model detect it
    #[default]
    Auto,
    Named(String),
}

impl SourceLanguage {
    /// Parse an optional source argument; missing, blank and `auto` all mean
    /// detection
    pub fn parse(raw: Option<&str>) -> MtResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Auto),
            Some(value) if value.eq_ignore_ascii_case(AUTO) => Ok(Self::Auto),
            Some(value) => validate_language(value).map(Self::Named),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "{}", AUTO),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}
