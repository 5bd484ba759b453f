//! Runtime configuration and the shared translator state

use crate::client::TranslationClient;
use crate::error::{MtError, MtResult};
use crate::gemini::GeminiProvider;
use crate::pipeline::Strategy;
use crate::provider::TranslationProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Translation settings, normally read from the environment
///
/// | Variable | Default |
/// |---|---|
/// | `GEMINI_API_KEY` | none; required for the real provider |
/// | `GEMINI_MODEL` | `gemini-1.5-flash` |
/// | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com/v1beta` |
/// | `DOCLINGUA_TIMEOUT_SECS` | `60` |
/// | `DOCLINGUA_STRATEGY` | `batch` |
/// | `DOCLINGUA_CONCURRENCY` | `4` |
#[derive(Clone)]
pub struct MtConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub strategy: Strategy,
    pub concurrency: usize,
}

impl Default for MtConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            strategy: Strategy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl MtConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> MtResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> MtResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.api_key = get("GEMINI_API_KEY");
        if let Some(model) = get("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("DOCLINGUA_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                MtError::Config(format!("DOCLINGUA_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            if secs == 0 {
                return Err(MtError::Config(
                    "DOCLINGUA_TIMEOUT_SECS must be at least 1".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(strategy) = get("DOCLINGUA_STRATEGY") {
            config.strategy = strategy.parse()?;
        }
        if let Some(concurrency) = get("DOCLINGUA_CONCURRENCY") {
            let concurrency: usize = concurrency.parse().map_err(|_| {
                MtError::Config(format!(
                    "DOCLINGUA_CONCURRENCY is not a number: {}",
                    concurrency
                ))
            })?;
            config.concurrency = concurrency.max(1);
        }
        Ok(config)
    }
}

impl std::fmt::Debug for MtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MtConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("strategy", &self.strategy)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

/// Translator built once at start-up and shared by every request
///
/// A failed initialisation is kept as a value; each request that needs the
/// translator reports the stored reason instead of retrying.
#[derive(Debug, Clone)]
pub enum TranslatorState {
    Ready(Arc<TranslationClient>),
    Unavailable(String),
}

impl TranslatorState {
    /// Build the Gemini-backed translator described by `config`
    pub fn from_config(config: &MtConfig) -> Self {
        match GeminiProvider::from_config(config) {
            Ok(provider) => {
                info!(
                    provider = provider.provider_name(),
                    model = %config.model,
                    "Translator ready"
                );
                Self::with_provider(Arc::new(provider), config.timeout)
            }
            Err(e) => {
                let reason = match e {
                    MtError::Config(reason) => reason,
                    other => other.to_string(),
                };
                warn!(reason = %reason, "Translator unavailable");
                Self::Unavailable(reason)
            }
        }
    }

    pub fn with_provider(provider: Arc<dyn TranslationProvider>, timeout: Duration) -> Self {
        Self::Ready(Arc::new(TranslationClient::new(provider, timeout)))
    }

    /// The shared client, or the stored initialisation failure
    pub fn client(&self) -> MtResult<Arc<TranslationClient>> {
        match self {
            Self::Ready(client) => Ok(Arc::clone(client)),
            Self::Unavailable(reason) => Err(MtError::Config(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Ready(client) => Some(client.provider_name()),
            Self::Unavailable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMode, MockProvider};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MtConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.strategy, Strategy::Batch);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_overrides() {
        let config = MtConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_BASE_URL", "http://localhost:8080/v1beta/"),
            ("DOCLINGUA_TIMEOUT_SECS", "15"),
            ("DOCLINGUA_STRATEGY", "per-fragment"),
            ("DOCLINGUA_CONCURRENCY", "8"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.base_url, "http://localhost:8080/v1beta");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.strategy, Strategy::PerFragment);
        assert_eq!(config.concurrency, 8);
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = MtConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_concurrency_clamped() {
        let config = MtConfig::from_lookup(lookup(&[("DOCLINGUA_CONCURRENCY", "0")])).unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            MtConfig::from_lookup(lookup(&[("DOCLINGUA_TIMEOUT_SECS", "soon")])),
            Err(MtError::Config(_))
        ));
        assert!(matches!(
            MtConfig::from_lookup(lookup(&[("DOCLINGUA_TIMEOUT_SECS", "0")])),
            Err(MtError::Config(_))
        ));
        assert!(matches!(
            MtConfig::from_lookup(lookup(&[("DOCLINGUA_STRATEGY", "yolo")])),
            Err(MtError::Config(_))
        ));
    }

    #[test]
    fn test_debug_masks_key() {
        let config = MtConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "secret")])).unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("***"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_state_without_key_is_unavailable() {
        let state = TranslatorState::from_config(&MtConfig::default());
        assert!(!state.is_ready());
        assert_eq!(state.provider_name(), None);
        match state.client() {
            Err(MtError::Config(reason)) => assert!(reason.contains("GEMINI_API_KEY")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_reason_is_stable() {
        let state = TranslatorState::Unavailable("no key".to_string());
        assert_eq!(state.client().unwrap_err(), MtError::Config("no key".to_string()));
        assert_eq!(state.client().unwrap_err(), MtError::Config("no key".to_string()));
    }

    #[test]
    fn test_state_with_key_is_ready() {
        let config = MtConfig {
            api_key: Some("test-key".to_string()),
            ..MtConfig::default()
        };
        let state = TranslatorState::from_config(&config);
        assert!(state.is_ready());
        assert_eq!(state.provider_name(), Some("Gemini"));
    }

    #[test]
    fn test_state_with_provider() {
        let state = TranslatorState::with_provider(
            Arc::new(MockProvider::new(MockMode::NoOp)),
            Duration::from_secs(1),
        );
        let client = state.client().unwrap();
        assert_eq!(client.provider_name(), "Mock Provider");
        assert_eq!(client.timeout(), Duration::from_secs(1));
    }
}
