use crate::feeds::{coingecko::DEFAULT_MARKETS_URL, cycles::DEFAULT_WEBHOOK_URL};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const API_KEY_VAR: &str = "CYCLES_API_KEY";
pub const MARKETS_URL_VAR: &str = "COINGECKO_API_URL";
pub const WEBHOOK_URL_VAR: &str = "CYCLES_WEBHOOK_URL";
pub const TIMEOUT_VAR: &str = "HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Values people leave in `.env` templates
const PLACEHOLDER_KEYS: &[&str] = &["REDACTED", "your_api_key_here", "changeme", "<api_key>"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("CYCLES_API_KEY is not set, add it to .env or the environment")]
    MissingApiKey,
    #[error("CYCLES_API_KEY still holds a placeholder, replace it with your actual API key")]
    PlaceholderApiKey,
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Secret for the ingestion API
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 characters followed by an ellipsis, for logs
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_key: Option<ApiKey>,
    pub markets_url: String,
    pub webhook_url: String,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) => tracing::debug!("No .env loaded: {}", e),
        }

        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let http_timeout = match get(TIMEOUT_VAR) {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: TIMEOUT_VAR.to_string(),
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            api_key: get(API_KEY_VAR).map(ApiKey::new),
            markets_url: get(MARKETS_URL_VAR).unwrap_or_else(|| DEFAULT_MARKETS_URL.to_string()),
            webhook_url: get(WEBHOOK_URL_VAR).unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string()),
            http_timeout,
        })
    }

    /// The ingestion key, rejected when missing or still a placeholder
    pub fn api_key(&self) -> Result<ApiKey, ConfigError> {
        let key = self.api_key.as_ref().ok_or(ConfigError::MissingApiKey)?;

        if PLACEHOLDER_KEYS
            .iter()
            .any(|p| p.eq_ignore_ascii_case(key.expose()))
        {
            return Err(ConfigError::PlaceholderApiKey);
        }

        Ok(key.clone())
    }
}
