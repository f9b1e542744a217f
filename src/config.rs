//! Runtime configuration.
//!
//! Resolved once at startup from the process environment (after `.env` is
//! loaded) and then passed into the services. Parsing goes through a lookup
//! function so tests never touch process-wide variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::chatbot::{DEFAULT_MAX_FORWARDED_TURNS, HistoryPolicy};
use crate::services::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::services::model_client::RetryPolicy;
use crate::services::session_manager::DEFAULT_MAX_TRANSCRIPT_LEN;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub request_timeout: Duration,
    pub session_ttl: Duration,
    pub max_transcript_len: usize,
    pub admin_key: Option<String>,
    pub history_policy: HistoryPolicy,
    pub retry: RetryPolicy,
}

// Keep secrets out of logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("session_ttl", &self.session_ttl)
            .field("max_transcript_len", &self.max_transcript_len)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "<redacted>"))
            .field("history_policy", &self.history_policy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini_api_key = get("GEMINI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let gemini_base_url = get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(gemini_base_url.starts_with("http://") || gemini_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "GEMINI_BASE_URL",
                value: gemini_base_url,
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let bind_addr = parse_or("MODOC_BIND_ADDR", get("MODOC_BIND_ADDR"), || {
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
        })?;

        let timeout_secs: u64 = parse_or("MODOC_REQUEST_TIMEOUT_SECS", get("MODOC_REQUEST_TIMEOUT_SECS"), || {
            DEFAULT_REQUEST_TIMEOUT_SECS
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "MODOC_REQUEST_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let ttl_secs: u64 = parse_or("MODOC_SESSION_TTL_SECS", get("MODOC_SESSION_TTL_SECS"), || {
            DEFAULT_SESSION_TTL_SECS
        })?;

        let max_transcript_len: usize = parse_or("MODOC_MAX_TRANSCRIPT_LEN", get("MODOC_MAX_TRANSCRIPT_LEN"), || {
            DEFAULT_MAX_TRANSCRIPT_LEN
        })?;
        if max_transcript_len < 2 {
            return Err(ConfigError::Invalid {
                key: "MODOC_MAX_TRANSCRIPT_LEN",
                value: max_transcript_len.to_string(),
                reason: "must hold at least one full turn".to_string(),
            });
        }

        let forward_history = parse_bool("MODOC_FORWARD_CHAT_HISTORY", get("MODOC_FORWARD_CHAT_HISTORY"))?;
        let max_forwarded_turns: usize = parse_or("MODOC_MAX_FORWARDED_TURNS", get("MODOC_MAX_FORWARDED_TURNS"), || {
            DEFAULT_MAX_FORWARDED_TURNS
        })?;
        let max_retries: u32 = parse_or("MODOC_MAX_RETRIES", get("MODOC_MAX_RETRIES"), || 0)?;
        let base_delay_ms: u64 = parse_or("MODOC_RETRY_BASE_DELAY_MS", get("MODOC_RETRY_BASE_DELAY_MS"), || {
            DEFAULT_RETRY_BASE_DELAY_MS
        })?;

        Ok(Self {
            bind_addr,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            session_ttl: Duration::from_secs(ttl_secs),
            max_transcript_len,
            admin_key: get("MODOC_ADMIN_KEY"),
            history_policy: if forward_history {
                HistoryPolicy::Forward { max_turns: max_forwarded_turns }
            } else {
                HistoryPolicy::Ignore
            },
            retry: RetryPolicy::new(max_retries, Duration::from_millis(base_delay_ms)),
        })
    }
}

fn parse_or<T, D>(key: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: FnOnce() -> T,
{
    match raw {
        None => Ok(default()),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let normalized = raw.as_deref().map(str::to_ascii_lowercase);
    match normalized.as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.history_policy, HistoryPolicy::Ignore);
        assert_eq!(config.max_transcript_len, DEFAULT_MAX_TRANSCRIPT_LEN);
        assert_eq!(config.retry.max_retries, 0);
        assert!(config.admin_key.is_none());
    }

    #[test]
    fn api_key_is_required() {
        assert_eq!(
            config_from(&[]).err(),
            Some(ConfigError::Missing("GEMINI_API_KEY"))
        );
        assert!(config_from(&[("GOOGLE_API_KEY", "k")]).is_ok());
        assert!(config_from(&[("GEMINI_API_KEY", "   ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "k"),
            ("MODOC_BIND_ADDR", "127.0.0.1:8080"),
            ("MODOC_FORWARD_CHAT_HISTORY", "TRUE"),
            ("MODOC_MAX_RETRIES", "3"),
            ("MODOC_RETRY_BASE_DELAY_MS", "100"),
            ("MODOC_ADMIN_KEY", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.history_policy, HistoryPolicy::forward());
        assert_eq!(config.retry, RetryPolicy::new(3, Duration::from_millis(100)));
        assert_eq!(config.admin_key.as_deref(), Some("s3cret"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn history_limits_are_parsed() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "k"),
            ("MODOC_FORWARD_CHAT_HISTORY", "yes"),
            ("MODOC_MAX_FORWARDED_TURNS", "6"),
            ("MODOC_MAX_TRANSCRIPT_LEN", "40"),
        ])
        .unwrap();
        assert_eq!(config.history_policy, HistoryPolicy::Forward { max_turns: 6 });
        assert_eq!(config.max_transcript_len, 40);

        assert!(matches!(
            config_from(&[("GEMINI_API_KEY", "k"), ("MODOC_MAX_TRANSCRIPT_LEN", "1")]),
            Err(ConfigError::Invalid { key: "MODOC_MAX_TRANSCRIPT_LEN", .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("GEMINI_API_KEY", "k"), ("MODOC_MAX_RETRIES", "many")]),
            Err(ConfigError::Invalid { key: "MODOC_MAX_RETRIES", .. })
        ));
        assert!(matches!(
            config_from(&[("GEMINI_API_KEY", "k"), ("MODOC_REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { key: "MODOC_REQUEST_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            config_from(&[("GEMINI_API_KEY", "k"), ("GEMINI_BASE_URL", "ftp://x")]),
            Err(ConfigError::Invalid { key: "GEMINI_BASE_URL", .. })
        ));
        assert!(matches!(
            config_from(&[("GEMINI_API_KEY", "k"), ("MODOC_FORWARD_CHAT_HISTORY", "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
