//! Client configuration.
//!
//! Only the service base URL is configurable. Endpoint paths on descriptors
//! are relative to it, so the base is normalised to end with `/`.

use thiserror::Error;
use url::Url;

/// Production web-client base URL.
pub const DEFAULT_BASE_URL: &str = "https://play.google.com/music/";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "WEBCALL_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL {0:?} cannot carry endpoint paths")]
    NotABase(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let mut normalised = base_url.trim().to_string();
        if !normalised.ends_with('/') {
            normalised.push('/');
        }
        let url = Url::parse(&normalised).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(base_url.to_string()));
        }
        Ok(Self { base_url: url })
    }

    /// Read `WEBCALL_BASE_URL`, falling back to `DEFAULT_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(&url),
            _ => Self::new(DEFAULT_BASE_URL),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}
