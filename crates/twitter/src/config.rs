//! Configuration for the Twitter client.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::oauth::Credentials;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.twitter.com";

/// Environment variable holding the consumer (API) key.
pub const CONSUMER_KEY_ENV: &str = "CONSUMER_KEY";
/// Environment variable holding the consumer (API) secret.
pub const CONSUMER_SECRET_ENV: &str = "CONSUMER_SECRET";
/// Environment variable holding the account's access token.
pub const ACCESS_TOKEN_ENV: &str = "ACCESS_TOKEN";
/// Environment variable holding the account's access token secret.
pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
/// Environment variable overriding the API endpoint.
pub const API_URL_ENV: &str = "TWITTER_API_URL";

/// Configuration for the [`TwitterClient`](crate::TwitterClient).
///
/// The account whose tweets are managed is the one the access token belongs to.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// API base URL.
    pub base_url: Url,
    /// OAuth 1.0a credentials.
    pub credentials: Credentials,
    /// Timeout for requests.
    pub timeout: Duration,
    /// Page size when listing tweets (5..=100).
    pub page_size: u8,
}

impl TwitterConfig {
    /// Create a config against the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the default URL fails to parse.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(DEFAULT_API_URL)?,
            credentials,
            timeout: Duration::from_secs(30),
            page_size: 100,
        })
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] when a required variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] when a required variable is unset or empty,
    /// or [`Error::UrlParse`] when the API URL override is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(Error::MissingEnv { key })
        };

        let credentials = Credentials::new(
            required(CONSUMER_KEY_ENV)?,
            required(CONSUMER_SECRET_ENV)?,
            required(ACCESS_TOKEN_ENV)?,
            required(ACCESS_TOKEN_SECRET_ENV)?,
        );
        let mut config = Self::new(credentials)?;
        if let Some(url) = lookup(API_URL_ENV).filter(|value| !value.is_empty()) {
            config.base_url = Url::parse(&url)?;
        }
        Ok(config)
    }
}
