//! OAuth 1.0a request signing with HMAC-SHA1.
//!
//! Every request carries an `Authorization: OAuth ...` header signed over the
//! method, the URL without its query, and the sorted query and protocol
//! parameters. JSON bodies are not part of the signature.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use itertools::Itertools;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Method;
use sha1::Sha1;
use url::Url;

use crate::error::{Error, Result};

/// RFC 3986 unreserved characters stay as they are; everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Consumer key pair and access token pair of one account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from the two key pairs.
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// `Authorization` header value for a request, with a fresh nonce and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] when the signing key is rejected.
    pub fn authorization(&self, method: &Method, url: &Url) -> Result<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        self.authorization_with(method, url, &nonce, timestamp)
    }

    /// `Authorization` header value for a fixed nonce and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] when the signing key is rejected.
    pub fn authorization_with(
        &self,
        method: &Method,
        url: &Url,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let protocol = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", OAUTH_VERSION),
        ];
        let signature = self.signature(method, url, &protocol)?;

        let fields = protocol
            .iter()
            .copied()
            .chain(std::iter::once(("oauth_signature", signature.as_str())))
            .sorted_unstable_by_key(|(key, _)| *key)
            .map(|(key, value)| format!("{key}=\"{}\"", encode(value)))
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }

    fn signature(&self, method: &Method, url: &Url, protocol: &[(&str, &str)]) -> Result<String> {
        let parameters = url
            .query_pairs()
            .map(|(key, value)| (encode(&key), encode(&value)))
            .chain(protocol.iter().map(|(key, value)| (encode(key), encode(value))))
            .sorted()
            .map(|(key, value)| format!("{key}={value}"))
            .join("&");

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let base_string = format!(
            "{}&{}&{}",
            method.as_str(),
            encode(base_url.as_str()),
            encode(&parameters)
        );
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
            .map_err(|e| Error::signing(e.to_string()))?;
        mac.update(base_string.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn documented_credentials() -> Credentials {
        Credentials::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
    }

    #[test]
    fn test_signature_matches_documented_example() -> TestResult {
        let url = Url::parse(
            "https://api.twitter.com/1.1/statuses/update.json?include_entities=true\
             &status=Hello%20Ladies%20%2B%20Gentlemen%2C%20a%20signed%20OAuth%20request%21",
        )?;

        let header = documented_credentials().authorization_with(
            &Method::POST,
            &url,
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            1_318_622_958,
        )?;

        assert_eq!(
            header,
            "OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", \
             oauth_nonce=\"kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg\", \
             oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\", \
             oauth_signature_method=\"HMAC-SHA1\", \
             oauth_timestamp=\"1318622958\", \
             oauth_token=\"370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb\", \
             oauth_version=\"1.0\""
        );
        Ok(())
    }

    #[test]
    fn test_query_changes_signature() -> TestResult {
        let credentials = documented_credentials();
        let first = Url::parse("https://api.twitter.com/2/users/1/tweets?max_results=100")?;
        let second = Url::parse("https://api.twitter.com/2/users/1/tweets?max_results=5")?;

        let a = credentials.authorization_with(&Method::GET, &first, "nonce", 1)?;
        let b = credentials.authorization_with(&Method::GET, &second, "nonce", 1)?;

        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_fresh_nonce_per_request() -> TestResult {
        let credentials = documented_credentials();
        let url = Url::parse("https://api.twitter.com/2/users/me")?;

        let a = credentials.authorization(&Method::GET, &url)?;
        let b = credentials.authorization(&Method::GET, &url)?;

        assert!(a.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", documented_credentials());

        assert!(rendered.contains("xvz1evFS4wEEPTGEFPHBog"));
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(!rendered.contains("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"));
    }
}
