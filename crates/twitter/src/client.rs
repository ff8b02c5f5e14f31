//! Twitter API v2 client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tweet_reconciler::{ActualStateService, ActualTweet};
use url::Url;

use crate::config::TwitterConfig;
use crate::error::{Error, Result};
use crate::types::{CreateTweetRequest, CreatedTweet, Deleted, Envelope, TweetData, UserData};

/// Client for the tweets of one account.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    config: Arc<TwitterConfig>,
    http_client: reqwest::Client,
}

impl TwitterClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: TwitterConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Check the credentials and return the account they belong to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the credentials are rejected.
    pub async fn verify_credentials(&self) -> Result<UserData> {
        let url = self.endpoint(&["2", "users", "me"])?;
        let envelope: Envelope<UserData> = self.send(self.http_client.get(url)).await?;

        let account = envelope
            .data
            .ok_or_else(|| Error::invalid_response("credential check returned no user"))?;
        info!(username = %account.username, id = %account.id, "Verified Twitter credentials");
        Ok(account)
    }

    /// Resolve a handle to a user id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] when the handle does not exist.
    pub async fn user_id(&self, username: &str) -> Result<String> {
        let url = self.endpoint(&["2", "users", "by", "username", username])?;
        let envelope: Envelope<UserData> = self.send(self.http_client.get(url)).await?;

        envelope
            .data
            .map(|user| user.id)
            .ok_or_else(|| Error::UserNotFound {
                username: username.to_string(),
            })
    }

    /// List the tweets of a user, newest first, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error when any page request fails or a tweet id is malformed.
    pub async fn user_tweets(&self, user_id: &str) -> Result<Vec<ActualTweet>> {
        let url = self.endpoint(&["2", "users", user_id, "tweets"])?;
        let page_size = self.config.page_size.to_string();
        let mut tweets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(url.clone()).query(&[
                ("max_results", page_size.as_str()),
                ("tweet.fields", "public_metrics"),
            ]);
            if let Some(ref token) = next_token {
                request = request.query(&[("pagination_token", token.as_str())]);
            }

            let page: Envelope<Vec<TweetData>> = self.send(request).await?;
            for tweet in page.data.unwrap_or_default() {
                tweets.push(ActualTweet::try_from(tweet)?);
            }

            next_token = page.meta.and_then(|meta| meta.next_token);
            if next_token.is_none() {
                break;
            }
        }

        debug!(user_id, count = tweets.len(), "Listed tweets");
        Ok(tweets)
    }

    /// Post a tweet and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error when the API rejects the tweet.
    pub async fn post_tweet(&self, text: &str) -> Result<u64> {
        let url = self.endpoint(&["2", "tweets"])?;
        let envelope: Envelope<CreatedTweet> = self
            .send(self.http_client.post(url).json(&CreateTweetRequest { text }))
            .await?;

        let created = envelope
            .data
            .ok_or_else(|| Error::invalid_response("create response has no data"))?;
        let id = crate::types::parse_id(&created.id)?;
        info!(id, "Posted tweet");
        Ok(id)
    }

    /// Delete a tweet by id.
    ///
    /// # Errors
    ///
    /// Returns an error when the API rejects the request or does not confirm deletion.
    pub async fn delete_tweet(&self, id: u64) -> Result<()> {
        let id_segment = id.to_string();
        let url = self.endpoint(&["2", "tweets", id_segment.as_str()])?;
        let envelope: Envelope<Deleted> = self.send(self.http_client.delete(url)).await?;

        match envelope.data {
            Some(Deleted { deleted: true }) => {
                info!(id, "Deleted tweet");
                Ok(())
            }
            _ => Err(Error::invalid_response(format!(
                "deletion of tweet {id} was not confirmed"
            ))),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>> {
        let mut request = request.build()?;
        let authorization = self
            .config
            .credentials
            .authorization(request.method(), request.url())?;
        let authorization =
            HeaderValue::from_str(&authorization).map_err(|e| Error::signing(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        let response = self.http_client.execute(request).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(Error::RateLimited { reset_at });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let status = status.as_u16();
            return Err(match status {
                401 => Error::Unauthorized { status, body },
                _ => Error::Api { status, body },
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        if envelope.data.is_none() {
            if let Some(problem) = envelope.errors.first() {
                debug!(title = %problem.title, detail = %problem.detail, "API reported a problem");
            }
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ActualStateService for TwitterClient {
    type Error = Error;

    async fn list_for_owner(&self, owner: &str) -> Result<Vec<ActualTweet>> {
        let user_id = self.user_id(owner).await?;
        self.user_tweets(&user_id).await
    }

    async fn create(&self, text: &str) -> Result<()> {
        self.post_tweet(text).await.map(|_| ())
    }

    async fn delete(&self, tweet: &ActualTweet) -> Result<()> {
        self.delete_tweet(tweet.external_id).await
    }
}
