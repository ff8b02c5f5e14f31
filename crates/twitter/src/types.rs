//! Twitter API v2 payloads.

use serde::{Deserialize, Serialize};
use tweet_reconciler::ActualTweet;

use crate::error::{Error, Result};

/// Standard v2 response envelope. `data` is absent on empty results and on
/// lookups that failed with a per-item error.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<Problem>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Per-item error in a 200 response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub public_metrics: PublicMetrics,
}

impl TryFrom<TweetData> for ActualTweet {
    type Error = Error;

    fn try_from(tweet: TweetData) -> Result<Self> {
        let external_id = parse_id(&tweet.id)?;
        Ok(Self::new(external_id, unescape_entities(&tweet.text)).with_counts(
            tweet.public_metrics.like_count,
            tweet.public_metrics.retweet_count,
            tweet.public_metrics.reply_count,
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// Parse a v2 string id.
pub(crate) fn parse_id(id: &str) -> Result<u64> {
    id.parse()
        .map_err(|_| Error::invalid_response(format!("tweet id '{id}' is not numeric")))
}

/// Undo the HTML escaping the API applies to tweet text.
///
/// Posted text goes out raw and comes back with `&`, `<` and `>` escaped;
/// text matching needs the raw form.
pub(crate) fn unescape_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
