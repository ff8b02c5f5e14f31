//! Twitter API v2 client.
//!
//! Implements [`tweet_reconciler::ActualStateService`] for the tweets of one
//! account, with every request signed by OAuth 1.0a user credentials.

pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod types;

pub use client::TwitterClient;
pub use config::{
    ACCESS_TOKEN_ENV, ACCESS_TOKEN_SECRET_ENV, API_URL_ENV, CONSUMER_KEY_ENV, CONSUMER_SECRET_ENV,
    DEFAULT_API_URL, TwitterConfig,
};
pub use error::{Error, Result};
pub use oauth::Credentials;
