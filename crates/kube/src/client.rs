//! REST client for `Tweet` resources.

use async_trait::async_trait;
use reqwest::{Certificate, Identity, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use tweet_reconciler::{DesiredStateStore, DesiredTweet, TweetStatus};
use url::Url;

use crate::config::KubeConfig;
use crate::error::{Error, Result};
use crate::resource::{GROUP, PLURAL, TweetResource, TweetResourceList, VERSION};

/// Client for the `Tweet` resources of one namespace.
#[derive(Debug, Clone)]
pub struct TweetClient {
    /// Collection URL, `.../apis/example.com/v1/namespaces/{ns}/tweets`.
    collection: Url,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl TweetClient {
    /// Create a client from resolved cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the CA bundle or client identity is invalid, the
    /// HTTP client cannot be built, or the server URL cannot carry a path.
    pub fn new(config: &KubeConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);
        if let Some(ref pem) = config.ca_pem {
            for cert in Certificate::from_pem_bundle(pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(ref pem) = config.identity_pem {
            builder = builder.identity(Identity::from_pem(pem)?);
        }

        Ok(Self {
            collection: collection_url(&config.server, &config.namespace)?,
            token: config.token.clone(),
            http_client: builder.build()?,
        })
    }

    /// Fetch one resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on 404 and [`Error::Api`] on other failures.
    pub async fn get_resource(&self, name: &str) -> Result<TweetResource> {
        let url = self.item_url(name)?;
        debug!(%url, "Getting tweet resource");
        self.send(self.http_client.get(url), Some(name)).await
    }

    /// List all resources in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] when the server rejects the request.
    pub async fn list_resources(&self) -> Result<Vec<TweetResource>> {
        debug!(url = %self.collection, "Listing tweet resources");
        let list: TweetResourceList = self
            .send(self.http_client.get(self.collection.clone()), None)
            .await?;
        Ok(list.items)
    }

    /// Replace a resource, including its status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on conflicts and other rejections.
    pub async fn replace_resource(&self, resource: &TweetResource) -> Result<TweetResource> {
        let name = resource.metadata.name.as_str();
        let url = self.item_url(name)?;
        debug!(%url, "Replacing tweet resource");
        self.send(self.http_client.put(url).json(resource), Some(name))
            .await
    }

    fn item_url(&self, name: &str) -> Result<Url> {
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|()| Error::invalid_config("server URL cannot be a base"))?
            .push(name);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        name: Option<&str>,
    ) -> Result<T> {
        let request = match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(name) = name {
                return Err(Error::not_found(name));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

fn collection_url(server: &Url, namespace: &str) -> Result<Url> {
    let mut url = server.clone();
    url.path_segments_mut()
        .map_err(|()| Error::invalid_config(format!("server URL '{server}' cannot be a base")))?
        .pop_if_empty()
        .extend(["apis", GROUP, VERSION, "namespaces", namespace, PLURAL]);
    Ok(url)
}

#[async_trait]
impl DesiredStateStore for TweetClient {
    type Error = Error;

    async fn get(&self, name: &str) -> Result<DesiredTweet> {
        self.get_resource(name).await.map(DesiredTweet::from)
    }

    async fn list(&self) -> Result<Vec<DesiredTweet>> {
        let resources = self.list_resources().await?;
        Ok(resources.into_iter().map(DesiredTweet::from).collect())
    }

    async fn set_status(&self, name: &str, status: &TweetStatus) -> Result<()> {
        let mut resource = self.get_resource(name).await?;
        resource.status = Some(*status);
        self.replace_resource(&resource).await?;
        Ok(())
    }
}
