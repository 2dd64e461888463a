use async_trait::async_trait;
use reqwest::{redirect, Client, ClientBuilder};
use url::Url;

use crate::config::LoaderConfig;
use crate::error::FetchError;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Where the body actually came from, after any redirects.
    pub final_url: Url,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used by [`crate::PageLoader`]. Redirects and retries are the
/// implementation's business.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &LoaderConfig) -> Result<Self, FetchError> {
        let client = Self::build_http_client(config)?;
        Ok(Self { client })
    }

    fn build_http_client(config: &LoaderConfig) -> Result<Client, FetchError> {
        let policy = if config.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(policy)
            .build()?;

        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        tracing::debug!(%url, "sending request");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await?.to_vec();
        tracing::debug!(%url, status, bytes = body.len(), "response received");

        Ok(FetchResponse {
            status,
            content_type,
            body,
            final_url,
        })
    }
}
