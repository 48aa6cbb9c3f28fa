//! Descriptor fetching and lightweight source probing over HTTP

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Network access used by the catalog (descriptor GET) and by the session
/// (HEAD re-probe of sources the element refused)
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    /// Fetch and decode a JSON descriptor. Non-2xx responses fail with
    /// [`Error::HttpStatus`].
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value>;

    /// Status code of a HEAD request for `url`
    async fn head_status(&self, url: &str) -> Result<u16>;
}

/// `reqwest` backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|_| Error::StreamNotFound {
            src: url.to_string(),
        })
    }
}

#[async_trait]
impl DescriptorFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        let parsed = Self::parse_url(url)?;
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Descriptor fetched");
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self))]
    async fn head_status(&self, url: &str) -> Result<u16> {
        let parsed = Self::parse_url(url)?;
        let response = self.client.head(parsed).send().await?;
        Ok(response.status().as_u16())
    }
}
