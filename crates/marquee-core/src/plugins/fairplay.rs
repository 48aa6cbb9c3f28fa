//! FairPlay Streaming
//!
//! License flow for FairPlay protected HLS:
//! 1. fetch the application certificate
//! 2. have the platform key system generate the SPC for the content
//! 3. POST the base64 SPC to the license server
//! 4. hand the returned CKC back to the key system
//!
//! Every failure is reported as a DRM media error.

use super::{http_client, is_hls};
use crate::{
    plugin::{CanPlay, LoadContext, Plugin},
    DrmSystem, Error, MetaData, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

/// License server endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairPlayConfig {
    pub certificate_url: Url,
    pub license_url: Url,
}

/// The platform's FairPlay key system
pub trait KeySystemAccess: Send + Sync {
    /// Server playback context for `content_id`, encrypted with `certificate`
    fn create_spc(&self, certificate: &[u8], content_id: &str) -> Result<Vec<u8>>;

    /// Install the content key context returned by the license server
    fn update_ckc(&self, ckc: &[u8]) -> Result<()>;
}

pub struct FairPlayPlugin {
    client: Client,
    config: FairPlayConfig,
    keys: Box<dyn KeySystemAccess>,
}

impl FairPlayPlugin {
    pub fn new(config: FairPlayConfig, keys: Box<dyn KeySystemAccess>) -> Result<Self> {
        Ok(Self::with_client(http_client()?, config, keys))
    }

    pub fn with_client(client: Client, config: FairPlayConfig, keys: Box<dyn KeySystemAccess>) -> Self {
        Self {
            client,
            config,
            keys,
        }
    }

    async fn certificate(&self, token: &CancellationToken) -> Result<Vec<u8>> {
        let request = async {
            let response = self
                .client
                .get(self.config.certificate_url.clone())
                .send()
                .await
                .map_err(|e| Error::drm(format!("Certificate request failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(Error::drm(format!(
                    "Certificate request failed with HTTP {}",
                    response.status().as_u16()
                )));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::drm(format!("Certificate download failed: {}", e)))?;
            Ok(body.to_vec())
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = request => result,
        }
    }

    async fn license(&self, spc: &[u8], content_id: &str, token: &CancellationToken) -> Result<Vec<u8>> {
        let body = format!("spc={}&assetId={}", STANDARD.encode(spc), content_id);
        let request = async {
            let response = self
                .client
                .post(self.config.license_url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body)
                .send()
                .await
                .map_err(|e| Error::drm(format!("License request failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(Error::drm(format!(
                    "License request failed with HTTP {}",
                    response.status().as_u16()
                )));
            }
            let text = response
                .text()
                .await
                .map_err(|e| Error::drm(format!("License download failed: {}", e)))?;
            decode_ckc(&text)
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = request => result,
        }
    }
}

/// The CKC is returned base64 encoded, optionally wrapped in `<ckc>` tags
fn decode_ckc(body: &str) -> Result<Vec<u8>> {
    let trimmed = body.trim();
    let payload = trimmed
        .strip_prefix("<ckc>")
        .and_then(|rest| rest.strip_suffix("</ckc>"))
        .unwrap_or(trimmed)
        .trim();
    STANDARD
        .decode(payload)
        .map_err(|e| Error::drm(format!("Malformed CKC: {}", e)))
}

/// Content identifier the key system binds the SPC to (`skd://` URIs carry it as host)
fn content_id(src: &str) -> String {
    Url::parse(src)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| src.to_string())
}

#[async_trait]
impl Plugin for FairPlayPlugin {
    fn name(&self) -> &str {
        "fairplay"
    }

    fn can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.drm_system == Some(DrmSystem::FairPlay) && is_hls(meta) {
            CanPlay::Probably
        } else {
            CanPlay::No
        }
    }

    #[instrument(skip(self, meta, ctx), fields(src = %meta.src))]
    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()> {
        let token = ctx.task.signal();

        let certificate = self.certificate(&token).await?;
        debug!(bytes = certificate.len(), "Certificate fetched");

        let content_id = content_id(&meta.src);
        let spc = self
            .keys
            .create_spc(&certificate, &content_id)
            .map_err(|e| Error::drm(format!("SPC generation failed: {}", e)))?;

        let ckc = self.license(&spc, &content_id, &token).await?;
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.keys
            .update_ckc(&ckc)
            .map_err(|e| Error::drm(format!("CKC rejected: {}", e)))?;
        info!(content_id = %content_id, "FairPlay license installed");

        ctx.element.set_src(Some(&meta.src));
        ctx.element.load();
        Ok(())
    }
}
