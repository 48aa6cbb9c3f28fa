//! Reference format plugins
//!
//! Register them on [`Capabilities`](crate::Capabilities) generic first:
//! progressive, then the adaptive engines, then content protection.

mod progressive;
pub use progressive::ProgressivePlugin;

#[cfg(feature = "hls")]
mod hls;
#[cfg(feature = "hls")]
pub use hls::HlsPlugin;

#[cfg(feature = "dash")]
mod dash;
#[cfg(feature = "dash")]
pub use dash::DashPlugin;

#[cfg(feature = "fairplay")]
mod fairplay;
#[cfg(feature = "fairplay")]
pub use fairplay::{FairPlayConfig, FairPlayPlugin, KeySystemAccess};

#[cfg(test)]
pub(crate) mod idle;

use crate::{catalog::extension_of, Error, MediaErrorCode, MetaData, Result};
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))
}

fn mime_of(meta: &MetaData) -> String {
    meta.mime_type
        .as_deref()
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// HLS playlist by mime type or extension
pub(crate) fn is_hls(meta: &MetaData) -> bool {
    let mime = mime_of(meta);
    if !mime.is_empty() {
        return mime.ends_with("mpegurl");
    }
    extension_of(&meta.src).as_deref() == Some("m3u8")
}

/// DASH manifest by mime type or extension
pub(crate) fn is_dash(meta: &MetaData) -> bool {
    let mime = mime_of(meta);
    if !mime.is_empty() {
        return mime == "application/dash+xml";
    }
    extension_of(&meta.src).as_deref() == Some("mpd")
}

pub(crate) fn parse_source_url(src: &str) -> Result<Url> {
    Url::parse(src).map_err(|_| Error::StreamNotFound {
        src: src.to_string(),
    })
}

fn network_error(err: reqwest::Error) -> Error {
    Error::media(MediaErrorCode::Network, err.to_string())
}

/// GET `url` as text, abandoning the request once `token` is cancelled
pub(crate) async fn fetch_text(
    client: &Client,
    url: Url,
    token: &CancellationToken,
) -> Result<String> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = async {
            let response = client.get(url.clone()).send().await.map_err(network_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::media(
                    MediaErrorCode::Network,
                    format!("HTTP {} for {}", status.as_u16(), url),
                ));
            }
            response.text().await.map_err(network_error)
        } => result,
    }
}
