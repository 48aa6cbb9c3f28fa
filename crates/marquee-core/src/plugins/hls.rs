//! HLS (HTTP Live Streaming) engine
//!
//! Fetches the playlist before handing the source to the element:
//! - Master playlists: the highest-bandwidth variant is inspected
//! - Media playlists: `EXT-X-ENDLIST` decides live vs. on-demand

use super::{fetch_text, http_client, is_hls, parse_source_url};
use crate::{
    element::MediaElement,
    plugin::{CanPlay, LoadContext, Plugin},
    Error, MediaErrorCode, MetaData, Result,
};
use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, VariantStream};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

/// What the playlists told us about a stream
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StreamInfo {
    pub is_live: bool,
    pub duration: Option<f64>,
    pub bandwidth: Option<u64>,
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub struct HlsPlugin {
    client: Client,
    streams: Mutex<HashMap<String, StreamInfo>>,
}

impl HlsPlugin {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            streams: Mutex::new(HashMap::new()),
        }
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<String, StreamInfo>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inspect the playlist behind `url`, following a master playlist to its
    /// best variant
    async fn inspect(&self, url: Url, token: &CancellationToken) -> Result<StreamInfo> {
        let content = fetch_text(&self.client, url.clone(), token).await?;
        match parse(&content)? {
            Playlist::MediaPlaylist(media) => Ok(media_info(&media)),
            Playlist::MasterPlaylist(master) => {
                let Some(variant) = best_variant(&master) else {
                    return Err(Error::media(
                        MediaErrorCode::SrcNotSupported,
                        "Master playlist has no variants",
                    ));
                };
                let mut info = variant_info(variant);

                let media_url = url.join(&variant.uri).map_err(|e| {
                    Error::media(MediaErrorCode::Decode, format!("Invalid variant URI: {}", e))
                })?;
                debug!(variant = %media_url, bandwidth = variant.bandwidth, "Inspecting variant");

                let content = fetch_text(&self.client, media_url, token).await?;
                if let Playlist::MediaPlaylist(media) = parse(&content)? {
                    let media = media_info(&media);
                    info.is_live = media.is_live;
                    info.duration = media.duration;
                }
                Ok(info)
            }
        }
    }
}

fn parse(content: &str) -> Result<Playlist> {
    m3u8_rs::parse_playlist_res(content.as_bytes()).map_err(|e| {
        Error::media(MediaErrorCode::Decode, format!("Failed to parse HLS playlist: {:?}", e))
    })
}

fn best_variant(master: &MasterPlaylist) -> Option<&VariantStream> {
    master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .max_by_key(|v| v.bandwidth)
}

fn variant_info(variant: &VariantStream) -> StreamInfo {
    StreamInfo {
        bandwidth: Some(variant.bandwidth),
        frame_rate: variant.frame_rate,
        width: variant.resolution.map(|r| r.width as u32),
        height: variant.resolution.map(|r| r.height as u32),
        ..Default::default()
    }
}

fn media_info(media: &MediaPlaylist) -> StreamInfo {
    let duration = media
        .end_list
        .then(|| media.segments.iter().map(|s| f64::from(s.duration)).sum());
    StreamInfo {
        is_live: !media.end_list,
        duration,
        ..Default::default()
    }
}

#[async_trait]
impl Plugin for HlsPlugin {
    fn name(&self) -> &str {
        "hls"
    }

    fn can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.drm_system.is_none() && is_hls(meta) {
            CanPlay::Probably
        } else {
            CanPlay::No
        }
    }

    #[instrument(skip(self, meta, ctx), fields(src = %meta.src))]
    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()> {
        let token = ctx.task.signal();
        let url = parse_source_url(&meta.src)?;

        let info = self.inspect(url, &token).await?;
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!(live = info.is_live, bandwidth = ?info.bandwidth, "HLS playlist inspected");

        self.streams().insert(meta.src.clone(), info);
        ctx.element.set_src(Some(&meta.src));
        ctx.element.load();
        Ok(())
    }

    fn on_loaded(&self, meta: &mut MetaData, _element: &dyn MediaElement) -> bool {
        let Some(info) = self.streams().remove(&meta.src) else {
            return false;
        };
        meta.is_live = Some(info.is_live);
        if meta.duration.is_none() {
            meta.duration = info.duration;
        }
        if meta.bit_rate.is_none() {
            meta.bit_rate = info.bandwidth;
        }
        if meta.frame_rate.is_none() {
            meta.frame_rate = info.frame_rate;
        }
        if meta.width.is_none() {
            meta.width = info.width;
        }
        if meta.height.is_none() {
            meta.height = info.height;
        }
        true
    }

    fn destroy(&self) {
        self.streams().clear();
    }
}
