//! DASH (Dynamic Adaptive Streaming over HTTP) engine
//!
//! Reads the MPD before handing the source to the element. Only the
//! attributes the session reports are extracted:
//! - `type="dynamic"` for live presentations
//! - `mediaPresentationDuration`
//! - the highest-bandwidth `Representation` (bandwidth, size, frame rate)

use super::{fetch_text, http_client, is_dash, parse_source_url};
use crate::{
    element::MediaElement,
    plugin::{CanPlay, LoadContext, Plugin},
    Error, MediaErrorCode, MetaData, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, PartialEq)]
struct MpdInfo {
    is_live: bool,
    duration: Option<f64>,
    bandwidth: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    frame_rate: Option<f64>,
}

pub struct DashPlugin {
    client: Client,
    manifests: Mutex<HashMap<String, MpdInfo>>,
}

impl DashPlugin {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            manifests: Mutex::new(HashMap::new()),
        }
    }

    fn manifests(&self) -> MutexGuard<'_, HashMap<String, MpdInfo>> {
        self.manifests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_mpd(content: &str) -> Result<MpdInfo> {
    let Some(mpd_start) = content.find("<MPD") else {
        return Err(Error::media(MediaErrorCode::Decode, "Document is not an MPD"));
    };
    let mpd_attrs = element_attrs(&content[mpd_start + 4..]);

    let best = content
        .split("<Representation")
        .skip(1)
        .map(element_attrs)
        .max_by_key(|attrs| extract_attr(attrs, "bandwidth").and_then(|b| b.parse::<u64>().ok()));

    let mut info = MpdInfo {
        is_live: extract_attr(mpd_attrs, "type").as_deref() == Some("dynamic"),
        duration: extract_attr(mpd_attrs, "mediaPresentationDuration")
            .and_then(|d| parse_iso8601_duration(&d)),
        ..Default::default()
    };
    if let Some(attrs) = best {
        info.bandwidth = extract_attr(attrs, "bandwidth").and_then(|b| b.parse().ok());
        info.width = extract_attr(attrs, "width").and_then(|w| w.parse().ok());
        info.height = extract_attr(attrs, "height").and_then(|h| h.parse().ok());
        info.frame_rate = extract_attr(attrs, "frameRate").and_then(|f| parse_frame_rate(&f));
    }
    Ok(info)
}

/// Attribute section of an element whose tag name has already been consumed
fn element_attrs(rest: &str) -> &str {
    let end = rest.find('>').unwrap_or(rest.len());
    &rest[..end]
}

fn extract_attr(attrs: &str, name: &str) -> Option<String> {
    let pattern = format!(" {}=\"", name);
    let start = attrs.find(&pattern)? + pattern.len();
    let len = attrs[start..].find('"')?;
    Some(attrs[start..start + len].to_string())
}

/// `25`, `29.97` or `30000/1001`
fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.trim().parse().ok(),
    }
}

/// Seconds of an ISO 8601 duration such as `PT1H2M3.5S`
fn parse_iso8601_duration(value: &str) -> Option<f64> {
    let time = value.trim().strip_prefix('P')?;
    let (days, time) = match time.split_once('T') {
        Some((days, time)) => (days, time),
        None => (time, ""),
    };

    let mut total = 0.0;
    if let Some(d) = days.strip_suffix('D') {
        total += d.parse::<f64>().ok()? * 86_400.0;
    }

    let mut current = String::new();
    for c in time.chars() {
        let unit = match c {
            'H' => 3600.0,
            'M' => 60.0,
            'S' => 1.0,
            _ => {
                current.push(c);
                continue;
            }
        };
        total += current.parse::<f64>().ok()? * unit;
        current.clear();
    }

    (total > 0.0).then_some(total)
}

#[async_trait]
impl Plugin for DashPlugin {
    fn name(&self) -> &str {
        "dash"
    }

    fn can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.drm_system.is_none() && is_dash(meta) {
            CanPlay::Probably
        } else {
            CanPlay::No
        }
    }

    #[instrument(skip(self, meta, ctx), fields(src = %meta.src))]
    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()> {
        let token = ctx.task.signal();
        let url = parse_source_url(&meta.src)?;

        let content = fetch_text(&self.client, url, &token).await?;
        let info = parse_mpd(&content)?;
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!(live = info.is_live, duration = ?info.duration, "MPD inspected");

        self.manifests().insert(meta.src.clone(), info);
        ctx.element.set_src(Some(&meta.src));
        ctx.element.load();
        Ok(())
    }

    fn on_loaded(&self, meta: &mut MetaData, _element: &dyn MediaElement) -> bool {
        let Some(info) = self.manifests().remove(&meta.src) else {
            return false;
        };
        meta.is_live = Some(info.is_live);
        meta.duration = meta.duration.or(info.duration);
        meta.bit_rate = meta.bit_rate.or(info.bandwidth);
        meta.width = meta.width.or(info.width);
        meta.height = meta.height.or(info.height);
        meta.frame_rate = meta.frame_rate.or(info.frame_rate);
        true
    }

    fn destroy(&self) {
        self.manifests().clear();
    }
}
