//! Core types for Marquee
//!
//! The canonical catalog model produced by [`SourceCatalog`](crate::SourceCatalog):
//! `MediaItem -> Variant -> Representation`, plus the [`MetaData`] record a
//! [`PlaybackSession`](crate::PlaybackSession) loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of medium a representation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    /// Derive the media type from a mime type (`audio/*` is audio, everything else video)
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("audio/") {
            MediaType::Audio
        } else {
            MediaType::Video
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// DRM system types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrmSystem {
    Widevine,
    FairPlay,
    PlayReady,
    ClearKey,
}

impl DrmSystem {
    /// Returns the system ID (UUID) for PSSH box
    pub fn system_id(&self) -> &'static str {
        match self {
            DrmSystem::Widevine => "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed",
            DrmSystem::FairPlay => "94ce86fb-07ff-4f43-adb8-93d2fa968ca2",
            DrmSystem::PlayReady => "9a04f079-9840-4286-ab92-e65be0885f95",
            DrmSystem::ClearKey => "1077efec-c0b2-4d02-ace3-3c1e52e2fb4b",
        }
    }
}

/// Either a plain string or a language -> text map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// Text for `language`, falling back to the first available entry
    pub fn resolve(&self, language: Option<&str>) -> Option<&str> {
        match self {
            LocalizedText::Plain(text) => Some(text.as_str()),
            LocalizedText::Localized(map) => language
                .and_then(|lang| map.get(lang))
                .or_else(|| map.values().next())
                .map(String::as_str),
        }
    }
}

/// Text track type (captions, subtitles, descriptions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTrackKind {
    /// Closed captions (includes speaker identification, sound effects)
    Captions,
    /// Subtitles (dialogue translation)
    #[default]
    Subtitles,
    /// Audio descriptions for visually impaired
    Descriptions,
    /// Chapter titles
    Chapters,
    /// Metadata track
    Metadata,
}

/// Side-loaded text track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTrack {
    pub src: String,
    #[serde(default)]
    pub kind: TextTrackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
}

/// Chapter marker for navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: LocalizedText,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start: f64, end: Option<f64>) -> Self {
        Self {
            title: LocalizedText::Plain(title.into()),
            start,
            end,
        }
    }

    /// Check if a given time falls within this chapter
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start && self.end.map_or(true, |end| time < end)
    }
}

/// Overlay shown over the media between `start` and `end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub start: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Opaque content handed to the overlay renderer
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub content: serde_json::Value,
}

/// Preview thumbnail sprite/sequence description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailSpec {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Seconds between two thumbnails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
}

/// A concrete, probed encoding of a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    pub src: String,
    /// `None` only when a lenient play check accepted an unknown format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    /// Defaults to `height` when not given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm_system: Option<DrmSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
}

/// A language-scoped playable option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
    pub representations: Vec<Representation>,
}

/// One entry of a parsed catalog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<LocalizedText>,
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<TextTrack>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<Overlay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<ThumbnailSpec>,
}

impl MediaItem {
    /// All representations of all variants, in catalog order
    pub fn representations(&self) -> impl Iterator<Item = &Representation> {
        self.variants.iter().flat_map(|v| v.representations.iter())
    }

    /// Get chapter at given time
    pub fn chapter_at(&self, time: f64) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.contains_time(time))
    }

    /// Distinct languages offered by the variants
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = Vec::new();
        for lang in self.variants.iter().filter_map(|v| v.language.as_deref()) {
            if !languages.contains(&lang) {
                languages.push(lang);
            }
        }
        languages
    }
}

/// The single source currently loading or loaded by a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm_system: Option<DrmSystem>,
    // Enrichments, usually filled in once the medium is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl MetaData {
    /// Metadata for a bare src with nothing else known
    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }

    pub fn from_representation(rep: &Representation) -> Self {
        Self {
            src: rep.src.clone(),
            media_type: Some(rep.media_type),
            mime_type: rep.mime_type.clone(),
            language: rep.language.clone(),
            quality: rep.quality,
            drm_system: rep.drm_system,
            is_live: None,
            frame_rate: rep.frame_rate,
            bit_rate: rep.bit_rate,
            width: rep.width,
            height: rep.height,
            duration: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.is_live.unwrap_or(false)
    }
}

/// Transient snapshot used to restore position/play-state across a source switch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedState {
    pub src: Option<String>,
    /// Playhead in seconds
    pub playhead: f64,
    /// The element was playing (or had a play intent) when the snapshot was taken
    pub playing: bool,
    /// Suppress autoplay for the next load
    pub ignore_autoplay: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}
