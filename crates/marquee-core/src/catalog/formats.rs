//! File-extension format table

use crate::MediaType;
use std::collections::HashMap;

/// Mime and media type registered for an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    pub mime_type: String,
    pub media_type: MediaType,
}

/// Extension -> format lookup used by the playability probe
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    by_extension: HashMap<String, FormatEntry>,
}

const DEFAULT_FORMATS: &[(&str, &str, MediaType)] = &[
    ("mp4", "video/mp4", MediaType::Video),
    ("m4v", "video/mp4", MediaType::Video),
    ("webm", "video/webm", MediaType::Video),
    ("ogv", "video/ogg", MediaType::Video),
    ("mov", "video/quicktime", MediaType::Video),
    ("mkv", "video/x-matroska", MediaType::Video),
    ("m3u8", "application/x-mpegurl", MediaType::Video),
    ("mpd", "application/dash+xml", MediaType::Video),
    ("mp3", "audio/mpeg", MediaType::Audio),
    ("m4a", "audio/mp4", MediaType::Audio),
    ("aac", "audio/aac", MediaType::Audio),
    ("oga", "audio/ogg", MediaType::Audio),
    ("ogg", "audio/ogg", MediaType::Audio),
    ("opus", "audio/ogg", MediaType::Audio),
    ("wav", "audio/wav", MediaType::Audio),
    ("flac", "audio/flac", MediaType::Audio),
];

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (ext, mime, media_type) in DEFAULT_FORMATS {
            registry.register(ext, mime, *media_type);
        }
        registry
    }
}

impl FormatRegistry {
    /// A registry without any formats
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, mime_type: &str, media_type: MediaType) {
        self.by_extension.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            FormatEntry {
                mime_type: mime_type.to_string(),
                media_type,
            },
        );
    }

    pub fn lookup_extension(&self, extension: &str) -> Option<&FormatEntry> {
        self.by_extension.get(&extension.to_ascii_lowercase())
    }

    /// Resolve the format of a source from its extension or `data:` header
    pub fn resolve(&self, src: &str) -> Option<FormatEntry> {
        if let Some(mime) = data_url_mime(src) {
            return Some(FormatEntry {
                media_type: self.media_type_for_mime(&mime),
                mime_type: mime,
            });
        }
        extension_of(src)
            .and_then(|ext| self.lookup_extension(&ext))
            .cloned()
    }

    /// Media type of an explicit mime type, preferring registered formats
    pub fn media_type_for_mime(&self, mime_type: &str) -> MediaType {
        let essence = mime_essence(mime_type);
        self.by_extension
            .values()
            .find(|entry| entry.mime_type.eq_ignore_ascii_case(essence))
            .map(|entry| entry.media_type)
            .unwrap_or_else(|| MediaType::from_mime(essence))
    }

    /// Whether the source can be handed to a playback element as-is
    pub fn is_directly_playable(&self, src: &str) -> bool {
        is_inline_source(src) || self.resolve(src).is_some()
    }
}

/// Lowercased extension of the last path segment, ignoring query and fragment
pub fn extension_of(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// `blob:` and `data:` sources
pub fn is_inline_source(src: &str) -> bool {
    let lower = src.trim_start().to_ascii_lowercase();
    lower.starts_with("blob:") || lower.starts_with("data:")
}

fn data_url_mime(src: &str) -> Option<String> {
    let rest = src.trim_start().strip_prefix("data:")?;
    let header = rest.split(',').next()?;
    let mime = header.split(';').next()?.trim();
    if mime.contains('/') {
        Some(mime.to_ascii_lowercase())
    } else {
        None
    }
}

fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}
