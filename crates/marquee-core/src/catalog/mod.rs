//! Source catalog: descriptor parsing, validation and playability probing
//!
//! Turns a URL, an inline descriptor or a playlist of either into the
//! canonical `MediaItem -> Variant -> Representation` model. Every
//! representation passes a playability probe against the registered
//! [`Capabilities`]; failures are raised or skipped according to
//! [`CatalogOptions`].

mod descriptor;
pub mod formats;

pub use formats::{extension_of, is_inline_source, FormatEntry, FormatRegistry};

use crate::{
    config::CatalogOptions,
    fetch::DescriptorFetcher,
    plugin::{CanPlay, Capabilities},
    Error, MediaItem, MediaType, MetaData, Representation, Result, Variant,
};
use descriptor::{NormalizedRepresentation, RawEncoding, RawVariant};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Parses descriptors into validated catalogs
pub struct SourceCatalog {
    options: CatalogOptions,
    formats: FormatRegistry,
    capabilities: Arc<Capabilities>,
    fetcher: Option<Arc<dyn DescriptorFetcher>>,
}

/// Encoding that survived the probe
struct Accepted {
    src: String,
    mime_type: Option<String>,
    media_type: MediaType,
    drm_system: Option<crate::DrmSystem>,
    verdict: CanPlay,
}

impl SourceCatalog {
    pub fn new(options: CatalogOptions, capabilities: Arc<Capabilities>) -> Self {
        Self {
            options,
            formats: FormatRegistry::default(),
            capabilities,
            fetcher: None,
        }
    }

    /// Replace the default format table
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Enable fetching of descriptor URLs
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DescriptorFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Parse any accepted input shape.
    ///
    /// A string that is directly playable becomes a single item; any other
    /// string is fetched as a JSON descriptor.
    #[instrument(skip(self, input))]
    pub async fn parse(&self, input: Value) -> Result<Vec<MediaItem>> {
        let descriptor = match input {
            Value::String(url) if !self.formats.is_directly_playable(&url) => {
                let fetcher = self.fetcher.as_ref().ok_or_else(|| Error::StreamNotFound {
                    src: url.clone(),
                })?;
                info!(url = %url, "Fetching descriptor");
                fetcher.fetch_json(&url).await?
            }
            other => other,
        };
        self.parse_descriptor(descriptor)
    }

    /// Parse an already-resolved descriptor without network access
    pub fn parse_descriptor(&self, descriptor: Value) -> Result<Vec<MediaItem>> {
        let entries = match descriptor {
            Value::Array(entries) => entries,
            other => vec![other],
        };

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match self.build_item(entry) {
                Ok(item) => items.push(item),
                Err(err) if self.options.skip_invalid_items && err.is_validation() => {
                    warn!(index, code = %err.error_code(), error = %err, "Skipping invalid item");
                }
                Err(err) => return Err(err),
            }
        }

        if items.is_empty() && !self.options.skip_empty_data {
            return Err(Error::NoMedia);
        }

        info!(items = items.len(), "Descriptor parsed");
        Ok(items)
    }

    fn build_item(&self, value: Value) -> Result<MediaItem> {
        let normalized = descriptor::normalize_item(value)?;

        let mut variants = Vec::with_capacity(normalized.variants.len());
        for value in normalized.variants {
            match self.build_variant(value) {
                Ok(variant) => variants.push(variant),
                Err(err) if self.options.skip_invalid_representations && err.is_validation() => {
                    warn!(code = %err.error_code(), error = %err, "Dropping variant");
                }
                Err(err) => return Err(err),
            }
        }

        if variants.is_empty() {
            return Err(Error::EmptyVariants);
        }

        let fields = normalized.fields;
        Ok(MediaItem {
            title: fields.title,
            subtitle: fields.subtitle,
            variants,
            tracks: fields.tracks,
            overlays: fields.overlays,
            chapters: fields.chapters,
            thumbnails: fields.thumbnails,
        })
    }

    fn build_variant(&self, value: Value) -> Result<Variant> {
        let normalized = descriptor::normalize_variant(value)?;

        let mut representations = Vec::with_capacity(normalized.representations.len());
        for value in normalized.representations {
            let result = descriptor::normalize_representation(value)
                .and_then(|rep| self.build_representation(rep, &normalized.fields));
            match result {
                Ok(rep) => representations.push(rep),
                Err(err) if self.options.skip_invalid_representations && err.is_validation() => {
                    warn!(code = %err.error_code(), error = %err, "Dropping representation");
                }
                Err(err) => return Err(err),
            }
        }

        if representations.is_empty() {
            return Err(Error::EmptyRepresentations);
        }

        Ok(Variant {
            language: normalized.fields.language,
            default: normalized.fields.default,
            representations,
        })
    }

    fn build_representation(
        &self,
        rep: NormalizedRepresentation,
        variant: &RawVariant,
    ) -> Result<Representation> {
        let NormalizedRepresentation { fields, encodings } = rep;
        let accepted = self.pick_encoding(encodings, fields.mime_type.as_deref(), fields.drm_system)?;

        Ok(Representation {
            src: accepted.src,
            mime_type: accepted.mime_type,
            media_type: fields.media_type.unwrap_or(accepted.media_type),
            height: fields.height,
            width: fields.width,
            frame_rate: fields.frame_rate,
            bit_rate: fields.bit_rate,
            quality: fields.quality.or(fields.height),
            drm_system: accepted.drm_system,
            language: fields.language.or_else(|| variant.language.clone()),
            default: fields.default.unwrap_or(variant.default),
        })
    }

    /// Probe the encodings of one representation. The first `probably`
    /// answer ends the search; otherwise the first `maybe` is taken.
    fn pick_encoding(
        &self,
        encodings: Vec<RawEncoding>,
        fallback_mime: Option<&str>,
        fallback_drm: Option<crate::DrmSystem>,
    ) -> Result<Accepted> {
        let mut candidate: Option<Accepted> = None;
        let mut first_src: Option<String> = None;

        for encoding in encodings {
            let src = match encoding.src {
                Some(src) if !src.trim().is_empty() => src,
                _ => {
                    debug!("Skipping encoding without src");
                    continue;
                }
            };
            first_src.get_or_insert_with(|| src.clone());

            let explicit_mime = encoding.mime_type.or_else(|| fallback_mime.map(str::to_string));
            let (mime_type, media_type) = match explicit_mime {
                Some(mime) => {
                    let media_type = self.formats.media_type_for_mime(&mime);
                    (Some(mime), media_type)
                }
                None => match self.formats.resolve(&src) {
                    Some(entry) => (Some(entry.mime_type), entry.media_type),
                    None => (None, MediaType::Video),
                },
            };
            let drm_system = encoding.drm_system.or(fallback_drm);

            let verdict = self.probe(&src, mime_type.as_deref(), media_type, drm_system);
            debug!(src = %src, mime = ?mime_type, verdict = %verdict, "Probed encoding");

            if !verdict.is_playable() {
                continue;
            }
            let accepted = Accepted {
                src,
                mime_type,
                media_type,
                drm_system,
                verdict,
            };
            if accepted.verdict == CanPlay::Probably {
                return Ok(accepted);
            }
            if candidate.is_none() {
                candidate = Some(accepted);
            }
        }

        match (candidate, first_src) {
            (Some(accepted), _) => Ok(accepted),
            (None, Some(src)) => Err(Error::StreamNotPlayable { src }),
            (None, None) => Err(Error::MissingSrc),
        }
    }

    fn probe(
        &self,
        src: &str,
        mime_type: Option<&str>,
        media_type: MediaType,
        drm_system: Option<crate::DrmSystem>,
    ) -> CanPlay {
        if self.options.disable_play_check {
            return CanPlay::Probably;
        }
        if self.options.lenient_play_check_blob && is_inline_source(src) {
            return CanPlay::Maybe;
        }
        let Some(mime_type) = mime_type else {
            return if self.options.lenient_play_check {
                CanPlay::Maybe
            } else {
                CanPlay::No
            };
        };

        let meta = MetaData {
            media_type: Some(media_type),
            mime_type: Some(mime_type.to_string()),
            drm_system,
            ..MetaData::from_src(src)
        };
        self.capabilities.can_play(&meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::NativeSupport;
    use serde_json::json;

    /// Plays mp4 (probably) and webm (maybe)
    struct TestNative;

    impl NativeSupport for TestNative {
        fn can_play_type(&self, mime_type: &str) -> CanPlay {
            match mime_type {
                "video/mp4" | "audio/mpeg" => CanPlay::Probably,
                "video/webm" => CanPlay::Maybe,
                _ => CanPlay::No,
            }
        }
    }

    fn catalog(options: CatalogOptions) -> SourceCatalog {
        SourceCatalog::new(options, Arc::new(Capabilities::new(Arc::new(TestNative))))
    }

    #[test]
    fn test_quality_defaults_to_height() {
        let items = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"src": "a.mp4", "height": 720}))
            .unwrap();
        let rep = &items[0].variants[0].representations[0];

        assert_eq!(rep.quality, Some(720));
        assert_eq!(rep.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(rep.media_type, MediaType::Video);
    }

    #[test]
    fn test_probably_short_circuits_encodings() {
        let items = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"encodings": ["a.webm", "a.mp4", "a.mkv"]}))
            .unwrap();
        assert_eq!(items[0].variants[0].representations[0].src, "a.mp4");

        let items = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"encodings": ["a.mkv", "a.webm"]}))
            .unwrap();
        assert_eq!(items[0].variants[0].representations[0].src, "a.webm");
    }

    #[test]
    fn test_strict_raises_on_unplayable() {
        let err = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"representations": ["a.mp4", "a.mkv"]}))
            .unwrap_err();
        assert_eq!(err, Error::StreamNotPlayable { src: "a.mkv".into() });
    }

    #[test]
    fn test_encoding_without_src_is_skipped() {
        let items = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"encodings": [{"type": "video/mp4"}, "a.mp4"]}))
            .unwrap();
        assert_eq!(items[0].variants[0].representations[0].src, "a.mp4");

        let err = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"encodings": [{"type": "video/mp4"}, {"src": " "}]}))
            .unwrap_err();
        assert_eq!(err, Error::MissingSrc);
    }

    #[test]
    fn test_lenient_drops_representations_and_variants() {
        let items = catalog(CatalogOptions::default())
            .parse_descriptor(json!({"variants": [
                {"language": "en", "representations": ["a.mp4", "a.mkv"]},
                {"language": "de", "representations": ["b.mkv"]}
            ]}))
            .unwrap();

        assert_eq!(items[0].variants.len(), 1);
        assert_eq!(items[0].variants[0].representations.len(), 1);
        assert_eq!(items[0].variants[0].representations[0].language.as_deref(), Some("en"));
    }

    #[test]
    fn test_item_policy() {
        let input = json!(["a.mp4", {"title": "broken"}, 7]);

        let err = catalog(CatalogOptions::default())
            .parse_descriptor(input.clone())
            .unwrap_err();
        assert_eq!(err, Error::EmptyVariants);

        let items = catalog(CatalogOptions::lenient()).parse_descriptor(input).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_empty_result() {
        let err = catalog(CatalogOptions::lenient())
            .parse_descriptor(json!([{"src": "a.mkv"}]))
            .unwrap_err();
        assert_eq!(err, Error::NoMedia);

        let options = CatalogOptions {
            skip_empty_data: true,
            ..CatalogOptions::lenient()
        };
        let items = catalog(options).parse_descriptor(json!([])).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_play_check_modes() {
        let disabled = CatalogOptions {
            disable_play_check: true,
            ..CatalogOptions::strict()
        };
        let items = catalog(disabled).parse_descriptor(json!("a.mkv")).unwrap();
        assert_eq!(items[0].variants[0].representations[0].src, "a.mkv");

        let lenient = CatalogOptions {
            lenient_play_check: true,
            ..CatalogOptions::strict()
        };
        let items = catalog(lenient)
            .parse_descriptor(json!("https://cdn.example.com/stream"))
            .unwrap();
        assert_eq!(items[0].variants[0].representations[0].mime_type, None);

        let err = catalog(CatalogOptions::strict())
            .parse_descriptor(json!({"src": "https://cdn.example.com/stream"}))
            .unwrap_err();
        assert_eq!(err.error_code(), "STREAM_NOT_PLAYABLE");
    }

    #[test]
    fn test_blob_sources() {
        let items = catalog(CatalogOptions::strict())
            .parse_descriptor(json!("blob:https://example.com/5f1c"))
            .unwrap();
        assert_eq!(items[0].variants[0].representations[0].src, "blob:https://example.com/5f1c");
    }

    #[tokio::test]
    async fn test_url_without_fetcher() {
        let err = catalog(CatalogOptions::strict())
            .parse(json!("https://example.com/playlist.json"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STREAM_NOT_FOUND");
    }
}
