//! Shorthand descriptor shapes
//!
//! Every accepted input shape is normalized into nested
//! `item -> variants -> representations -> encodings` before probing:
//!
//! - `"https://.../a.mp4"`
//! - `{ "src": ..., "mimeType": ... }`
//! - `{ "encodings": [...] }`
//! - `{ "representations": [...] }`
//! - `{ "variants": [{ "representations": [...] }] }`

use crate::error::Error;
use crate::{Chapter, DrmSystem, LocalizedText, MediaType, Overlay, Result, TextTrack, ThumbnailSpec};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Item-level fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawItem {
    pub title: Option<LocalizedText>,
    pub subtitle: Option<LocalizedText>,
    #[serde(default)]
    pub tracks: Vec<TextTrack>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    pub thumbnails: Option<ThumbnailSpec>,
}

/// Variant-level fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawVariant {
    pub language: Option<String>,
    #[serde(default)]
    pub default: bool,
}

/// Representation-level fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawRepresentation {
    #[serde(alias = "type")]
    pub mime_type: Option<String>,
    pub media_type: Option<MediaType>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub frame_rate: Option<f64>,
    #[serde(alias = "bitrate")]
    pub bit_rate: Option<u64>,
    pub quality: Option<u32>,
    pub drm_system: Option<DrmSystem>,
    pub language: Option<String>,
    pub default: Option<bool>,
}

/// One alternative encoding of a representation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawEncoding {
    pub src: Option<String>,
    #[serde(alias = "type")]
    pub mime_type: Option<String>,
    pub drm_system: Option<DrmSystem>,
}

pub(crate) struct NormalizedItem {
    pub fields: RawItem,
    pub variants: Vec<Value>,
}

pub(crate) struct NormalizedVariant {
    pub fields: RawVariant,
    pub representations: Vec<Value>,
}

pub(crate) struct NormalizedRepresentation {
    pub fields: RawRepresentation,
    pub encodings: Vec<RawEncoding>,
}

fn src_object(src: String) -> Value {
    let mut map = Map::new();
    map.insert("src".to_string(), Value::String(src));
    Value::Object(map)
}

fn typed<T: DeserializeOwned>(value: &Value, expected: &str) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| Error::InvalidType {
        expected: expected.to_string(),
        found: e.to_string(),
    })
}

fn array_field(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<Value>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values.clone())),
        Some(other) => Err(Error::invalid_type("array", other)),
    }
}

fn has_src(map: &Map<String, Value>) -> bool {
    map.get("src").map_or(false, |v| !v.is_null())
}

pub(crate) fn normalize_item(value: Value) -> Result<NormalizedItem> {
    match value {
        Value::String(src) => Ok(NormalizedItem {
            fields: RawItem::default(),
            variants: vec![Value::String(src)],
        }),
        Value::Object(map) => {
            let fields: RawItem = typed(&Value::Object(map.clone()), "media item")?;
            let variants = if let Some(variants) = array_field(&map, "variants")? {
                variants
            } else if map.contains_key("representations")
                || map.contains_key("encodings")
                || has_src(&map)
            {
                // the item itself is the single variant
                vec![Value::Object(map)]
            } else {
                return Err(Error::EmptyVariants);
            };
            Ok(NormalizedItem { fields, variants })
        }
        other => Err(Error::invalid_type("string or object", &other)),
    }
}

pub(crate) fn normalize_variant(value: Value) -> Result<NormalizedVariant> {
    match value {
        Value::String(src) => Ok(NormalizedVariant {
            fields: RawVariant::default(),
            representations: vec![src_object(src)],
        }),
        Value::Object(map) => {
            let fields: RawVariant = typed(&Value::Object(map.clone()), "variant")?;
            let representations =
                if let Some(representations) = array_field(&map, "representations")? {
                    representations
                } else if map.contains_key("encodings") || has_src(&map) {
                    vec![Value::Object(map)]
                } else {
                    return Err(Error::EmptyRepresentations);
                };
            Ok(NormalizedVariant {
                fields,
                representations,
            })
        }
        other => Err(Error::invalid_type("string or object", &other)),
    }
}

pub(crate) fn normalize_representation(value: Value) -> Result<NormalizedRepresentation> {
    match value {
        Value::String(src) => Ok(NormalizedRepresentation {
            fields: RawRepresentation::default(),
            encodings: vec![RawEncoding {
                src: Some(src),
                ..Default::default()
            }],
        }),
        Value::Object(map) => {
            let fields: RawRepresentation = typed(&Value::Object(map.clone()), "representation")?;
            let encodings = match array_field(&map, "encodings")? {
                Some(values) => values
                    .into_iter()
                    .map(|value| match value {
                        Value::String(src) => Ok(RawEncoding {
                            src: Some(src),
                            ..Default::default()
                        }),
                        obj @ Value::Object(_) => typed(&obj, "encoding"),
                        other => Err(Error::invalid_type("string or object", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?,
                None if has_src(&map) => vec![typed(&Value::Object(map.clone()), "encoding")?],
                None => return Err(Error::MissingSrc),
            };
            if encodings.is_empty() {
                return Err(Error::MissingSrc);
            }
            Ok(NormalizedRepresentation { fields, encodings })
        }
        other => Err(Error::invalid_type("string or object", &other)),
    }
}
