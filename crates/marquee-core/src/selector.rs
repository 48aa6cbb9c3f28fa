//! Variant selection
//!
//! Picks the representation of a [`MediaItem`] to load given the viewer's
//! quality and language preferences and the viewport size. Precedence:
//!
//! 1. exact (quality, language) match
//! 2. language matches (the default one if it is among them, otherwise by height)
//! 3. quality matches (the default one if it matches, otherwise the first)
//! 4. the default representation
//! 5. height heuristic over everything, or the first representation

use crate::{MediaItem, MetaData, Representation};
use tracing::debug;

/// Slack applied to a representation's height before comparing it to the viewport
pub const HEIGHT_SLACK: f64 = 1.2;

/// Viewer preferences. A `None` preference never matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub quality: Option<u32>,
    pub language: Option<String>,
}

impl Preferences {
    pub fn new(quality: Option<u32>, language: Option<impl Into<String>>) -> Self {
        Self {
            quality,
            language: language.map(Into::into),
        }
    }

    fn quality_matches(&self, rep: &Representation) -> bool {
        self.quality.is_some() && rep.quality == self.quality
    }

    fn language_matches(&self, rep: &Representation) -> bool {
        self.language.is_some() && rep.language == self.language
    }
}

/// Select the representation to load, or `None` for an item without any
pub fn select<'a>(
    item: &'a MediaItem,
    prefs: &Preferences,
    viewport_height: f64,
    device_pixel_ratio: f64,
) -> Option<&'a Representation> {
    let mut language_matches = Vec::new();
    let mut quality_matches = Vec::new();
    let mut default = None;
    let mut all = Vec::new();

    for rep in item.representations() {
        let language = prefs.language_matches(rep);
        let quality = prefs.quality_matches(rep);
        if language && quality {
            debug!(src = %rep.src, "Exact preference match");
            return Some(rep);
        }
        if language {
            language_matches.push(rep);
        }
        if quality {
            quality_matches.push(rep);
        }
        if rep.default && default.is_none() {
            default = Some(rep);
        }
        all.push(rep);
    }

    if !language_matches.is_empty() {
        if let Some(rep) = default.filter(|d| prefs.language_matches(d)) {
            return Some(rep);
        }
        return by_height(language_matches, viewport_height, device_pixel_ratio);
    }

    if let Some(first) = quality_matches.first() {
        return Some(default.filter(|d| prefs.quality_matches(d)).unwrap_or(*first));
    }

    if default.is_some() {
        return default;
    }

    by_height(all, viewport_height, device_pixel_ratio)
}

/// Select and convert to the [`MetaData`] a session loads
pub fn select_metadata(
    item: &MediaItem,
    prefs: &Preferences,
    viewport_height: f64,
    device_pixel_ratio: f64,
) -> Option<MetaData> {
    select(item, prefs, viewport_height, device_pixel_ratio).map(MetaData::from_representation)
}

/// Smallest representation whose height (with slack) exceeds the viewport,
/// else the largest. Without any height information the first candidate wins.
fn by_height(
    mut candidates: Vec<&Representation>,
    viewport_height: f64,
    device_pixel_ratio: f64,
) -> Option<&Representation> {
    if !candidates.iter().any(|rep| rep.height.is_some()) {
        return candidates.first().copied();
    }

    candidates.sort_by_key(|rep| rep.height.unwrap_or(0));
    let target = viewport_height * device_pixel_ratio;
    let chosen = candidates
        .iter()
        .find(|rep| f64::from(rep.height.unwrap_or(0)) * HEIGHT_SLACK > target)
        .or_else(|| candidates.last())
        .copied();

    if let Some(rep) = chosen {
        debug!(src = %rep.src, height = ?rep.height, target, "Selected by height");
    }
    chosen
}
