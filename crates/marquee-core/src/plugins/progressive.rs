//! Progressive download (plain files)

use super::{is_dash, is_hls};
use crate::{
    element::MediaElement,
    plugin::{CanPlay, LoadContext, NativeSupport, Plugin},
    MetaData, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Hands unprotected plain files to the element after asking the native check
pub struct ProgressivePlugin {
    native: Arc<dyn NativeSupport>,
}

impl ProgressivePlugin {
    pub fn new(native: Arc<dyn NativeSupport>) -> Self {
        Self { native }
    }
}

#[async_trait]
impl Plugin for ProgressivePlugin {
    fn name(&self) -> &str {
        "progressive"
    }

    fn can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.drm_system.is_some() || is_hls(meta) || is_dash(meta) {
            return CanPlay::No;
        }
        match meta.mime_type.as_deref() {
            Some(mime) => self.native.can_play_type(mime),
            None => CanPlay::No,
        }
    }

    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()> {
        if ctx.task.signal().is_cancelled() {
            return Ok(());
        }
        debug!(src = %meta.src, "Progressive load");
        ctx.element.set_src(Some(&meta.src));
        ctx.element.load();
        Ok(())
    }

    fn on_loaded(&self, meta: &mut MetaData, element: &dyn MediaElement) -> bool {
        if !self.can_play(meta).is_playable() {
            return false;
        }
        let live = element.duration().map_or(false, f64::is_infinite);
        meta.is_live = Some(live);
        true
    }
}
