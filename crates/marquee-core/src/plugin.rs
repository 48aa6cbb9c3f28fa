//! Format-engine plugin contract and capability negotiation
//!
//! Plugins are probed in registration order; the first one answering
//! `maybe`/`probably` handles the source. More specific engines therefore
//! have to be registered after the generic ones they refine. When no plugin
//! accepts a source the session assigns it to the native element directly.

use crate::{element::MediaElement, CancellableTask, MetaData, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Answer of a capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanPlay {
    No,
    Maybe,
    Probably,
}

impl CanPlay {
    /// Parse the native element's answer (`""`, `"maybe"`, `"probably"`)
    pub fn parse(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "probably" => CanPlay::Probably,
            "maybe" => CanPlay::Maybe,
            _ => CanPlay::No,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanPlay::No => "",
            CanPlay::Maybe => "maybe",
            CanPlay::Probably => "probably",
        }
    }

    pub fn is_playable(&self) -> bool {
        *self != CanPlay::No
    }
}

impl fmt::Display for CanPlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanPlay::No => write!(f, "no"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Native capability check (`canPlayType` on the platform element)
pub trait NativeSupport: Send + Sync {
    fn can_play_type(&self, mime_type: &str) -> CanPlay;
}

/// Handed to [`Plugin::load`]
#[derive(Clone)]
pub struct LoadContext {
    /// The session's element; plugins may attach to it but never replace it
    pub element: Arc<dyn MediaElement>,
    /// Task of this load. Plugins reject it on failure and watch
    /// `task.signal()` at every suspension point. A rejection is published
    /// once on `media/error`; a plugin that resolves it early still gets
    /// `media/ready` when the element reports metadata.
    pub task: CancellableTask<MetaData>,
}

/// Contract every format engine implements
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Side-effect free capability probe
    fn can_play(&self, meta: &MetaData) -> CanPlay;

    /// Format-specific setup. Returning `Err` is equivalent to rejecting
    /// `ctx.task`; success is reported by the element's metadata event.
    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()>;

    /// Enrich metadata once the element has loaded it. Returns true when the
    /// plugin claims the source, which stops further plugins from being asked.
    fn on_loaded(&self, _meta: &mut MetaData, _element: &dyn MediaElement) -> bool {
        false
    }

    /// Release every resource and listener held by the plugin
    fn destroy(&self) {}
}

/// Ordered plugin registry plus the native fallback
#[derive(Clone)]
pub struct Capabilities {
    plugins: Vec<Arc<dyn Plugin>>,
    native: Arc<dyn NativeSupport>,
}

impl Capabilities {
    pub fn new(native: Arc<dyn NativeSupport>) -> Self {
        Self {
            plugins: Vec::new(),
            native,
        }
    }

    /// Register a plugin after the ones already registered
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.register(plugin);
        self
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!(plugin = plugin.name(), position = self.plugins.len(), "Plugin registered");
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// First plugin in registration order that can play `meta`
    pub fn delegate_for(&self, meta: &MetaData) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|p| p.can_play(meta).is_playable())
            .cloned()
    }

    /// Session-level capability probe: the first affirmative plugin answer,
    /// otherwise the native check.
    pub fn can_play(&self, meta: &MetaData) -> CanPlay {
        for plugin in &self.plugins {
            let answer = plugin.can_play(meta);
            if answer.is_playable() {
                return answer;
            }
        }
        self.native_can_play(meta)
    }

    /// Native check only. Protected sources never play natively.
    pub fn native_can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.drm_system.is_some() {
            return CanPlay::No;
        }
        match meta.mime_type.as_deref() {
            Some(mime) => self.native.can_play_type(mime),
            None => CanPlay::No,
        }
    }

    pub fn native(&self) -> &Arc<dyn NativeSupport> {
        &self.native
    }

    /// Destroy every registered plugin
    pub fn destroy_all(&self) {
        for plugin in &self.plugins {
            plugin.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DrmSystem;

    struct FixedNative(CanPlay);

    impl NativeSupport for FixedNative {
        fn can_play_type(&self, _mime_type: &str) -> CanPlay {
            self.0
        }
    }

    struct FixedPlugin(&'static str, CanPlay);

    #[async_trait]
    impl Plugin for FixedPlugin {
        fn name(&self) -> &str {
            self.0
        }

        fn can_play(&self, _meta: &MetaData) -> CanPlay {
            self.1
        }

        async fn load(&self, _meta: &MetaData, _ctx: LoadContext) -> Result<()> {
            Ok(())
        }
    }

    fn mp4() -> MetaData {
        MetaData {
            mime_type: Some("video/mp4".into()),
            ..MetaData::from_src("https://cdn.example.com/a.mp4")
        }
    }

    #[test]
    fn test_can_play_parse() {
        assert_eq!(CanPlay::parse("probably"), CanPlay::Probably);
        assert_eq!(CanPlay::parse("maybe"), CanPlay::Maybe);
        assert_eq!(CanPlay::parse(""), CanPlay::No);
        assert!(CanPlay::Probably > CanPlay::Maybe);
    }

    #[test]
    fn test_plugin_probably_beats_native_maybe() {
        let caps = Capabilities::new(Arc::new(FixedNative(CanPlay::Maybe)))
            .with_plugin(Arc::new(FixedPlugin("engine", CanPlay::Probably)));

        assert_eq!(caps.native_can_play(&mp4()), CanPlay::Maybe);
        assert_eq!(caps.can_play(&mp4()), CanPlay::Probably);
    }

    #[test]
    fn test_first_affirmative_plugin_wins() {
        let caps = Capabilities::new(Arc::new(FixedNative(CanPlay::No)))
            .with_plugin(Arc::new(FixedPlugin("none", CanPlay::No)))
            .with_plugin(Arc::new(FixedPlugin("generic", CanPlay::Maybe)))
            .with_plugin(Arc::new(FixedPlugin("specific", CanPlay::Probably)));

        assert_eq!(caps.delegate_for(&mp4()).unwrap().name(), "generic");
        assert_eq!(caps.can_play(&mp4()), CanPlay::Maybe);
    }

    #[test]
    fn test_drm_never_native() {
        let caps = Capabilities::new(Arc::new(FixedNative(CanPlay::Probably)));
        let protected = MetaData {
            drm_system: Some(DrmSystem::Widevine),
            ..mp4()
        };

        assert_eq!(caps.can_play(&protected), CanPlay::No);
        assert!(caps.delegate_for(&protected).is_none());
    }
}
