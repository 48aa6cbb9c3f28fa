//! Player - wires catalog, selector and session together
//!
//! `set_data` drives the whole data flow:
//!
//! ```text
//! descriptor ─▶ SourceCatalog ─▶ data/parsed
//!                    │
//!              select_item(0) ─▶ data/ready
//!                    │
//!             VariantSelector ─▶ data/source
//!                    │
//!            PlaybackSession::load ─▶ media/ready | media/error
//! ```

use crate::{
    bus::{topics, EventBus, Payload},
    catalog::SourceCatalog,
    config::PlayerConfig,
    element::ElementFactory,
    fetch::DescriptorFetcher,
    plugin::Capabilities,
    selector::{self, Preferences},
    session::{LoadOptions, PlaybackSession},
    Error, MediaItem, MetaData, Outcome, Result,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Locale collaborator used to build user-facing error text
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, vars: &HashMap<String, String>) -> Option<String>;
}

struct PlayerState {
    items: Vec<MediaItem>,
    current: Option<usize>,
    preferences: Preferences,
    viewport_height: f64,
    device_pixel_ratio: f64,
}

pub struct Player {
    catalog: SourceCatalog,
    session: PlaybackSession,
    bus: Arc<dyn EventBus>,
    translator: Option<Arc<dyn Translator>>,
    state: Mutex<PlayerState>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        bus: Arc<dyn EventBus>,
        capabilities: Arc<Capabilities>,
        factory: Arc<dyn ElementFactory>,
        fetcher: Option<Arc<dyn DescriptorFetcher>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut catalog = SourceCatalog::new(config.catalog_options(), Arc::clone(&capabilities));
        if let Some(fetcher) = &fetcher {
            catalog = catalog.with_fetcher(Arc::clone(fetcher));
        }
        let session = PlaybackSession::new(
            config.session_options(),
            Arc::clone(&bus),
            capabilities,
            factory,
            fetcher,
        );

        Ok(Self {
            catalog,
            session,
            bus,
            translator: None,
            state: Mutex::new(PlayerState {
                items: Vec::new(),
                current: None,
                preferences: Preferences {
                    quality: config.preferred_quality,
                    language: config.preferred_language,
                },
                viewport_height: 0.0,
                device_pixel_ratio: 1.0,
            }),
        })
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    pub fn items(&self) -> Vec<MediaItem> {
        self.state().items.clone()
    }

    pub fn current_item(&self) -> Option<MediaItem> {
        let state = self.state();
        state.current.and_then(|i| state.items.get(i).cloned())
    }

    /// Parse a descriptor and start loading its first item
    #[instrument(skip(self, data))]
    pub async fn set_data(&self, data: Value) -> Result<Option<Outcome<MetaData>>> {
        let items = match self.catalog.parse(data).await {
            Ok(items) => items,
            Err(err) => {
                self.publish_data_error(&err);
                if matches!(err, Error::NoMedia) {
                    self.bus.publish(topics::DATA_NOMEDIA, Payload::Empty);
                }
                return Err(err);
            }
        };

        {
            let mut state = self.state();
            state.items = items.clone();
            state.current = None;
        }
        self.bus.publish(topics::DATA_PARSED, Payload::Items(items.clone()));

        if items.is_empty() {
            info!("Descriptor contains no media");
            self.bus.publish(topics::DATA_NOMEDIA, Payload::Empty);
            return Ok(None);
        }
        self.select_item(0).await.map(Some)
    }

    /// Switch to the catalog item at `index`
    #[instrument(skip(self))]
    pub async fn select_item(&self, index: usize) -> Result<Outcome<MetaData>> {
        let (item, meta) = {
            let mut state = self.state();
            let item = state
                .items
                .get(index)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("No catalog item at index {}", index)))?;
            state.current = Some(index);
            let meta = selector::select_metadata(
                &item,
                &state.preferences,
                state.viewport_height,
                state.device_pixel_ratio,
            );
            (item, meta)
        };

        self.bus.publish(topics::DATA_READY, Payload::Item(item));
        self.session.replace_element();

        let meta = meta.ok_or(Error::EmptyVariants)?;
        debug!(src = %meta.src, quality = ?meta.quality, language = ?meta.language, "Source selected");
        self.bus.publish(topics::DATA_SOURCE, Payload::Source(meta.clone()));

        Ok(self.session.load(meta, LoadOptions::default()).await)
    }

    /// Change the viewer preferences; a different selection is loaded with
    /// the playhead carried over
    pub async fn set_preferences(
        &self,
        quality: Option<u32>,
        language: Option<String>,
    ) -> Option<Outcome<MetaData>> {
        let meta = {
            let mut state = self.state();
            state.preferences = Preferences { quality, language };
            let item = state.current.and_then(|i| state.items.get(i))?;
            selector::select_metadata(
                item,
                &state.preferences,
                state.viewport_height,
                state.device_pixel_ratio,
            )?
        };

        let current = self.session.metadata().map(|m| m.src);
        if current.as_deref() == Some(meta.src.as_str()) {
            return None;
        }

        info!(src = %meta.src, "Preferences changed selection");
        self.bus.publish(topics::DATA_SOURCE, Payload::Source(meta.clone()));
        let options = LoadOptions {
            remember_state: true,
            play: false,
        };
        Some(self.session.load(meta, options).await)
    }

    /// Record the viewport used by the height heuristic
    pub fn set_viewport(&self, height: f64, device_pixel_ratio: f64) {
        let mut state = self.state();
        state.viewport_height = height;
        state.device_pixel_ratio = device_pixel_ratio;
    }

    /// User-facing message for an error code
    pub fn message_for(&self, error: &Error) -> String {
        let code = error.error_code();
        let mut vars = HashMap::new();
        vars.insert("detail".to_string(), error.to_string());
        self.translator
            .as_ref()
            .and_then(|t| t.translate(&code, &vars))
            .unwrap_or(code)
    }

    fn publish_data_error(&self, error: &Error) {
        warn!(code = %error.error_code(), error = %error, "Descriptor rejected");
        self.bus.publish(
            topics::DATA_ERROR,
            Payload::DataError {
                code: error.error_code(),
                message: self.message_for(error),
            },
        );
    }

    pub fn destroy(&self) {
        self.session.destroy();
    }
}
