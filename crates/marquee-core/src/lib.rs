//! Marquee Core - media source negotiation and playback sessions
//!
//! This crate provides the engine between a media descriptor and a native
//! playback element:
//! - Descriptor parsing, validation and playability probing
//! - Variant selection by quality, language and viewport
//! - Plugin-based load pipeline with cooperative cancellation
//! - Stall detection and native error re-classification
//! - Reference HLS, DASH and FairPlay plugins
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Player                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │    Source    │──▶│   Variant    │──▶│   Playback   │     │
//! │  │   Catalog    │   │   Selector   │   │   Session    │     │
//! │  └──────┬───────┘   └──────────────┘   └──────┬───────┘     │
//! │         │                                     │             │
//! │  ┌──────┴───────┐   ┌──────────────┐   ┌──────┴───────┐     │
//! │  │  Descriptor  │   │  Event Bus   │   │   Plugins    │     │
//! │  │   Fetcher    │   │              │   │ HLS/DASH/FPS │     │
//! │  └──────────────┘   └──────────────┘   └──────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod catalog;
pub mod config;
pub mod element;
pub mod error;
pub mod fetch;
pub mod player;
pub mod plugin;
pub mod plugins;
pub mod selector;
pub mod session;
pub mod stall;
pub mod task;
pub mod types;

pub use bus::{EventBus, LocalBus, Payload, SubscriptionId};
pub use catalog::{FormatRegistry, SourceCatalog};
pub use config::{CatalogOptions, PlayerConfig, SessionOptions};
pub use element::{ElementFactory, MediaElement, MediaMirror, MediaSnapshot, NativeEvent};
pub use error::{Error, MediaErrorCode, Result};
pub use fetch::{DescriptorFetcher, HttpFetcher};
pub use player::{Player, Translator};
pub use plugin::{CanPlay, Capabilities, LoadContext, NativeSupport, Plugin};
pub use selector::{select, Preferences};
pub use session::{LoadOptions, PlaybackSession};
pub use stall::{StallDetector, StallState};
pub use task::{CancellableTask, Outcome, TaskStatus};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup
pub fn init() {
    tracing::info!(version = VERSION, "Marquee Core initialized");
}
