//! Publish/subscribe event bus
//!
//! Components never reach for a global bus; an `Arc<dyn EventBus>` is
//! injected at construction so tests can substitute a recording fake.

use crate::{Error, MediaItem, MetaData};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Topics published by the catalog, the player and the playback session
pub mod topics {
    pub const DATA_PARSED: &str = "data/parsed";
    pub const DATA_READY: &str = "data/ready";
    pub const DATA_SOURCE: &str = "data/source";
    pub const DATA_ERROR: &str = "data/error";
    pub const DATA_NOMEDIA: &str = "data/nomedia";
    pub const MEDIA_READY: &str = "media/ready";
    pub const MEDIA_STALL_BEGIN: &str = "media/stall/begin";
    pub const MEDIA_STALL_END: &str = "media/stall/end";
    pub const MEDIA_ERROR: &str = "media/error";

    /// Subscribing to this topic receives every publication
    pub const ALL: &str = "*";

    /// Topic a native element event is republished under
    pub fn native(event: &str) -> String {
        format!("media/{}", event)
    }
}

/// Event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Full parsed catalog
    Items(Vec<MediaItem>),
    /// The selected catalog item
    Item(MediaItem),
    /// The selected or loaded source
    Source(MetaData),
    /// Descriptor/validation failure with a user-facing message
    DataError { code: String, message: String },
    /// Playback failure
    MediaError(Error),
    Stall { playhead: f64 },
    /// Republished native element event
    Native { event: String, current_time: f64 },
    Empty,
}

pub type Handler = Arc<dyn Fn(&str, &Payload) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous publish/subscribe with at-most-once delivery per publish call
pub trait EventBus: Send + Sync {
    fn publish(&self, topic: &str, payload: Payload);

    fn subscribe(&self, topic: &str, handler: Handler) -> SubscriptionId;

    /// Returns false if the subscription was unknown
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process event bus
#[derive(Default)]
pub struct LocalBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers_for(&self, topic: &str) -> Vec<Handler> {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        [topic, topics::ALL]
            .iter()
            .filter_map(|t| handlers.get(*t))
            .flatten()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

impl EventBus for LocalBus {
    fn publish(&self, topic: &str, payload: Payload) {
        // handlers run outside the lock so they may (un)subscribe
        let handlers = self.handlers_for(topic);
        trace!(topic, subscribers = handlers.len(), "Publishing");
        for handler in handlers {
            handler(topic, &payload);
        }
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(sub, _)| *sub == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }
}
