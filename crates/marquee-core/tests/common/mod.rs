//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use marquee_core::{
    bus::{Handler, SubscriptionId},
    CanPlay, DescriptorFetcher, ElementFactory, Error, EventBus, LoadContext, LocalBus,
    MediaElement, MetaData, NativeSupport, Payload, Plugin, Result,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Element
// =============================================================================

#[derive(Debug, Clone)]
pub struct ElementState {
    pub src: Option<String>,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub ended: bool,
    pub seekable: bool,
    pub volume: f64,
    pub muted: bool,
    pub looping: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Reject `play()` unless muted, like a browser autoplay policy
    pub require_muted_play: bool,
    pub load_calls: usize,
    pub play_calls: usize,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            src: None,
            current_time: 0.0,
            duration: None,
            paused: true,
            ended: false,
            seekable: true,
            volume: 1.0,
            muted: false,
            looping: false,
            width: None,
            height: None,
            require_muted_play: false,
            load_calls: 0,
            play_calls: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeElement {
    state: Mutex<ElementState>,
}

impl FakeElement {
    pub fn state(&self) -> ElementState {
        self.state.lock().unwrap().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut ElementState)) {
        f(&mut self.state.lock().unwrap());
    }
}

#[async_trait]
impl MediaElement for FakeElement {
    fn src(&self) -> Option<String> {
        self.state.lock().unwrap().src.clone()
    }

    fn set_src(&self, src: Option<&str>) {
        self.state.lock().unwrap().src = src.map(str::to_string);
    }

    fn load(&self) {
        let mut state = self.state.lock().unwrap();
        state.load_calls += 1;
        state.current_time = 0.0;
        state.paused = true;
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        if state.require_muted_play && !state.muted {
            return Err(Error::PlayNotAllowed);
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn set_current_time(&self, time: f64) {
        self.state.lock().unwrap().current_time = time;
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn ended(&self) -> bool {
        self.state.lock().unwrap().ended
    }

    fn seekable(&self) -> bool {
        self.state.lock().unwrap().seekable
    }

    fn video_width(&self) -> Option<u32> {
        self.state.lock().unwrap().width
    }

    fn video_height(&self) -> Option<u32> {
        self.state.lock().unwrap().height
    }

    fn volume(&self) -> f64 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().unwrap().volume = volume;
    }

    fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }
}

/// Hands out [`FakeElement`]s and keeps them for inspection
#[derive(Default)]
pub struct FakeFactory {
    created: Mutex<Vec<Arc<FakeElement>>>,
    /// Template applied to every new element
    pub template: Mutex<ElementState>,
    pub destroyed: AtomicUsize,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The most recently created element
    pub fn current(&self) -> Arc<FakeElement> {
        self.created.lock().unwrap().last().cloned().expect("no element created")
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl ElementFactory for FakeFactory {
    fn create(&self) -> Arc<dyn MediaElement> {
        let element = Arc::new(FakeElement {
            state: Mutex::new(self.template.lock().unwrap().clone()),
        });
        self.created.lock().unwrap().push(Arc::clone(&element));
        element
    }

    fn destroy(&self, _element: &Arc<dyn MediaElement>) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Native support answering from a fixed mime table
pub struct FakeNative(pub HashMap<&'static str, CanPlay>);

impl FakeNative {
    /// mp4/mp3 probably, webm maybe
    pub fn browser() -> Arc<Self> {
        Arc::new(Self(HashMap::from([
            ("video/mp4", CanPlay::Probably),
            ("audio/mpeg", CanPlay::Probably),
            ("video/webm", CanPlay::Maybe),
        ])))
    }
}

impl NativeSupport for FakeNative {
    fn can_play_type(&self, mime_type: &str) -> CanPlay {
        self.0.get(mime_type).copied().unwrap_or(CanPlay::No)
    }
}

/// What [`FakePlugin::load`] does
#[derive(Debug, Clone)]
pub enum LoadBehavior {
    /// Assign the src to the element
    Attach,
    /// Fail with the given error
    Fail(Error),
    /// Reject the load task directly and return `Ok`
    Reject(Error),
    /// Assign the src and resolve the load task directly
    Resolve,
    /// Wait for cancellation, then report it
    Hang,
}

pub struct FakePlugin {
    pub name: &'static str,
    pub answer: CanPlay,
    /// Only answer for sources ending with this suffix
    pub suffix: &'static str,
    pub behavior: LoadBehavior,
    /// Value written to `is_live` when claiming a source in `on_loaded`
    pub claims_live: Option<bool>,
    pub loads: AtomicUsize,
    pub destroys: AtomicUsize,
}

impl FakePlugin {
    pub fn new(name: &'static str, suffix: &'static str, answer: CanPlay) -> Self {
        Self {
            name,
            answer,
            suffix,
            behavior: LoadBehavior::Attach,
            claims_live: None,
            loads: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(mut self, behavior: LoadBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn claiming(mut self, live: bool) -> Self {
        self.claims_live = Some(live);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for FakePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn can_play(&self, meta: &MetaData) -> CanPlay {
        if meta.src.ends_with(self.suffix) {
            self.answer
        } else {
            CanPlay::No
        }
    }

    async fn load(&self, meta: &MetaData, ctx: LoadContext) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            LoadBehavior::Attach => {
                ctx.element.set_src(Some(&meta.src));
                ctx.element.load();
                Ok(())
            }
            LoadBehavior::Fail(err) => Err(err.clone()),
            LoadBehavior::Reject(err) => {
                ctx.task.reject(err.clone());
                Ok(())
            }
            LoadBehavior::Resolve => {
                ctx.element.set_src(Some(&meta.src));
                ctx.element.load();
                ctx.task.resolve(meta.clone());
                Ok(())
            }
            LoadBehavior::Hang => {
                ctx.task.signal().cancelled().await;
                Err(Error::Cancelled)
            }
        }
    }

    fn on_loaded(&self, meta: &mut MetaData, _element: &dyn MediaElement) -> bool {
        match self.claims_live {
            Some(live) if meta.src.ends_with(self.suffix) => {
                meta.is_live = Some(live);
                true
            }
            _ => false,
        }
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Network
// =============================================================================

#[derive(Default)]
pub struct FakeFetcher {
    pub documents: HashMap<String, Value>,
    pub statuses: HashMap<String, u16>,
    pub head_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_document(mut self, url: &str, document: Value) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }
}

#[async_trait]
impl DescriptorFetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        if let Some(status) = self.statuses.get(url) {
            return Err(Error::HttpStatus {
                status: *status,
                url: url.to_string(),
            });
        }
        self.documents.get(url).cloned().ok_or_else(|| Error::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }

    async fn head_status(&self, url: &str) -> Result<u16> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statuses.get(url).copied().unwrap_or(200))
    }
}

// =============================================================================
// Bus
// =============================================================================

/// A [`LocalBus`] that also records every publication
#[derive(Default)]
pub struct RecordingBus {
    inner: LocalBus,
    events: Mutex<Vec<(String, Payload)>>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn topics(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|(t, _)| t == topic).count()
    }

    pub fn payloads(&self, topic: &str) -> Vec<Payload> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, topic: &str, payload: Payload) {
        self.events.lock().unwrap().push((topic.to_string(), payload.clone()));
        self.inner.publish(topic, payload);
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> SubscriptionId {
        self.inner.subscribe(topic, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }
}
