//! Playback Session - owner of the native element and its load pipeline
//!
//! Coordinates:
//! - Element provisioning and persisted volume/mute/loop
//! - Plugin delegation of each load
//! - Resolution of the load task on native metadata
//! - Playhead restore and autoplay
//! - Stall detection
//! - Re-classification of native errors

use crate::{
    bus::{topics, EventBus, Payload},
    catalog::is_inline_source,
    config::SessionOptions,
    element::{ElementFactory, MediaElement, MediaMirror, NativeEvent},
    fetch::DescriptorFetcher,
    plugin::{CanPlay, Capabilities, LoadContext, Plugin},
    stall::{StallDetector, StallState, StallTimer, StallTransition},
    CancellableTask, Error, MediaErrorCode, MetaData, Outcome, Result, SavedState, SessionId,
    TaskStatus,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Per-load options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Carry the playhead and play state over to the new source
    pub remember_state: bool,
    /// Start playback once the source is ready
    pub play: bool,
}

/// The load currently owned by the session
struct ActiveLoad {
    meta: MetaData,
    task: CancellableTask<MetaData>,
    plugin: Option<Arc<dyn Plugin>>,
    options: LoadOptions,
    saved: SavedState,
    /// `media/ready` went out for this load
    ready: bool,
    /// The rejection of this load went out on `media/error`
    error_reported: bool,
}

impl ActiveLoad {
    fn owns(&self, task: &CancellableTask<MetaData>) -> bool {
        self.task.outcome().ptr_eq(&task.outcome())
    }
}

struct SessionState {
    element: Arc<dyn MediaElement>,
    meta: Option<MetaData>,
    active: Option<ActiveLoad>,
    stall: StallDetector,
    stall_timer: Option<JoinHandle<()>>,
    casting: bool,
    volume: f64,
    muted: bool,
    looping: bool,
}

impl SessionState {
    fn abort_stall_timer(&mut self) {
        if let Some(timer) = self.stall_timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    id: SessionId,
    options: SessionOptions,
    bus: Arc<dyn EventBus>,
    capabilities: Arc<Capabilities>,
    factory: Arc<dyn ElementFactory>,
    fetcher: Option<Arc<dyn DescriptorFetcher>>,
    state: Mutex<SessionState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, events: Vec<(String, Payload)>) {
        for (topic, payload) in events {
            self.bus.publish(&topic, payload);
        }
    }

    fn stall_timer_fired(&self, generation: u64) {
        let transition = {
            let mut state = self.state();
            if state.casting {
                return;
            }
            let playhead = state.element.current_time();
            state.stall.on_timer(generation, playhead)
        };
        self.publish(stall_events(transition));
    }
}

/// Playback session over one native element at a time
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<Shared>,
}

impl PlaybackSession {
    /// Create a session and provision its first element
    pub fn new(
        options: SessionOptions,
        bus: Arc<dyn EventBus>,
        capabilities: Arc<Capabilities>,
        factory: Arc<dyn ElementFactory>,
        fetcher: Option<Arc<dyn DescriptorFetcher>>,
    ) -> Self {
        let element = factory.create();
        element.set_volume(options.volume);
        element.set_muted(options.muted);
        element.set_looping(options.looping);

        let state = SessionState {
            element,
            meta: None,
            active: None,
            stall: StallDetector::new(options.stall_timeout),
            stall_timer: None,
            casting: false,
            volume: options.volume,
            muted: options.muted,
            looping: options.looping,
        };

        let id = SessionId::new();
        debug!(session_id = %id, "Playback session created");

        Self {
            shared: Arc::new(Shared {
                id,
                options,
                bus,
                capabilities,
                factory,
                fetcher,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Read-only view over the current element
    pub fn mirror(&self) -> MediaMirror {
        MediaMirror::new(Arc::clone(&self.shared.state().element))
    }

    /// The source currently loading or loaded
    pub fn metadata(&self) -> Option<MetaData> {
        self.shared.state().meta.clone()
    }

    /// Status of the most recent load
    pub fn load_status(&self) -> Option<TaskStatus> {
        self.shared.state().active.as_ref().map(|a| a.task.status())
    }

    pub fn stall_state(&self) -> StallState {
        self.shared.state().stall.state()
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.shared.capabilities
    }

    /// Session-level capability probe
    pub fn can_play(&self, meta: &MetaData) -> CanPlay {
        self.shared.capabilities.can_play(meta)
    }

    /// Tear down the element and provision a fresh one. The pending load is
    /// cancelled and persisted volume/mute/loop are re-applied.
    #[instrument(skip(self), fields(session_id = %self.shared.id))]
    pub fn replace_element(&self) {
        let (old, plugin, events) = {
            let mut state = self.shared.state();
            let mut events = Vec::new();

            let plugin = state.active.take().and_then(|active| {
                if active.task.is_pending() {
                    active.task.cancel();
                }
                active.plugin
            });

            let playhead = state.element.current_time();
            events.extend(stall_events(state.stall.reset(playhead)));
            state.abort_stall_timer();

            let element = self.shared.factory.create();
            element.set_volume(state.volume);
            element.set_muted(state.muted);
            element.set_looping(state.looping);

            let old = std::mem::replace(&mut state.element, element);
            state.meta = None;
            (old, plugin, events)
        };

        if let Some(plugin) = plugin {
            plugin.destroy();
        }
        old.pause();
        old.set_src(None);
        self.shared.factory.destroy(&old);
        self.shared.publish(events);
        debug!("Element replaced");
    }

    /// Load a source.
    ///
    /// Loading the src that is already pending returns the pending outcome;
    /// any other pending load is cancelled first.
    #[instrument(skip(self, meta), fields(session_id = %self.shared.id, src = %meta.src))]
    pub async fn load(&self, meta: MetaData, options: LoadOptions) -> Outcome<MetaData> {
        let (task, plugin, element, events) = {
            let mut state = self.shared.state();
            let mut events = Vec::new();

            if let Some(active) = &state.active {
                if active.meta.src == meta.src && active.task.is_pending() {
                    debug!("Load already pending");
                    return active.task.outcome();
                }
            }
            if let Some(previous) = state.active.take() {
                if previous.task.is_pending() {
                    info!(previous = %previous.meta.src, "Cancelling pending load");
                    previous.task.cancel();
                }
            }

            let element = Arc::clone(&state.element);
            let saved = snapshot(element.as_ref(), options.remember_state);

            let playhead = element.current_time();
            events.extend(stall_events(state.stall.reset(playhead)));
            state.abort_stall_timer();

            let task = CancellableTask::new();
            let plugin = self.shared.capabilities.delegate_for(&meta);
            state.meta = Some(meta.clone());
            state.active = Some(ActiveLoad {
                meta: meta.clone(),
                task: task.clone(),
                plugin: plugin.clone(),
                options,
                saved,
                ready: false,
                error_reported: false,
            });
            (task, plugin, element, events)
        };
        self.shared.publish(events);

        match plugin {
            Some(plugin) => {
                info!(plugin = plugin.name(), "Delegating load");
                let ctx = LoadContext {
                    element,
                    task: task.clone(),
                };
                match plugin.load(&meta, ctx).await {
                    Ok(()) => self.report_rejection(&task),
                    Err(err) => {
                        warn!(plugin = plugin.name(), error = %err, "Plugin load failed");
                        self.fail(&task, err);
                    }
                }
            }
            None => match meta.drm_system {
                Some(drm) => {
                    self.fail(&task, Error::drm(format!("No plugin handles {:?} protected sources", drm)));
                }
                None => {
                    info!("Assigning source to native element");
                    element.set_src(Some(&meta.src));
                    element.load();
                }
            },
        }

        task.outcome()
    }

    /// Feed an event of the current native element into the session
    pub async fn handle_event(&self, event: NativeEvent) {
        let current_time = self.shared.state().element.current_time();
        self.shared.publish(vec![(
            topics::native(event.name()),
            Payload::Native {
                event: event.name().to_string(),
                current_time,
            },
        )]);

        match event {
            NativeEvent::Play | NativeEvent::Waiting => self.play_intent(),
            NativeEvent::TimeUpdate | NativeEvent::Playing | NativeEvent::CanPlay => self.progress(),
            NativeEvent::Pause | NativeEvent::Ended => self.paused(),
            NativeEvent::LoadedMetadata => {
                self.progress();
                self.metadata_loaded().await;
            }
            NativeEvent::Error(code) => self.element_error(code).await,
            _ => {}
        }
    }

    /// Start playback and register the play intent with the stall detector
    pub async fn play(&self) -> Result<()> {
        let element = Arc::clone(&self.shared.state().element);
        self.play_intent();
        element.play().await
    }

    pub fn pause(&self) {
        let element = Arc::clone(&self.shared.state().element);
        element.pause();
        self.paused();
    }

    pub fn seek(&self, time: f64) {
        self.shared.state().element.set_current_time(time);
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::InvalidConfig(format!("volume must be within 0..=1, got {}", volume)));
        }
        let mut state = self.shared.state();
        state.volume = volume;
        state.element.set_volume(volume);
        Ok(())
    }

    pub fn set_muted(&self, muted: bool) {
        let mut state = self.shared.state();
        state.muted = muted;
        state.element.set_muted(muted);
    }

    pub fn set_loop(&self, looping: bool) {
        let mut state = self.shared.state();
        state.looping = looping;
        state.element.set_looping(looping);
    }

    /// A remote-casting session suppresses stall detection while active
    pub fn set_casting(&self, active: bool) {
        let events = {
            let mut state = self.shared.state();
            if state.casting == active {
                return;
            }
            state.casting = active;
            if !active {
                return;
            }
            state.abort_stall_timer();
            let playhead = state.element.current_time();
            stall_events(state.stall.reset(playhead))
        };
        info!(casting = active, "Casting state changed");
        self.shared.publish(events);
    }

    /// Cancel the pending load, destroy every plugin and release the element
    #[instrument(skip(self), fields(session_id = %self.shared.id))]
    pub fn destroy(&self) {
        let element = {
            let mut state = self.shared.state();
            if let Some(active) = state.active.take() {
                active.task.cancel();
            }
            state.abort_stall_timer();
            state.meta = None;
            Arc::clone(&state.element)
        };
        self.shared.capabilities.destroy_all();
        element.pause();
        element.set_src(None);
        self.shared.factory.destroy(&element);
        info!("Playback session destroyed");
    }

    fn fail(&self, task: &CancellableTask<MetaData>, error: Error) {
        task.reject(error);
        self.report_rejection(task);
    }

    /// Publish the rejection of the active load once, whoever rejected it
    fn report_rejection(&self, task: &CancellableTask<MetaData>) {
        let Some(Err(error)) = task.outcome().try_result() else {
            return;
        };
        if task.status() != TaskStatus::Rejected {
            return;
        }
        {
            let mut state = self.shared.state();
            match state.active.as_mut() {
                Some(active) if active.owns(task) && !active.error_reported => {
                    active.error_reported = true;
                }
                _ => return,
            }
        }
        warn!(code = %error.error_code(), error = %error, "Load failed");
        self.shared
            .publish(vec![(topics::MEDIA_ERROR.to_string(), Payload::MediaError(error))]);
    }

    fn play_intent(&self) {
        let mut state = self.shared.state();
        if state.casting {
            return;
        }
        let playhead = state.element.current_time();
        if let Some(timer) = state.stall.on_play_intent(playhead) {
            state.abort_stall_timer();
            state.stall_timer = Some(self.arm(timer));
        }
    }

    fn arm(&self, timer: StallTimer) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.stall_timer_fired(timer.generation);
            }
        })
    }

    fn progress(&self) {
        let transition = {
            let mut state = self.shared.state();
            let playhead = state.element.current_time();
            let transition = state.stall.on_progress(playhead);
            if state.stall.state() == StallState::Clear {
                state.abort_stall_timer();
            }
            transition
        };
        self.shared.publish(stall_events(transition));
    }

    fn paused(&self) {
        let transition = {
            let mut state = self.shared.state();
            state.abort_stall_timer();
            let playhead = state.element.current_time();
            state.stall.on_pause(playhead)
        };
        self.shared.publish(stall_events(transition));
    }

    async fn metadata_loaded(&self) {
        let (mut meta, task, options, saved, element) = {
            let mut state = self.shared.state();
            let element = Arc::clone(&state.element);
            let Some(active) = state.active.as_mut().filter(|a| {
                !a.ready && matches!(a.task.status(), TaskStatus::Pending | TaskStatus::Resolved)
            }) else {
                return;
            };
            active.ready = true;
            (
                active.meta.clone(),
                active.task.clone(),
                active.options,
                active.saved.clone(),
                element,
            )
        };

        for plugin in self.shared.capabilities.plugins() {
            if plugin.on_loaded(&mut meta, element.as_ref()) {
                debug!(plugin = plugin.name(), "Metadata enriched");
                break;
            }
        }
        fill_from_element(&mut meta, element.as_ref());

        if !task.resolve(meta.clone()) && task.status() != TaskStatus::Resolved {
            debug!(src = %meta.src, "Metadata arrived for a settled load");
            return;
        }
        {
            let mut state = self.shared.state();
            match state.active.as_mut() {
                Some(active) if active.owns(&task) => active.meta = meta.clone(),
                _ => return,
            }
            state.meta = Some(meta.clone());
        }
        info!(src = %meta.src, duration = ?meta.duration, live = meta.is_live(), "Media ready");
        self.shared
            .publish(vec![(topics::MEDIA_READY.to_string(), Payload::Source(meta.clone()))]);

        if saved.playhead > 0.0 && element.seekable() && !meta.is_live() {
            debug!(playhead = saved.playhead, "Restoring playhead");
            element.set_current_time(saved.playhead);
        }

        if saved.playing || options.play {
            if let Err(err) = self.play().await {
                warn!(error = %err, "Resuming playback failed");
            }
        } else if self.shared.options.auto_play && !saved.ignore_autoplay {
            self.autoplay().await;
        }
    }

    async fn autoplay(&self) {
        match self.play().await {
            Ok(()) => {}
            Err(Error::PlayNotAllowed) if self.shared.options.auto_mute => {
                info!("Autoplay rejected, retrying muted");
                self.set_muted(true);
                if let Err(err) = self.play().await {
                    warn!(error = %err, "Muted autoplay failed");
                }
            }
            Err(err) => warn!(error = %err, "Autoplay failed"),
        }
    }

    async fn element_error(&self, code: MediaErrorCode) {
        let (task, src) = {
            let state = self.shared.state();
            (
                state.active.as_ref().map(|a| a.task.clone()),
                state.element.src(),
            )
        };

        let mut error = Error::media(code, format!("Native playback error {}", code));
        if code == MediaErrorCode::SrcNotSupported {
            if let Some(src) = src.as_deref() {
                error = self.reprobe(src, error).await;
            }
        }

        match task {
            Some(task) => match task.status() {
                TaskStatus::Pending => self.fail(&task, error),
                TaskStatus::Resolved => self.publish_error(error),
                TaskStatus::Rejected => self.report_rejection(&task),
                TaskStatus::Cancelled => debug!("Error for a cancelled load ignored"),
            },
            None => self.publish_error(error),
        }
    }

    /// Distinguish an unsupported format from an HTTP failure
    async fn reprobe(&self, src: &str, error: Error) -> Error {
        let Some(fetcher) = self.shared.fetcher.as_ref() else {
            return error;
        };
        if is_inline_source(src) {
            return error;
        }
        match fetcher.head_status(src).await {
            Ok(status) if status >= 400 => {
                info!(src, status, "Unsupported source re-classified as network error");
                Error::media(MediaErrorCode::Network, format!("HTTP {} for {}", status, src))
            }
            Ok(_) => error,
            Err(err) => {
                info!(src, error = %err, "Unsupported source unreachable");
                Error::media(MediaErrorCode::Network, err.to_string())
            }
        }
    }

    fn publish_error(&self, error: Error) {
        warn!(code = %error.error_code(), error = %error, "Playback error");
        self.shared
            .publish(vec![(topics::MEDIA_ERROR.to_string(), Payload::MediaError(error))]);
    }
}

fn snapshot(element: &dyn MediaElement, remember_state: bool) -> SavedState {
    let src = element.src();
    let paused = element.paused();
    SavedState {
        playhead: if remember_state { element.current_time() } else { 0.0 },
        playing: remember_state && src.is_some() && !paused,
        ignore_autoplay: remember_state && src.is_some() && paused,
        src,
    }
}

fn fill_from_element(meta: &mut MetaData, element: &dyn MediaElement) {
    if let Some(duration) = element.duration() {
        if duration.is_infinite() {
            meta.is_live.get_or_insert(true);
        } else if meta.duration.is_none() && duration.is_finite() {
            meta.duration = Some(duration);
        }
    }
    if meta.width.is_none() {
        meta.width = element.video_width();
    }
    if meta.height.is_none() {
        meta.height = element.video_height();
    }
}

fn stall_events(transition: Option<StallTransition>) -> Vec<(String, Payload)> {
    match transition {
        Some(StallTransition::Begin { playhead }) => {
            vec![(topics::MEDIA_STALL_BEGIN.to_string(), Payload::Stall { playhead })]
        }
        Some(StallTransition::End { playhead }) => {
            vec![(topics::MEDIA_STALL_END.to_string(), Payload::Stall { playhead })]
        }
        None => Vec::new(),
    }
}
