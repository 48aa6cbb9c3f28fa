//! Native playback element abstraction
//!
//! The element is provisioned by an [`ElementFactory`] and exclusively owned
//! by a [`PlaybackSession`](crate::PlaybackSession). Embedders forward the
//! element's events to [`PlaybackSession::handle_event`](crate::PlaybackSession::handle_event).

use crate::{MediaErrorCode, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// The native playback element
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn src(&self) -> Option<String>;

    fn set_src(&self, src: Option<&str>);

    /// Start fetching the assigned src
    fn load(&self);

    /// Start playback. Autoplay policy rejections surface as
    /// [`Error::PlayNotAllowed`](crate::Error::PlayNotAllowed).
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Playhead in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&self, time: f64);

    /// Duration in seconds, infinite for live media
    fn duration(&self) -> Option<f64>;

    fn paused(&self) -> bool;

    fn ended(&self) -> bool;

    fn seekable(&self) -> bool;

    fn video_width(&self) -> Option<u32>;

    fn video_height(&self) -> Option<u32>;

    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    fn muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn looping(&self) -> bool;

    fn set_looping(&self, looping: bool);
}

/// Creates and disposes native elements
pub trait ElementFactory: Send + Sync {
    fn create(&self) -> Arc<dyn MediaElement>;

    /// Release an element; it is never used again afterwards
    fn destroy(&self, element: &Arc<dyn MediaElement>);
}

/// Events emitted by the native element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    LoadStart,
    LoadedMetadata,
    CanPlay,
    Play,
    Playing,
    Pause,
    Waiting,
    TimeUpdate,
    Seeking,
    Seeked,
    DurationChange,
    VolumeChange,
    RateChange,
    Ended,
    Error(MediaErrorCode),
}

impl NativeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NativeEvent::LoadStart => "loadstart",
            NativeEvent::LoadedMetadata => "loadedmetadata",
            NativeEvent::CanPlay => "canplay",
            NativeEvent::Play => "play",
            NativeEvent::Playing => "playing",
            NativeEvent::Pause => "pause",
            NativeEvent::Waiting => "waiting",
            NativeEvent::TimeUpdate => "timeupdate",
            NativeEvent::Seeking => "seeking",
            NativeEvent::Seeked => "seeked",
            NativeEvent::DurationChange => "durationchange",
            NativeEvent::VolumeChange => "volumechange",
            NativeEvent::RateChange => "ratechange",
            NativeEvent::Ended => "ended",
            NativeEvent::Error(_) => "error",
        }
    }
}

/// Read-only mirror over the current element's fields
#[derive(Clone)]
pub struct MediaMirror {
    element: Arc<dyn MediaElement>,
}

/// Point-in-time copy of the mirrored fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSnapshot {
    pub src: Option<String>,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub ended: bool,
    pub volume: f64,
    pub muted: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
}

impl MediaMirror {
    pub(crate) fn new(element: Arc<dyn MediaElement>) -> Self {
        Self { element }
    }

    pub fn src(&self) -> Option<String> {
        self.element.src()
    }

    pub fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    pub fn duration(&self) -> Option<f64> {
        self.element.duration()
    }

    pub fn paused(&self) -> bool {
        self.element.paused()
    }

    pub fn ended(&self) -> bool {
        self.element.ended()
    }

    pub fn volume(&self) -> f64 {
        self.element.volume()
    }

    pub fn muted(&self) -> bool {
        self.element.muted()
    }

    pub fn looping(&self) -> bool {
        self.element.looping()
    }

    pub fn snapshot(&self) -> MediaSnapshot {
        MediaSnapshot {
            src: self.element.src(),
            current_time: self.element.current_time(),
            duration: self.element.duration(),
            paused: self.element.paused(),
            ended: self.element.ended(),
            volume: self.element.volume(),
            muted: self.element.muted(),
            looping: self.element.looping(),
            video_width: self.element.video_width(),
            video_height: self.element.video_height(),
        }
    }
}
