//! Element stand-in for plugin unit tests

use crate::{element::MediaElement, Result};
use async_trait::async_trait;

/// An element that never loads anything
pub(crate) struct IdleElement;

#[async_trait]
impl MediaElement for IdleElement {
    fn src(&self) -> Option<String> {
        None
    }

    fn set_src(&self, _src: Option<&str>) {}

    fn load(&self) {}

    async fn play(&self) -> Result<()> {
        Ok(())
    }

    fn pause(&self) {}

    fn current_time(&self) -> f64 {
        0.0
    }

    fn set_current_time(&self, _time: f64) {}

    fn duration(&self) -> Option<f64> {
        None
    }

    fn paused(&self) -> bool {
        true
    }

    fn ended(&self) -> bool {
        false
    }

    fn seekable(&self) -> bool {
        false
    }

    fn video_width(&self) -> Option<u32> {
        None
    }

    fn video_height(&self) -> Option<u32> {
        None
    }

    fn volume(&self) -> f64 {
        1.0
    }

    fn set_volume(&self, _volume: f64) {}

    fn muted(&self) -> bool {
        false
    }

    fn set_muted(&self, _muted: bool) {}

    fn looping(&self) -> bool {
        false
    }

    fn set_looping(&self, _looping: bool) {}
}
