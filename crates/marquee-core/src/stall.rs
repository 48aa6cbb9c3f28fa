//! Stall detection
//!
//! A pure state machine: the session feeds it play intents, progress and
//! pauses and arms a timer when asked to. Timer expiries carry the
//! generation they were armed for so that a timer made obsolete by progress
//! is ignored.
//!
//! ```text
//!   play/waiting        timer, no movement
//! Clear ──────────▶ Delaying ──────────────▶ Stalled
//!   ▲                  │                        │
//!   └──── movement ────┴─── movement/pause ─────┘
//! ```

use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Playhead movement below this many seconds does not count as progress
pub const STALL_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StallState {
    Clear,
    Delaying,
    Stalled,
}

impl fmt::Display for StallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StallState::Clear => write!(f, "clear"),
            StallState::Delaying => write!(f, "delaying"),
            StallState::Stalled => write!(f, "stalled"),
        }
    }
}

/// Request to arm the delay timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallTimer {
    pub generation: u64,
    pub delay: Duration,
}

/// Notification to publish
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StallTransition {
    Begin { playhead: f64 },
    End { playhead: f64 },
}

#[derive(Debug, Clone)]
pub struct StallDetector {
    timeout: Option<Duration>,
    state: StallState,
    pre_stall_playhead: f64,
    generation: u64,
}

impl StallDetector {
    /// `None` disables detection entirely
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
            state: StallState::Clear,
            pre_stall_playhead: 0.0,
            generation: 0,
        }
    }

    pub fn state(&self) -> StallState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout.is_some()
    }

    /// Play intent or `waiting` signal. Returns the timer to arm when the
    /// detector starts delaying.
    pub fn on_play_intent(&mut self, playhead: f64) -> Option<StallTimer> {
        let delay = self.timeout?;
        if self.state != StallState::Clear {
            return None;
        }
        self.state = StallState::Delaying;
        self.pre_stall_playhead = playhead;
        self.generation += 1;
        debug!(playhead, generation = self.generation, "Stall timer armed");
        Some(StallTimer {
            generation: self.generation,
            delay,
        })
    }

    /// Timer expiry for `generation`
    pub fn on_timer(&mut self, generation: u64, playhead: f64) -> Option<StallTransition> {
        if generation != self.generation || self.state != StallState::Delaying {
            return None;
        }
        if self.moved(playhead) {
            self.state = StallState::Clear;
            return None;
        }
        self.state = StallState::Stalled;
        info!(playhead, "Playback stalled");
        Some(StallTransition::Begin { playhead })
    }

    /// Time update or readiness signal
    pub fn on_progress(&mut self, playhead: f64) -> Option<StallTransition> {
        if self.state == StallState::Clear || !self.moved(playhead) {
            return None;
        }
        self.clear(playhead)
    }

    /// Explicit pause (or end of media)
    pub fn on_pause(&mut self, playhead: f64) -> Option<StallTransition> {
        self.clear(playhead)
    }

    /// Return to `Clear` unconditionally, e.g. on a source switch
    pub fn reset(&mut self, playhead: f64) -> Option<StallTransition> {
        self.clear(playhead)
    }

    fn moved(&self, playhead: f64) -> bool {
        (playhead - self.pre_stall_playhead).abs() > STALL_EPSILON
    }

    fn clear(&mut self, playhead: f64) -> Option<StallTransition> {
        let previous = self.state;
        self.state = StallState::Clear;
        // invalidates a pending timer
        self.generation += 1;
        if previous == StallState::Stalled {
            info!(playhead, "Playback resumed");
            Some(StallTransition::End { playhead })
        } else {
            None
        }
    }
}
