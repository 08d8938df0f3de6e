//! Playback state module for vplay
//!
//! This module bridges an asynchronous media engine to a presentation layer.
//! The [`PlaybackController`] owns one [`MediaEngine`], filters the engine's
//! events down to the current load, derives display state from them and
//! republishes it as independently observable fields.
//!
//! Everything the controller does happens on one logical thread. The
//! [`PlaybackSession`] provides that thread as a single tokio task and hands
//! out a cloneable [`SessionHandle`] for presentation code.

mod controller;
mod debounce;
mod engine;
mod observable;
mod session;
mod simulated;
mod subscription;

pub use controller::PlaybackController;
pub use debounce::Debouncer;
pub use engine::{
    event_channel, EngineEvent, EngineEventKind, EventReceiver, EventSink, LoadHandle,
    MediaEngine, PlayerInput, SeekCallback, SeekSettled,
};
pub use observable::Observable;
pub use session::{PlaybackSession, SessionHandle};
pub use simulated::{SimulatedEngine, SimulatedMedia};
pub use subscription::{EventClass, SubscriptionSet};

use crate::utils::error::VplayError;
use crate::utils::UNKNOWN_TIME_TEXT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;

/// Opaque identifier of a playable media item
///
/// The controller never inspects or validates the locator; it is handed to
/// the engine and the history store exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(String);

impl SourceLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceLocator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceLocator {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Readiness of the current load attempt
///
/// `Unknown` on every load; moves once to `ReadyToPlay` or `Failed`, and
/// stays there until the next load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Nothing reported yet for this load
    #[default]
    Unknown,

    /// Source opened and duration known
    ReadyToPlay,

    /// Source could not be opened or decoded
    Failed,
}

impl PlaybackStatus {
    /// Whether this status ends the load attempt's state machine
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Engine transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Playback paused
    Paused,

    /// Play requested but stalled (buffering)
    WaitingToPlay,

    /// Currently playing
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// When periodic ticks update the published time fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickPolicy {
    /// Ticks are observed for as long as a source is loaded
    Continuous,

    /// Ticks are armed by `play()` and disarmed by `pause()`
    WhilePlaying,
}

impl FromStr for TickPolicy {
    type Err = VplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continuous" => Ok(Self::Continuous),
            "while-playing" | "while_playing" => Ok(Self::WhilePlaying),
            other => Err(VplayError::InvalidInput(format!(
                "unknown tick policy '{}', expected 'continuous' or 'while-playing'",
                other
            ))),
        }
    }
}

/// Point-in-time copy of every published field
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub duration_text: String,
    pub current_time_text: String,
    /// Fraction of the media played, in `[0, 1]`
    pub progress: f64,
    pub is_playing: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Unknown,
            duration_text: UNKNOWN_TIME_TEXT.to_string(),
            current_time_text: UNKNOWN_TIME_TEXT.to_string(),
            progress: 0.0,
            is_playing: false,
        }
    }
}

/// Read-only, field-by-field view of the controller's published state
///
/// Each receiver wakes only when its own field changes.
#[derive(Debug, Clone)]
pub struct PlaybackFields {
    pub status: watch::Receiver<PlaybackStatus>,
    pub duration_text: watch::Receiver<String>,
    pub current_time_text: watch::Receiver<String>,
    pub progress: watch::Receiver<f64>,
    pub is_playing: watch::Receiver<bool>,
}

impl PlaybackFields {
    /// Current values of all fields
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: *self.status.borrow(),
            duration_text: self.duration_text.borrow().clone(),
            current_time_text: self.current_time_text.borrow().clone(),
            progress: *self.progress.borrow(),
            is_playing: *self.is_playing.borrow(),
        }
    }
}
