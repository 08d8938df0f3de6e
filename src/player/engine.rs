//! Media engine boundary
//!
//! The decode/render engine is opaque to this crate. It accepts a source
//! locator, plays, pauses and seeks, and reports back through four event
//! classes delivered on an [`EventSink`]. Failure crosses this boundary only
//! as data (`Status(Failed)`), so none of the engine operations return a
//! `Result`.

use crate::player::{PlaybackStatus, SourceLocator, TransportState};
use log::trace;
use std::fmt;
use tokio::sync::mpsc;

/// Identity of one `load` call's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadHandle(u64);

impl LoadHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The handle following this one
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// Event payload reported by an engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEventKind {
    /// Readiness transition of the loaded item
    Status(PlaybackStatus),

    /// Current playback time in seconds, at the engine's fixed cadence
    PeriodicTick(f64),

    /// Play/pause/buffering transition
    Transport(TransportState),

    /// Natural end of the media, once per playback pass
    ReachedEnd,
}

/// An engine event tagged with the load it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineEvent {
    pub handle: LoadHandle,
    pub kind: EngineEventKind,
}

/// Completion report of a seek issued by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekSettled {
    pub handle: LoadHandle,
    pub seek_id: u64,
    /// `false` when the seek was interrupted before reaching its target
    pub finished: bool,
}

/// Everything that flows back into the controller's event loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerInput {
    Engine(EngineEvent),
    SeekSettled(SeekSettled),
}

/// Callback invoked exactly once when a seek settles
pub type SeekCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Sending half of the controller's event queue
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<PlayerInput>,
}

/// Receiving half of the controller's event queue
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerInput>;

/// Create a connected event sink and receiver
pub fn event_channel() -> (EventSink, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}

impl EventSink {
    /// Report an engine event for `handle`
    ///
    /// Events sent after the receiving side has shut down are dropped.
    pub fn emit(&self, handle: LoadHandle, kind: EngineEventKind) {
        if self.tx.send(PlayerInput::Engine(EngineEvent { handle, kind })).is_err() {
            trace!("Dropping {:?} for {}: controller gone", kind, handle);
        }
    }

    pub(crate) fn seek_settled(&self, settled: SeekSettled) {
        if self.tx.send(PlayerInput::SeekSettled(settled)).is_err() {
            trace!("Dropping seek completion for {}: controller gone", settled.handle);
        }
    }

    /// Whether the receiving side has shut down
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Media engine trait defining the player boundary
///
/// Implementations report every event through the [`EventSink`] they were
/// built with, tagged with the handle returned by the `load` that produced
/// it. Only the controller calls these methods.
pub trait MediaEngine: Send {
    /// Replace the current item with `source`
    ///
    /// Returns a handle distinct from every handle returned before. Events
    /// for earlier handles must stop once this returns.
    fn load(&mut self, source: &SourceLocator) -> LoadHandle;

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Seek to `target_secs`
    ///
    /// `on_settled` receives `true` once the target is reached, or `false`
    /// if the seek is interrupted by another seek or load.
    fn seek(&mut self, target_secs: f64, on_settled: SeekCallback);

    /// Duration of the current item, once known
    fn current_duration_secs(&self) -> Option<f64>;

    /// Release the current item
    fn unload(&mut self) {}
}

impl<E: MediaEngine + ?Sized> MediaEngine for Box<E> {
    fn load(&mut self, source: &SourceLocator) -> LoadHandle {
        (**self).load(source)
    }

    fn play(&mut self) {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn seek(&mut self, target_secs: f64, on_settled: SeekCallback) {
        (**self).seek(target_secs, on_settled)
    }

    fn current_duration_secs(&self) -> Option<f64> {
        (**self).current_duration_secs()
    }

    fn unload(&mut self) {
        (**self).unload()
    }
}
