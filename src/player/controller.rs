//! Playback state controller for vplay
//!
//! The controller owns one [`MediaEngine`] and is the only component allowed
//! to command it. It filters engine events down to the current load's live
//! subscriptions, derives the display state from them, and publishes that
//! state as independent [`Observable`] fields.
//!
//! The controller is synchronous and single-threaded: every method takes
//! `&mut self` and the caller supplies the clock. [`PlaybackSession`] drives
//! it from a tokio task.
//!
//! [`PlaybackSession`]: crate::player::PlaybackSession

use crate::history::HistoryStore;
use crate::player::engine::{
    EngineEvent, EngineEventKind, EventSink, LoadHandle, MediaEngine, PlayerInput, SeekSettled,
};
use crate::player::{
    Debouncer, EventClass, Observable, PlaybackFields, PlaybackSnapshot, PlaybackStatus,
    SourceLocator, SubscriptionSet, TickPolicy,
};
use crate::utils::config::PlaybackConfig;
use crate::utils::{format_time, UNKNOWN_TIME_TEXT};
use log::{debug, info, trace, warn};
use std::sync::Arc;
use tokio::time::Instant;

/// The load attempt currently owned by the controller
#[derive(Debug)]
struct CurrentLoad {
    handle: LoadHandle,
    source: SourceLocator,
}

/// A seek waiting for its completion callback
#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    id: u64,
    resume: bool,
}

/// Playback state controller
pub struct PlaybackController<E: MediaEngine> {
    engine: E,
    sink: EventSink,
    history: Option<Arc<dyn HistoryStore>>,
    tick_policy: TickPolicy,
    auto_play: bool,

    subscriptions: SubscriptionSet,
    current: Option<CurrentLoad>,
    last_source: Option<SourceLocator>,
    transport: Debouncer<bool>,
    pending_seek: Option<PendingSeek>,
    next_seek_id: u64,
    disposed: bool,

    status: Observable<PlaybackStatus>,
    duration_text: Observable<String>,
    current_time_text: Observable<String>,
    progress: Observable<f64>,
    is_playing: Observable<bool>,
}

impl<E: MediaEngine> PlaybackController<E> {
    /// Create a controller around `engine`
    ///
    /// `sink` must feed the same queue the engine reports into; seek
    /// completions are routed through it.
    pub fn new(engine: E, sink: EventSink, config: &PlaybackConfig) -> Self {
        Self {
            engine,
            sink,
            history: None,
            tick_policy: config.tick_policy,
            auto_play: config.auto_play,
            subscriptions: SubscriptionSet::new(),
            current: None,
            last_source: None,
            transport: Debouncer::new(config.debounce_window()),
            pending_seek: None,
            next_seek_id: 0,
            disposed: false,
            status: Observable::new(PlaybackStatus::Unknown),
            duration_text: Observable::new(UNKNOWN_TIME_TEXT.to_string()),
            current_time_text: Observable::new(UNKNOWN_TIME_TEXT.to_string()),
            progress: Observable::new(0.0),
            is_playing: Observable::new(false),
        }
    }

    /// Record successfully loaded sources in `store`
    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    // Commands

    /// Load `source`, discarding the previous load attempt
    ///
    /// All subscriptions of the previous load are cancelled before the new
    /// ones exist, so no stale event can be applied once this returns.
    pub fn load(&mut self, source: impl Into<SourceLocator>) -> LoadHandle {
        let source = source.into();
        self.release();
        // A fresh item starts paused until the engine reports otherwise
        self.transport.force(false);
        self.is_playing.set(false);

        let handle = self.engine.load(&source);
        info!("Loading {} ({})", source, handle);

        self.subscriptions.subscribe(handle, EventClass::Status);
        self.subscriptions.subscribe(handle, EventClass::Transport);
        self.subscriptions.subscribe(handle, EventClass::ReachedEnd);
        if self.tick_policy == TickPolicy::Continuous {
            self.subscriptions.subscribe(handle, EventClass::PeriodicTick);
        }

        self.status.set(PlaybackStatus::Unknown);
        self.current = Some(CurrentLoad {
            handle,
            source: source.clone(),
        });
        self.last_source = Some(source);
        self.disposed = false;

        handle
    }

    /// Reload the most recently loaded source
    pub fn retry(&mut self) -> Option<LoadHandle> {
        let source = self.last_source.clone()?;
        info!("Retrying {}", source);
        Some(self.load(source))
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        let Some(handle) = self.current_handle() else {
            debug!("play() ignored: nothing loaded");
            return;
        };

        self.engine.play();
        if self.tick_policy == TickPolicy::WhilePlaying {
            self.subscriptions.subscribe(handle, EventClass::PeriodicTick);
        }
    }

    /// Pause playback
    ///
    /// Also cancels the resume of a seek still in flight.
    pub fn pause(&mut self) {
        if self.current.is_none() {
            debug!("pause() ignored: nothing loaded");
            return;
        }

        if let Some(seek) = self.pending_seek.as_mut() {
            seek.resume = false;
        }
        self.pause_engine();
    }

    /// Pause if the published play state is playing, otherwise play
    pub fn toggle_play(&mut self) {
        if self.is_playing.get() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek to `fraction` of the duration
    ///
    /// Out-of-range fractions are clamped to `[0, 1]`. Playback is paused
    /// first and resumes only if the seek settles. Returns the target time in
    /// seconds, or `None` if nothing is loaded or the duration is not known.
    pub fn seek(&mut self, fraction: f64) -> Option<f64> {
        let handle = self.current_handle()?;
        let Some(duration) = self.known_duration() else {
            debug!("seek({}) ignored: duration not known", fraction);
            return None;
        };

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let target = fraction * duration;

        info!("Seeking to {:.2}s ({:.1}%)", target, fraction * 100.0);
        self.pause_engine();
        self.start_seek(handle, target, true);
        Some(target)
    }

    /// Cancel every live subscription and release the engine's item
    ///
    /// Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            debug!("dispose() ignored: already disposed");
            return;
        }

        self.release();
        self.engine.unload();
        self.current = None;
        self.disposed = true;
        info!("Playback controller disposed");
    }

    // Engine events

    /// Apply one input from the event queue
    pub fn handle_input(&mut self, input: PlayerInput, now: Instant) {
        match input {
            PlayerInput::Engine(event) => self.handle_event(event, now),
            PlayerInput::SeekSettled(settled) => self.handle_seek_settled(settled),
        }
    }

    /// Apply one engine event, dropping it unless it belongs to a live subscription
    pub fn handle_event(&mut self, event: EngineEvent, now: Instant) {
        if !self.subscriptions.accepts(&event) {
            trace!("Ignoring {:?} from {}: not subscribed", event.kind, event.handle);
            return;
        }

        match event.kind {
            EngineEventKind::Status(status) => self.on_status(status),
            EngineEventKind::PeriodicTick(seconds) => self.on_tick(seconds),
            EngineEventKind::Transport(state) => {
                if self.transport.push(state.is_playing(), now) {
                    trace!("Transport -> {:?}", state);
                }
            }
            EngineEventKind::ReachedEnd => self.on_reached_end(),
        }

        self.poll_timers(now);
    }

    /// Publish anything whose debounce window has elapsed by `now`
    pub fn poll_timers(&mut self, now: Instant) {
        if let Some(playing) = self.transport.poll(now) {
            if self.is_playing.set(playing) {
                debug!("is_playing -> {}", playing);
            }
        }
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work
    pub fn next_deadline(&self) -> Option<Instant> {
        self.transport.deadline()
    }

    fn on_status(&mut self, status: PlaybackStatus) {
        let Some(current) = self.current.as_ref() else {
            return;
        };

        match status {
            PlaybackStatus::Unknown => {
                trace!("{} still loading", current.handle);
                return;
            }
            PlaybackStatus::ReadyToPlay | PlaybackStatus::Failed => {}
        }

        let source = current.source.clone();
        // Both outcomes are terminal for this load
        self.subscriptions.unsubscribe(EventClass::Status);

        if status == PlaybackStatus::Failed {
            warn!("Failed to load {}", source);
            self.status.set(PlaybackStatus::Failed);
            return;
        }

        let duration = self.engine.current_duration_secs();
        let duration_text = duration
            .map(format_time)
            .unwrap_or_else(|| UNKNOWN_TIME_TEXT.to_string());
        info!("{} ready to play, duration {}", source, duration_text);
        self.duration_text.set(duration_text);
        self.status.set(PlaybackStatus::ReadyToPlay);

        if let Some(history) = &self.history {
            if let Err(e) = history.save(&source) {
                warn!("Failed to record {} in history: {}", source, e);
            }
        }

        if self.auto_play {
            self.play();
        }
    }

    fn on_tick(&mut self, seconds: f64) {
        if self.pending_seek.is_some() {
            trace!("Tick at {:.2}s ignored: seek in flight", seconds);
            return;
        }
        if !seconds.is_finite() {
            return;
        }
        let Some(duration) = self.known_duration() else {
            trace!("Tick at {:.2}s ignored: duration not known", seconds);
            return;
        };

        let seconds = seconds.max(0.0);
        self.current_time_text.set(format_time(seconds));
        self.progress.set((seconds / duration).clamp(0.0, 1.0));
    }

    fn on_reached_end(&mut self) {
        let Some(handle) = self.current_handle() else {
            return;
        };
        info!("{} reached end, rewinding", handle);

        self.pause_engine();
        self.start_seek(handle, 0.0, false);

        if self.known_duration().is_some() {
            self.current_time_text.set(format_time(0.0));
            self.progress.set(0.0);
        }
        self.transport.force(false);
        self.is_playing.set(false);
    }

    fn handle_seek_settled(&mut self, settled: SeekSettled) {
        let Some(pending) = self.pending_seek else {
            trace!("Seek #{} settled with nothing pending", settled.seek_id);
            return;
        };
        if self.current_handle() != Some(settled.handle) || pending.id != settled.seek_id {
            trace!("Ignoring stale completion of seek #{}", settled.seek_id);
            return;
        }

        self.pending_seek = None;
        if !settled.finished {
            info!("Seek #{} interrupted, staying paused", settled.seek_id);
        } else if pending.resume {
            debug!("Seek #{} settled, resuming", settled.seek_id);
            self.play();
        } else {
            debug!("Seek #{} settled", settled.seek_id);
        }
    }

    // Internals

    fn start_seek(&mut self, handle: LoadHandle, target: f64, resume: bool) {
        self.next_seek_id += 1;
        let id = self.next_seek_id;
        self.pending_seek = Some(PendingSeek { id, resume });

        let sink = self.sink.clone();
        self.engine.seek(
            target,
            Box::new(move |finished| {
                sink.seek_settled(SeekSettled {
                    handle,
                    seek_id: id,
                    finished,
                })
            }),
        );
    }

    fn pause_engine(&mut self) {
        self.engine.pause();
        if self.tick_policy == TickPolicy::WhilePlaying {
            self.subscriptions.unsubscribe(EventClass::PeriodicTick);
        }
    }

    /// Drop every subscription, timer and pending seek of the current load
    fn release(&mut self) {
        self.subscriptions.cancel_all();
        self.pending_seek = None;
        self.transport.reset();
    }

    fn known_duration(&self) -> Option<f64> {
        self.engine
            .current_duration_secs()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    // Accessors

    /// Handle of the current load attempt
    pub fn current_handle(&self) -> Option<LoadHandle> {
        self.current.as_ref().map(|c| c.handle)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of live engine subscriptions
    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.live_count()
    }

    /// Read-only access to the engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Current values of all published fields
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status.get(),
            duration_text: self.duration_text.get(),
            current_time_text: self.current_time_text.get(),
            progress: self.progress.get(),
            is_playing: self.is_playing.get(),
        }
    }

    /// Subscribe to every published field
    pub fn subscribe(&self) -> PlaybackFields {
        PlaybackFields {
            status: self.status.subscribe(),
            duration_text: self.duration_text.subscribe(),
            current_time_text: self.current_time_text.subscribe(),
            progress: self.progress.subscribe(),
            is_playing: self.is_playing.subscribe(),
        }
    }
}

impl<E: MediaEngine> Drop for PlaybackController<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}
