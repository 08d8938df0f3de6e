//! Simulated media engine
//!
//! A tokio-driven stand-in for a real decode/render engine. It honours the
//! full [`MediaEngine`] contract: readiness after a load delay, periodic
//! ticks at a fixed cadence whether playing or not, transport reports,
//! seeks that settle after a latency or get interrupted, and one
//! end-of-media report per playback pass. Position advances by one tick
//! interval per tick while playing.
//!
//! Must be used from within a tokio runtime.

use crate::player::engine::{EngineEventKind, EventSink, LoadHandle, MediaEngine, SeekCallback};
use crate::player::{PlaybackStatus, SourceLocator, TransportState};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Properties of the media every load produces
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    /// Media length in seconds
    pub duration_secs: f64,

    /// Time from `load` to the readiness report
    pub load_delay: Duration,

    /// Report `Failed` instead of `ReadyToPlay`
    pub fail: bool,

    /// Time a seek takes to settle
    pub seek_latency: Duration,

    /// Periodic tick cadence
    pub tick_interval: Duration,
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            load_delay: Duration::from_millis(300),
            fail: false,
            seek_latency: Duration::from_millis(150),
            tick_interval: Duration::from_secs(1),
        }
    }
}

struct InFlightSeek {
    generation: u64,
    target: f64,
    callback: SeekCallback,
}

struct SimState {
    handle: LoadHandle,
    ready: bool,
    playing: bool,
    position: f64,
    seek_generation: u64,
    seek: Option<InFlightSeek>,
}

impl SimState {
    fn new(handle: LoadHandle) -> Self {
        Self {
            handle,
            ready: false,
            playing: false,
            position: 0.0,
            seek_generation: 0,
            seek: None,
        }
    }
}

/// Simulated engine
pub struct SimulatedEngine {
    sink: EventSink,
    media: SimulatedMedia,
    last_handle: LoadHandle,
    state: Option<Arc<Mutex<SimState>>>,
    item_task: Option<JoinHandle<()>>,
    seek_task: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    pub fn new(sink: EventSink, media: SimulatedMedia) -> Self {
        Self {
            sink,
            media,
            last_handle: LoadHandle::new(0),
            state: None,
            item_task: None,
            seek_task: None,
        }
    }

    /// Current playback position of the loaded item
    pub fn position(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.lock().position)
    }

    /// Abort background work and interrupt any in-flight seek
    fn teardown(&mut self) {
        if let Some(task) = self.item_task.take() {
            task.abort();
        }
        if let Some(task) = self.seek_task.take() {
            task.abort();
        }
        if let Some(state) = self.state.take() {
            let seek = state.lock().seek.take();
            if let Some(seek) = seek {
                (seek.callback)(false);
            }
        }
    }

    fn set_playing(&mut self, playing: bool) {
        let Some(state) = &self.state else {
            return;
        };

        let handle = {
            let mut state = state.lock();
            if !state.ready || state.playing == playing {
                return;
            }
            state.playing = playing;
            state.handle
        };

        let transport = if playing {
            TransportState::Playing
        } else {
            TransportState::Paused
        };
        self.sink.emit(handle, EngineEventKind::Transport(transport));
    }
}

impl MediaEngine for SimulatedEngine {
    fn load(&mut self, source: &SourceLocator) -> LoadHandle {
        self.teardown();

        let handle = self.last_handle.next();
        self.last_handle = handle;
        info!("Simulated engine loading {} as {}", source, handle);

        let state = Arc::new(Mutex::new(SimState::new(handle)));
        self.state = Some(Arc::clone(&state));
        self.item_task = Some(tokio::spawn(run_item(
            handle,
            self.media.clone(),
            self.sink.clone(),
            state,
        )));

        handle
    }

    fn play(&mut self) {
        self.set_playing(true);
    }

    fn pause(&mut self) {
        self.set_playing(false);
    }

    fn seek(&mut self, target_secs: f64, on_settled: SeekCallback) {
        let Some(state) = self.state.clone() else {
            on_settled(false);
            return;
        };

        let (generation, interrupted) = {
            let mut guard = state.lock();
            if !guard.ready {
                drop(guard);
                on_settled(false);
                return;
            }
            guard.seek_generation += 1;
            let generation = guard.seek_generation;
            let target = target_secs.max(0.0).min(self.media.duration_secs.max(0.0));
            let interrupted = guard.seek.replace(InFlightSeek {
                generation,
                target,
                callback: on_settled,
            });
            (generation, interrupted)
        };

        if let Some(previous) = interrupted {
            debug!("Seek to {:.2}s interrupted", previous.target);
            (previous.callback)(false);
        }
        if let Some(task) = self.seek_task.take() {
            task.abort();
        }

        let latency = self.media.seek_latency;
        self.seek_task = Some(tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let settled = {
                let mut guard = state.lock();
                match guard.seek.take() {
                    Some(seek) if seek.generation == generation => {
                        guard.position = seek.target;
                        Some(seek.callback)
                    }
                    other => {
                        guard.seek = other;
                        None
                    }
                }
            };
            if let Some(callback) = settled {
                callback(true);
            }
        }));
    }

    fn current_duration_secs(&self) -> Option<f64> {
        let state = self.state.as_ref()?;
        state.lock().ready.then_some(self.media.duration_secs)
    }

    fn unload(&mut self) {
        debug!("Simulated engine unloading");
        self.teardown();
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_item(
    handle: LoadHandle,
    media: SimulatedMedia,
    sink: EventSink,
    state: Arc<Mutex<SimState>>,
) {
    tokio::time::sleep(media.load_delay).await;

    if media.fail {
        sink.emit(handle, EngineEventKind::Status(PlaybackStatus::Failed));
        return;
    }

    state.lock().ready = true;
    sink.emit(handle, EngineEventKind::Status(PlaybackStatus::ReadyToPlay));

    let step = media.tick_interval.as_secs_f64();
    let mut interval = tokio::time::interval(media.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;

        let (position, ended) = {
            let mut state = state.lock();
            if state.playing && state.seek.is_none() {
                state.position = (state.position + step).min(media.duration_secs).max(0.0);
            }
            let ended = state.playing && state.position >= media.duration_secs;
            if ended {
                state.playing = false;
            }
            (state.position, ended)
        };

        sink.emit(handle, EngineEventKind::PeriodicTick(position));
        if ended {
            sink.emit(handle, EngineEventKind::Transport(TransportState::Paused));
            sink.emit(handle, EngineEventKind::ReachedEnd);
        }
    }
}
