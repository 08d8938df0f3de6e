//! Async driver for the playback controller
//!
//! A [`PlaybackSession`] owns the controller and runs it on a single tokio
//! task. Commands from presentation code, engine events, seek completions
//! and the debounce timer are all serialised through one `select!` loop, so
//! every state change and every field write happens on that task.

use crate::internal_error;
use crate::player::engine::{EventReceiver, MediaEngine};
use crate::player::{PlaybackController, PlaybackFields, PlaybackSnapshot, SourceLocator};
use crate::utils::error::Result;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// User-facing command routed to the controller
#[derive(Debug, Clone)]
enum SessionCommand {
    Load(SourceLocator),
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    Retry,
    Dispose,
}

/// Event loop that owns a [`PlaybackController`]
pub struct PlaybackSession<E: MediaEngine> {
    controller: PlaybackController<E>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: EventReceiver,
}

impl<E: MediaEngine + 'static> PlaybackSession<E> {
    /// Wrap `controller`, whose engine reports into `events`
    ///
    /// The session does nothing until [`run`](Self::run) is awaited.
    pub fn new(controller: PlaybackController<E>, events: EventReceiver) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            commands: tx,
            fields: controller.subscribe(),
            task: Arc::new(Mutex::new(None)),
        };
        let session = Self {
            controller,
            commands: rx,
            events,
        };
        (session, handle)
    }

    /// Run the session on a new tokio task
    pub fn spawn(controller: PlaybackController<E>, events: EventReceiver) -> SessionHandle {
        let (session, handle) = Self::new(controller, events);
        *handle.task.lock() = Some(tokio::spawn(session.run()));
        handle
    }

    /// Process inputs until disposed or every handle is dropped
    pub async fn run(mut self) {
        info!("Playback session started");

        loop {
            let deadline = self.controller.next_deadline();

            // Commands first: a dispose or reload supersedes whatever the engine queued
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Dispose) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(input) = self.events.recv() => {
                    self.controller.handle_input(input, Instant::now());
                }
                _ = wait_until(deadline) => {
                    self.controller.poll_timers(Instant::now());
                }
            }
        }

        self.controller.dispose();
        info!("Playback session stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        debug!("Session command: {:?}", command);
        match command {
            SessionCommand::Load(source) => {
                self.controller.load(source);
            }
            SessionCommand::Play => self.controller.play(),
            SessionCommand::Pause => self.controller.pause(),
            SessionCommand::TogglePlay => self.controller.toggle_play(),
            SessionCommand::Seek(fraction) => {
                self.controller.seek(fraction);
            }
            SessionCommand::Retry => {
                self.controller.retry();
            }
            SessionCommand::Dispose => self.controller.dispose(),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`PlaybackSession`]
///
/// Commands are fire-and-forget; their effects show up on the published
/// fields. Commands sent after the session has stopped are dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    fields: PlaybackFields,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    pub fn load(&self, source: impl Into<SourceLocator>) {
        self.send(SessionCommand::Load(source.into()));
    }

    pub fn play(&self) {
        self.send(SessionCommand::Play);
    }

    pub fn pause(&self) {
        self.send(SessionCommand::Pause);
    }

    pub fn toggle_play(&self) {
        self.send(SessionCommand::TogglePlay);
    }

    /// Seek to `fraction` of the duration, clamped to `[0, 1]`
    pub fn seek(&self, fraction: f64) {
        self.send(SessionCommand::Seek(fraction));
    }

    /// Reload the last source, e.g. after a failed load
    pub fn retry(&self) {
        self.send(SessionCommand::Retry);
    }

    /// Stop the session and wait for it to release the engine
    ///
    /// Safe to call more than once and from several clones.
    pub async fn dispose(&self) -> Result<()> {
        self.send(SessionCommand::Dispose);

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| internal_error!("playback session task failed: {}", e))?;
        }
        Ok(())
    }

    /// Fresh receivers for every published field
    pub fn fields(&self) -> PlaybackFields {
        self.fields.clone()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.fields.snapshot()
    }

    /// Whether the session has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: SessionCommand) {
        if let Err(e) = self.commands.send(command) {
            debug!("Session closed, dropping {:?}", e.0);
        }
    }
}
