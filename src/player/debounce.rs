//! Dedupe + fixed-window debounce for noisy engine signals
//!
//! Consecutive equal inputs are dropped outright. Every accepted input
//! restarts the window; when the window elapses without a new input, the
//! latest value is released exactly once.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    last_input: Option<T>,
    pending: Option<(T, Instant)>,
}

impl<T: PartialEq + Clone> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_input: None,
            pending: None,
        }
    }

    /// Feed a raw value observed at `now`
    ///
    /// Returns `false` if it repeats the previous input and was dropped.
    pub fn push(&mut self, value: T, now: Instant) -> bool {
        if self.last_input.as_ref() == Some(&value) {
            return false;
        }
        self.last_input = Some(value.clone());
        self.pending = Some((value, now + self.window));
        true
    }

    /// When the pending value will settle, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Release the pending value once its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Settle on `value` immediately, discarding anything pending
    ///
    /// A following raw input equal to `value` counts as a duplicate.
    pub fn force(&mut self, value: T) {
        self.last_input = Some(value);
        self.pending = None;
    }

    /// Forget all input history
    pub fn reset(&mut self) {
        self.last_input = None;
        self.pending = None;
    }
}
