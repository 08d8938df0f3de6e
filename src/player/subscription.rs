//! Bookkeeping of the controller's live engine subscriptions
//!
//! At most one subscription per event class is live, and all of them belong
//! to the same load handle. An event is applied only if its class is
//! subscribed for its handle; anything else is stale and dropped.

use crate::player::engine::{EngineEvent, EngineEventKind, LoadHandle};
use log::debug;

/// The four event classes an engine emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Status,
    PeriodicTick,
    Transport,
    ReachedEnd,
}

impl EventClass {
    pub const ALL: [EventClass; 4] = [
        EventClass::Status,
        EventClass::PeriodicTick,
        EventClass::Transport,
        EventClass::ReachedEnd,
    ];

    pub fn of(kind: &EngineEventKind) -> Self {
        match kind {
            EngineEventKind::Status(_) => EventClass::Status,
            EngineEventKind::PeriodicTick(_) => EventClass::PeriodicTick,
            EngineEventKind::Transport(_) => EventClass::Transport,
            EngineEventKind::ReachedEnd => EventClass::ReachedEnd,
        }
    }

    fn index(self) -> usize {
        match self {
            EventClass::Status => 0,
            EventClass::PeriodicTick => 1,
            EventClass::Transport => 2,
            EventClass::ReachedEnd => 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct SubscriptionSet {
    slots: [Option<LoadHandle>; 4],
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `class` for `handle`, replacing whatever held that slot
    pub fn subscribe(&mut self, handle: LoadHandle, class: EventClass) {
        self.slots[class.index()] = Some(handle);
    }

    pub fn unsubscribe(&mut self, class: EventClass) {
        self.slots[class.index()] = None;
    }

    /// Cancel every live subscription; returns how many there were
    pub fn cancel_all(&mut self) -> usize {
        let live = self.live_count();
        if live > 0 {
            debug!("Cancelling {} engine subscription(s)", live);
        }
        self.slots = [None; 4];
        live
    }

    pub fn is_subscribed(&self, handle: LoadHandle, class: EventClass) -> bool {
        self.slots[class.index()] == Some(handle)
    }

    /// Whether `event` belongs to a live subscription
    pub fn accepts(&self, event: &EngineEvent) -> bool {
        self.is_subscribed(event.handle, EventClass::of(&event.kind))
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
