//! vplay - playback state controller for a single video
//!
//! The [`player`] module turns asynchronous engine signals into a small set
//! of display fields (status, formatted times, progress, playing flag).
//! [`history`] keeps the sources that became ready to play, and [`utils`]
//! carries configuration, errors and time formatting.

pub mod history;
pub mod player;
pub mod utils;

pub use history::{FileHistory, HistoryStore, MemoryHistory};
pub use player::{
    PlaybackController, PlaybackSession, PlaybackSnapshot, PlaybackStatus, SessionHandle,
    SourceLocator, TickPolicy,
};
pub use utils::{Config, Result, VplayError};
