//! URL history for vplay
//!
//! The controller appends every source that becomes ready to play. Stores
//! de-duplicate by value and keep insertion order for the life of the
//! process; the controller never removes or rewrites entries.

mod file;

pub use file::FileHistory;

use crate::player::SourceLocator;
use crate::utils::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// History store trait
pub trait HistoryStore: Send + Sync {
    /// Record `source`; saving a locator already present is a no-op
    fn save(&self, source: &SourceLocator) -> Result<()>;

    /// All recorded locators, without duplicates
    fn retrieve(&self) -> Result<Vec<SourceLocator>>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    fn save(&self, source: &SourceLocator) -> Result<()> {
        (**self).save(source)
    }

    fn retrieve(&self) -> Result<Vec<SourceLocator>> {
        (**self).retrieve()
    }
}

/// In-process history store
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<SourceLocator>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl HistoryStore for MemoryHistory {
    fn save(&self, source: &SourceLocator) -> Result<()> {
        let mut entries = self.entries.lock();
        if !entries.contains(source) {
            entries.push(source.clone());
        }
        Ok(())
    }

    fn retrieve(&self) -> Result<Vec<SourceLocator>> {
        Ok(self.entries.lock().clone())
    }
}
