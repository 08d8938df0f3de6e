//! JSON-file history store

use crate::history::HistoryStore;
use crate::player::SourceLocator;
use crate::utils::error::{IntoPlayerError, Result};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    entries: Vec<SourceLocator>,
}

/// History persisted as a JSON file
///
/// The file is read once on open and rewritten whenever a new locator is
/// saved.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    entries: Mutex<Vec<SourceLocator>>,
}

impl FileHistory {
    /// Open the history at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let file: HistoryFile = serde_json::from_str(&data)?;
            let mut entries: Vec<SourceLocator> = Vec::with_capacity(file.entries.len());
            for entry in file.entries {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
            info!("Loaded {} history entries from {:?}", entries.len(), path);
            entries
        } else {
            debug!("No history file at {:?}, starting empty", path);
            Vec::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &[SourceLocator]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).history_err("Failed to create history directory")?;
        }

        let file = HistoryFile {
            entries: entries.to_vec(),
        };
        let data = serde_json::to_string_pretty(&file)?;

        // Replace via rename; the file on disk is always complete
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).history_err("Failed to write history file")?;
        std::fs::rename(&tmp, &self.path).history_err("Failed to replace history file")?;

        Ok(())
    }
}

impl HistoryStore for FileHistory {
    fn save(&self, source: &SourceLocator) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains(source) {
            return Ok(());
        }

        entries.push(source.clone());
        if let Err(e) = self.write(&entries) {
            entries.pop();
            return Err(e);
        }
        debug!("Saved {} to history", source);
        Ok(())
    }

    fn retrieve(&self) -> Result<Vec<SourceLocator>> {
        Ok(self.entries.lock().clone())
    }
}
