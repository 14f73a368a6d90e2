//! Local persistence for the unauthenticated/offline case.
//!
//! The whole notes collection lives in one JSON slot on disk and is
//! rewritten in full after every local mutation. Corrupt or missing data is
//! treated as "no data", never as a fatal error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::NoteError;
use crate::models::Note;

/// File name of the local notes slot.
pub const STORAGE_FILE_NAME: &str = "simple-notes-app-storage.json";

/// Durable key-value persistence of the full notes collection.
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Creates a store persisting to the given slot path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the slot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the last-persisted collection.
    ///
    /// Missing, unreadable, or unparsable slots all degrade to an empty
    /// collection. The local viewer owns everything it stored, so `is_owner`
    /// is set on every loaded note.
    pub fn load(&self) -> Vec<Note> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no local notes slot yet");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read local notes, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Note>>(&raw) {
            Ok(mut notes) => {
                for note in &mut notes {
                    note.is_owner = true;
                }
                notes
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "local notes slot is corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Serializes and persists the entire collection, replacing the slot.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self, notes: &[Note]) -> Result<(), NoteError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                NoteError::Persistence(format!(
                    "failed to create data directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string(notes)
            .map_err(|e| NoteError::Persistence(format!("failed to serialize notes: {}", e)))?;

        fs::write(&self.path, json).map_err(|e| {
            NoteError::Persistence(format!(
                "failed to write notes to '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}
