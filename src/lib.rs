//! Simple Notes Core Library
//!
//! The notes synchronization and sharing state layer: a reactive notes
//! collection per viewer session, persisted either to a local JSON slot
//! (anonymous use) or to a shared cloud document collection with real-time
//! change notification (signed-in use), with an advisory owner/editor/viewer
//! access model and a JSON import/export boundary.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod store;
pub mod sync;
pub mod tags;
pub mod transfer;

pub use config::{Config, ConfigError};
pub use error::NoteError;
pub use identity::{IdentityProvider, UserProfile, Viewer};
pub use models::{
    NewNote, Note, SharedRole, SharedUser, TextAlign, TextOptions, Todo, LOCAL_USER_ID,
    MAX_TITLE_LEN,
};
pub use store::{CloudCollection, LocalStore, NotePatch, NoteStream, RemoteEvent, RemoteStore};
pub use sync::{SyncController, SyncState};
pub use tags::{check_suggest_content, merge_tags, TagSuggester, MIN_SUGGEST_CONTENT_LEN};
pub use transfer::{export_file_name, ExportedNote, ImportedNote};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
