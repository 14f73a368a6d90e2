pub mod local;
pub mod remote;

pub use local::{LocalStore, STORAGE_FILE_NAME};
pub use remote::{CloudCollection, NotePatch, NoteStream, RemoteEvent, RemoteStore};
