use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A to-do item inside a note.
///
/// `text` may be empty transiently while the user is typing, but the editor
/// requires it to be non-empty before the note is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Unique within its note.
    pub id: String,
    pub text: String,
    pub completed: bool,
}

impl Todo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
        }
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}
