use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared_user::{SharedRole, SharedUser};
use super::text_options::TextOptions;
use super::todo::Todo;
use crate::error::NoteError;

/// Sentinel owner id for notes created without a signed-in viewer.
pub const LOCAL_USER_ID: &str = "local";

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// A note document.
///
/// `shared_with_uids` is a denormalized index over `shared_with` used for
/// backend-side query filtering: it always holds exactly the uids of the
/// non-pending entries. `is_owner` is never persisted; it is recomputed
/// relative to whichever viewer is looking at the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub todos: Vec<Todo>,
    #[serde(default, skip_serializing_if = "TextOptions::is_empty")]
    pub text_options: TextOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub shared_with: Vec<SharedUser>,
    #[serde(default)]
    pub shared_with_uids: Vec<String>,
    #[serde(skip)]
    pub is_owner: bool,
}

impl Note {
    /// Creates a note owned by `user_id`, stamped with a single `now` so that
    /// `created_at == updated_at`.
    pub fn new(title: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
            todos: Vec::new(),
            text_options: TextOptions::default(),
            created_at: now,
            updated_at: now,
            user_id: user_id.into(),
            shared_with: Vec::new(),
            shared_with_uids: Vec::new(),
            is_owner: true,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_todos(mut self, todos: Vec<Todo>) -> Self {
        self.todos = todos;
        self
    }

    pub fn with_text_options(mut self, text_options: TextOptions) -> Self {
        self.text_options = text_options;
        self
    }

    /// Whether the note has anything worth keeping: non-empty content or at
    /// least one todo. The editor enforces this before persisting; the stores
    /// themselves do not re-validate (caller contract).
    pub fn has_body(&self) -> bool {
        !self.content.is_empty() || !self.todos.is_empty()
    }

    /// The `shared_with_uids` derivation: uids of all non-pending entries.
    pub fn resolved_share_uids(shared_with: &[SharedUser]) -> Vec<String> {
        shared_with
            .iter()
            .filter(|u| !u.is_pending())
            .map(|u| u.uid.clone())
            .collect()
    }

    pub fn is_owned_by(&self, viewer_id: &str) -> bool {
        self.user_id == viewer_id
    }

    /// The role a non-owner viewer holds on this note, if any.
    pub fn role_of(&self, viewer_id: &str) -> Option<SharedRole> {
        self.shared_with
            .iter()
            .find(|u| u.uid == viewer_id)
            .map(|u| u.role)
    }

    /// Advisory check used by UI gating: the owner or a shared editor may
    /// mutate title/content/todos/text options. Only the owner may reshare.
    pub fn can_edit(&self, viewer_id: &str) -> bool {
        self.is_owned_by(viewer_id)
            || self
                .role_of(viewer_id)
                .map(|role| role.can_edit())
                .unwrap_or(false)
    }

    /// Validates a title for `add`/`update`: non-empty and at most
    /// [`MAX_TITLE_LEN`] characters.
    pub fn validate_title(title: &str) -> Result<(), NoteError> {
        if title.trim().is_empty() {
            return Err(NoteError::Validation("a note needs a title".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(NoteError::Validation(format!(
                "title is limited to {} characters",
                MAX_TITLE_LEN
            )));
        }
        Ok(())
    }
}

/// The payload of an "add" intent: the fields a user supplies for a new note.
///
/// Ids, timestamps, ownership and sharing fields are stamped by the store the
/// draft is submitted to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub todos: Vec<Todo>,
    #[serde(default, skip_serializing_if = "TextOptions::is_empty")]
    pub text_options: TextOptions,
}

impl NewNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_todos(mut self, todos: Vec<Todo>) -> Self {
        self.todos = todos;
        self
    }

    pub fn with_text_options(mut self, text_options: TextOptions) -> Self {
        self.text_options = text_options;
        self
    }

    /// Materializes the draft into a full note owned by `user_id`.
    pub fn into_note(self, user_id: impl Into<String>) -> Note {
        Note::new(self.title, user_id)
            .with_content(self.content)
            .with_tags(self.tags)
            .with_todos(self.todos)
            .with_text_options(self.text_options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_timestamps_match() {
        let note = Note::new("Groceries", LOCAL_USER_ID);
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.is_owner);
        assert_eq!(note.user_id, LOCAL_USER_ID);
        assert!(note.shared_with.is_empty());
        assert!(note.shared_with_uids.is_empty());
    }

    #[test]
    fn test_has_body() {
        let empty = Note::new("Empty", LOCAL_USER_ID);
        assert!(!empty.has_body());

        let with_content = Note::new("A", LOCAL_USER_ID).with_content("text");
        assert!(with_content.has_body());

        let with_todo = Note::new("B", LOCAL_USER_ID).with_todos(vec![Todo::new("Milk")]);
        assert!(with_todo.has_body());
    }

    #[test]
    fn test_resolved_share_uids_excludes_pending() {
        let shared = vec![
            SharedUser::new("uid-a", "a@example.com", SharedRole::Editor),
            SharedUser::pending("b@example.com"),
            SharedUser::new("uid-c", "c@example.com", SharedRole::Viewer),
        ];
        let uids = Note::resolved_share_uids(&shared);
        assert_eq!(uids, vec!["uid-a".to_string(), "uid-c".to_string()]);
    }

    #[test]
    fn test_can_edit_roles() {
        let mut note = Note::new("Shared", "owner-1");
        note.shared_with = vec![
            SharedUser::new("editor-1", "e@example.com", SharedRole::Editor),
            SharedUser::new("viewer-1", "v@example.com", SharedRole::Viewer),
        ];

        assert!(note.can_edit("owner-1"));
        assert!(note.can_edit("editor-1"));
        assert!(!note.can_edit("viewer-1"));
        assert!(!note.can_edit("stranger"));
        assert_eq!(note.role_of("viewer-1"), Some(SharedRole::Viewer));
        assert_eq!(note.role_of("owner-1"), None);
    }

    #[test]
    fn test_validate_title() {
        assert!(Note::validate_title("Groceries").is_ok());
        assert!(Note::validate_title("").is_err());
        assert!(Note::validate_title("   ").is_err());
        assert!(Note::validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(Note::validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_is_owner_never_serialized() {
        let note = Note::new("Mine", "user-1");
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("isOwner"));

        let parsed: Note = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_owner);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let note = Note::new("Wire", "user-1");
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"sharedWithUids\""));
    }

    #[test]
    fn test_draft_into_note() {
        let note = NewNote::new("Draft")
            .with_content("body")
            .with_tags(vec!["work".to_string()])
            .into_note("user-9");

        assert_eq!(note.title, "Draft");
        assert_eq!(note.content, "body");
        assert_eq!(note.tags, vec!["work".to_string()]);
        assert_eq!(note.user_id, "user-9");
        assert_eq!(note.created_at, note.updated_at);
    }
}
