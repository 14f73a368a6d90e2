//! The import/export boundary: parse and serialize a JSON array of note
//! records.
//!
//! Imported records may carry any subset of the user-editable fields; the
//! rest are defaulted on materialization and sharing is always reset.
//! Exported records are persistence-agnostic: viewer- and sharing-specific
//! fields (`userId`, `isOwner`, `sharedWith`, `sharedWithUids`) are stripped.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NoteError;
use crate::models::{NewNote, Note, TextOptions, Todo};

/// An externally supplied note-like record. Every field is optional; unknown
/// fields (ids, timestamps of a previous export) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedNote {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub todos: Option<Vec<Todo>>,
    #[serde(default)]
    pub text_options: Option<TextOptions>,
}

impl ImportedNote {
    /// Applies the defaulting rules: missing or empty title becomes
    /// "Untitled", everything else defaults to empty.
    pub fn into_draft(self) -> NewNote {
        let title = match self.title {
            Some(title) if !title.is_empty() => title,
            _ => "Untitled".to_string(),
        };
        NewNote {
            title,
            content: self.content.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            todos: self.todos.unwrap_or_default(),
            text_options: self.text_options.unwrap_or_default(),
        }
    }
}

/// A note record as written to an export file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedNote {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub todos: Vec<Todo>,
    #[serde(skip_serializing_if = "TextOptions::is_empty")]
    pub text_options: TextOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for ExportedNote {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            todos: note.todos.clone(),
            text_options: note.text_options.clone(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Parses raw import input. The input must be JSON and must be an array;
/// entries must be objects (any other shape fails).
pub fn parse_import(raw: &str) -> Result<Vec<ImportedNote>, NoteError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| NoteError::Import(format!("not valid JSON: {}", e)))?;
    if !value.is_array() {
        return Err(NoteError::Import(
            "expected a JSON array of note records".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| NoteError::Import(format!("malformed note record: {}", e)))
}

/// Serializes the collection for download, pretty-printed.
pub fn serialize_export(notes: &[Note]) -> Result<String, NoteError> {
    let exported: Vec<ExportedNote> = notes.iter().map(ExportedNote::from).collect();
    serde_json::to_string_pretty(&exported)
        .map_err(|e| NoteError::Export(format!("failed to serialize notes: {}", e)))
}

/// The suggested download name: `simple-notes-export-<ISO timestamp>.json`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "simple-notes-export-{}.json",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
