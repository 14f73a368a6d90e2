//! Adapter over a shared, multi-writer cloud document collection.
//!
//! [`CloudCollection`] is the injectable backend-client handle: it owns the
//! document set, assigns authoritative ids and timestamps, and fans out
//! change notifications to every subscriber. Per-document semantics are
//! last-write-wins; no conflict resolution or merge is attempted here.
//!
//! [`RemoteStore`] binds a collection handle to one viewer and exposes the
//! live query `user_id == viewer OR shared_with_uids contains viewer` as a
//! stream of full-replace snapshots.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use chrono::Utc;
use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::NoteError;
use crate::models::{NewNote, Note};

/// Capacity of the change-notification fan-out channel. A lagging subscriber
/// just re-snapshots, so losing individual notifications is harmless.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// An event delivered to a live subscription.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// The entire current matching set. Authoritative full-replace; callers
    /// sort it themselves.
    Snapshot(Vec<Note>),
    /// The change stream failed; the last-known snapshot stays current.
    Error(String),
}

/// Shared cloud document collection handle.
///
/// Cheap to clone; all clones observe the same documents. Construct one per
/// process/session and pass it into every [`RemoteStore`] that needs it.
#[derive(Clone)]
pub struct CloudCollection {
    documents: Arc<Mutex<HashMap<String, Note>>>,
    changes: broadcast::Sender<()>,
}

impl Default for CloudCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudCollection {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Note>> {
        // A poisoned lock only means a writer panicked mid-mutation; the map
        // itself is still usable.
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        // No receivers is fine - nobody is subscribed yet.
        let _ = self.changes.send(());
    }

    /// Inserts a new document, assigning the id and both timestamps.
    pub fn create(&self, draft: NewNote, user_id: &str) -> String {
        let mut note = draft.into_note(user_id);
        note.id = Uuid::new_v4().to_string();
        note.is_owner = false;
        let id = note.id.clone();
        self.lock().insert(id.clone(), note);
        self.notify();
        id
    }

    /// Applies a partial update to named fields only, stamping server time.
    pub fn patch(&self, id: &str, patch: NotePatch) -> Result<(), NoteError> {
        {
            let mut docs = self.lock();
            let note = docs
                .get_mut(id)
                .ok_or_else(|| NoteError::Persistence(format!("no document with id '{}'", id)))?;
            patch.apply(note);
            note.updated_at = Utc::now();
        }
        self.notify();
        Ok(())
    }

    /// Deletes a document. Removing an id that is already gone is not an
    /// error and produces no notification.
    pub fn remove(&self, id: &str) {
        let removed = self.lock().remove(id).is_some();
        if removed {
            self.notify();
        }
    }

    /// Atomic bulk insert: all documents land under one lock and one change
    /// notification.
    pub fn batch_create(&self, drafts: Vec<NewNote>, user_id: &str) -> Vec<String> {
        let mut ids = Vec::with_capacity(drafts.len());
        {
            let mut docs = self.lock();
            for draft in drafts {
                let mut note = draft.into_note(user_id);
                note.id = Uuid::new_v4().to_string();
                note.is_owner = false;
                ids.push(note.id.clone());
                docs.insert(note.id.clone(), note);
            }
        }
        self.notify();
        ids
    }

    /// The current set of documents visible to `viewer_id`, with `is_owner`
    /// recomputed for that viewer. Unsorted.
    pub fn matching(&self, viewer_id: &str) -> Vec<Note> {
        self.lock()
            .values()
            .filter(|note| {
                note.user_id == viewer_id || note.shared_with_uids.iter().any(|u| u == viewer_id)
            })
            .cloned()
            .map(|mut note| {
                note.is_owner = note.user_id == viewer_id;
                note
            })
            .collect()
    }

    fn watch_changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

/// Partial update of named document fields. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub todos: Option<Vec<crate::models::Todo>>,
    pub text_options: Option<crate::models::TextOptions>,
    pub shared_with: Option<Vec<crate::models::SharedUser>>,
    pub shared_with_uids: Option<Vec<String>>,
}

impl NotePatch {
    /// The patch an `update` intent sends: content fields only. Excludes id,
    /// ownership, `created_at`, and `updated_at` (the server stamps that).
    pub fn content_fields(note: &Note) -> Self {
        Self {
            title: Some(note.title.clone()),
            content: Some(note.content.clone()),
            tags: Some(note.tags.clone()),
            todos: Some(note.todos.clone()),
            text_options: Some(note.text_options.clone()),
            ..Default::default()
        }
    }

    /// The patch an `updateSharing` intent sends: the access list plus its
    /// derived uid index, with pending placeholders filtered out.
    pub fn sharing(shared_with: Vec<crate::models::SharedUser>) -> Self {
        let shared_with_uids = Note::resolved_share_uids(&shared_with);
        Self {
            shared_with: Some(shared_with),
            shared_with_uids: Some(shared_with_uids),
            ..Default::default()
        }
    }

    fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(tags) = self.tags {
            note.tags = tags;
        }
        if let Some(todos) = self.todos {
            note.todos = todos;
        }
        if let Some(text_options) = self.text_options {
            note.text_options = text_options;
        }
        if let Some(shared_with) = self.shared_with {
            note.shared_with = shared_with;
        }
        if let Some(shared_with_uids) = self.shared_with_uids {
            note.shared_with_uids = shared_with_uids;
        }
    }
}

/// Live subscription to a viewer's matching set.
///
/// Yields [`RemoteEvent`]s in arrival order; each snapshot fully replaces the
/// previous one. Dropping the stream (or calling [`NoteStream::unsubscribe`])
/// stops the feeder task, so disposal is guaranteed on every exit path.
pub struct NoteStream {
    rx: mpsc::UnboundedReceiver<RemoteEvent>,
    task: JoinHandle<()>,
}

impl NoteStream {
    /// Explicit disposer; equivalent to dropping the stream.
    pub fn unsubscribe(self) {}
}

impl Stream for NoteStream {
    type Item = RemoteEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for NoteStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-viewer adapter over a [`CloudCollection`].
pub struct RemoteStore {
    collection: CloudCollection,
    viewer_id: String,
}

impl RemoteStore {
    pub fn new(collection: CloudCollection, viewer_id: impl Into<String>) -> Self {
        Self {
            collection,
            viewer_id: viewer_id.into(),
        }
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    /// Starts the live query for this viewer.
    ///
    /// An initial snapshot is emitted immediately, then one snapshot per
    /// change to any matching document. Must be called from within a tokio
    /// runtime.
    pub fn subscribe(&self) -> NoteStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let collection = self.collection.clone();
        let viewer_id = self.viewer_id.clone();
        let mut changes = collection.watch_changes();

        let task = tokio::spawn(async move {
            if tx
                .send(RemoteEvent::Snapshot(collection.matching(&viewer_id)))
                .is_err()
            {
                return;
            }
            loop {
                match changes.recv().await {
                    Ok(()) => {
                        if tx
                            .send(RemoteEvent::Snapshot(collection.matching(&viewer_id)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed notifications collapse into one re-snapshot.
                        tracing::debug!(skipped, viewer = %viewer_id, "change stream lagged");
                        if tx
                            .send(RemoteEvent::Snapshot(collection.matching(&viewer_id)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let _ = tx.send(RemoteEvent::Error(
                            "change notification stream closed".to_string(),
                        ));
                        break;
                    }
                }
            }
        });

        NoteStream { rx, task }
    }

    /// Inserts a new document owned by this viewer; returns the server id.
    pub async fn create(&self, draft: NewNote) -> Result<String, NoteError> {
        Ok(self.collection.create(draft, &self.viewer_id))
    }

    /// Partial update of named fields; the server stamps the update time.
    pub async fn patch(&self, id: &str, patch: NotePatch) -> Result<(), NoteError> {
        self.collection.patch(id, patch)
    }

    /// Deletes a document. Idempotent.
    pub async fn remove(&self, id: &str) -> Result<(), NoteError> {
        self.collection.remove(id);
        Ok(())
    }

    /// Atomic bulk insert; all documents succeed together.
    pub async fn batch_create(&self, drafts: Vec<NewNote>) -> Result<Vec<String>, NoteError> {
        Ok(self.collection.batch_create(drafts, &self.viewer_id))
    }
}
