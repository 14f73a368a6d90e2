use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::error::NoteError;
use crate::identity::Viewer;
use crate::models::{NewNote, Note, SharedUser, LOCAL_USER_ID};
use crate::store::remote::{NotePatch, NoteStream, RemoteEvent};
use crate::store::{CloudCollection, LocalStore, RemoteStore};
use crate::transfer;

/// Lifecycle of a controller instance.
///
/// `Ready` is re-entered after every successful mutation or remote change
/// delivery. A stream error does not move the controller out of `Ready`; the
/// last-known snapshot stays current and the error surfaces on the side
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Loading,
    Ready,
}

enum Backend {
    Local(LocalStore),
    Cloud(RemoteStore),
}

/// One reactive "collection of notes visible to the current viewer", sorted
/// by `updated_at` descending, backed by either [`LocalStore`] or
/// [`RemoteStore`] depending on whether a viewer identity is present.
///
/// The mode is fixed for the lifetime of the instance; switching viewers
/// means dropping this controller (which disposes its subscription) and
/// constructing a new one. Exactly one controller should subscribe per
/// viewer session.
pub struct SyncController {
    backend: Backend,
    viewer_id: String,
    state_tx: Arc<watch::Sender<SyncState>>,
    notes_tx: Arc<watch::Sender<Vec<Note>>>,
    errors_tx: mpsc::UnboundedSender<NoteError>,
    errors_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<NoteError>>>,
    // Serializes local-mode mutations so the load/mutate/save sequence of one
    // call never interleaves with another.
    op_lock: AsyncMutex<()>,
    pump: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SyncController {
    /// A controller for the anonymous/offline viewer, persisting locally.
    pub fn local(store: LocalStore) -> Self {
        Self::build(Backend::Local(store), LOCAL_USER_ID.to_string())
    }

    /// A controller for a signed-in viewer, persisting to the shared cloud
    /// collection.
    pub fn cloud(viewer_id: impl Into<String>, collection: CloudCollection) -> Self {
        let viewer_id = viewer_id.into();
        let remote = RemoteStore::new(collection, viewer_id.clone());
        Self::build(Backend::Cloud(remote), viewer_id)
    }

    /// Picks the mode from the viewer identity: local without one, cloud with.
    pub fn for_viewer(viewer: &Viewer, store: LocalStore, collection: CloudCollection) -> Self {
        match viewer {
            Viewer::Local => Self::local(store),
            Viewer::SignedIn(profile) => Self::cloud(profile.id.clone(), collection),
        }
    }

    fn build(backend: Backend, viewer_id: String) -> Self {
        let (state_tx, _) = watch::channel(SyncState::Uninitialized);
        let (notes_tx, _) = watch::channel(Vec::new());
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            viewer_id,
            state_tx: Arc::new(state_tx),
            notes_tx: Arc::new(notes_tx),
            errors_tx,
            errors_rx: std::sync::Mutex::new(Some(errors_rx)),
            op_lock: AsyncMutex::new(()),
            pump: std::sync::Mutex::new(None),
        }
    }

    /// Loads the initial collection and, in cloud mode, starts the live
    /// subscription pump. Idempotent; later calls are no-ops.
    pub async fn init(&self) -> Result<(), NoteError> {
        if *self.state_tx.borrow() != SyncState::Uninitialized {
            return Ok(());
        }
        self.state_tx.send_replace(SyncState::Loading);

        match &self.backend {
            Backend::Local(store) => {
                let mut notes = store.load();
                sort_notes(&mut notes);
                self.notes_tx.send_replace(notes);
            }
            Backend::Cloud(remote) => {
                let mut stream = remote.subscribe();
                match stream.next().await {
                    Some(RemoteEvent::Snapshot(mut notes)) => {
                        sort_notes(&mut notes);
                        self.notes_tx.send_replace(notes);
                    }
                    Some(RemoteEvent::Error(msg)) => {
                        tracing::warn!(error = %msg, "initial cloud snapshot failed, starting empty");
                        let _ = self.errors_tx.send(NoteError::Persistence(msg));
                    }
                    None => {
                        let _ = self.errors_tx.send(NoteError::Persistence(
                            "change stream ended before the first snapshot".to_string(),
                        ));
                    }
                }

                let handle = tokio::spawn(pump(
                    stream,
                    Arc::clone(&self.notes_tx),
                    self.errors_tx.clone(),
                ));
                if let Ok(mut pump_slot) = self.pump.lock() {
                    *pump_slot = Some(handle);
                }
            }
        }

        self.state_tx.send_replace(SyncState::Ready);
        Ok(())
    }

    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// The current snapshot, sorted by `updated_at` descending.
    pub fn notes(&self) -> Vec<Note> {
        self.notes_tx.borrow().clone()
    }

    /// A receiver of atomically replaced full snapshots.
    pub fn watch_notes(&self) -> watch::Receiver<Vec<Note>> {
        self.notes_tx.subscribe()
    }

    /// Takes the side channel carrying subscription and background errors.
    /// Returns `None` after the first call.
    pub fn take_errors(&self) -> Option<mpsc::UnboundedReceiver<NoteError>> {
        self.errors_rx.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Mutations before `init()` would persist a collection that was never
    /// loaded, overwriting the slot; fail them instead.
    fn ensure_ready(&self) -> Result<(), NoteError> {
        if *self.state_tx.borrow() != SyncState::Ready {
            return Err(NoteError::Validation(
                "controller is not initialized".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self.backend, Backend::Cloud(_))
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    /// Creates a note from an "add" intent; returns its id.
    ///
    /// Local mode inserts at the head of the collection immediately and
    /// persists synchronously. Cloud mode submits to the backend and lets the
    /// change stream deliver the confirmed record; there is no optimistic
    /// insert.
    pub async fn add(&self, draft: NewNote) -> Result<String, NoteError> {
        self.ensure_ready()?;
        Note::validate_title(&draft.title)?;

        match &self.backend {
            Backend::Local(store) => {
                let _guard = self.op_lock.lock().await;
                let note = draft.into_note(LOCAL_USER_ID);
                let id = note.id.clone();
                let mut notes = self.notes();
                notes.insert(0, note);
                store.save(&notes)?;
                self.notes_tx.send_replace(notes);
                tracing::info!(note = %id, "note created locally");
                Ok(id)
            }
            Backend::Cloud(remote) => {
                let id = remote.create(draft).await?;
                tracing::info!(note = %id, "note created in cloud");
                Ok(id)
            }
        }
    }

    /// Replaces a note's content fields; the note must already exist.
    ///
    /// Local mode refreshes `updated_at`, re-sorts, and persists the whole
    /// collection. Cloud mode patches the changed fields only and lets the
    /// server assign the update time.
    pub async fn update(&self, mut note: Note) -> Result<(), NoteError> {
        self.ensure_ready()?;
        Note::validate_title(&note.title)?;

        match &self.backend {
            Backend::Local(store) => {
                let _guard = self.op_lock.lock().await;
                let mut notes = self.notes();
                let slot = notes.iter_mut().find(|n| n.id == note.id).ok_or_else(|| {
                    NoteError::Validation(format!("note '{}' does not exist", note.id))
                })?;
                note.updated_at = Utc::now();
                note.is_owner = true;
                *slot = note;
                sort_notes(&mut notes);
                store.save(&notes)?;
                self.notes_tx.send_replace(notes);
                Ok(())
            }
            Backend::Cloud(remote) => {
                remote.patch(&note.id, NotePatch::content_fields(&note)).await
            }
        }
    }

    /// Replaces a note's access list. Cloud-mode only: sharing needs a remote
    /// identity namespace, so local mode fails with [`NoteError::CloudOnly`].
    ///
    /// The `shared_with_uids` index is recomputed here, excluding pending
    /// placeholders, so backends never see the two fields out of step.
    pub async fn update_sharing(
        &self,
        note_id: &str,
        shared_with: Vec<SharedUser>,
    ) -> Result<(), NoteError> {
        self.ensure_ready()?;
        match &self.backend {
            Backend::Local(_) => Err(NoteError::CloudOnly("sharing")),
            Backend::Cloud(remote) => {
                remote.patch(note_id, NotePatch::sharing(shared_with)).await?;
                tracing::info!(note = %note_id, "sharing updated");
                Ok(())
            }
        }
    }

    /// Removes a note. Idempotent: deleting an id that is already gone
    /// succeeds and leaves the collection unchanged.
    ///
    /// Local removal is memory-authoritative. A cloud-mode failure surfaces
    /// without reinserting the row; the UI may show stale state until the
    /// next snapshot.
    pub async fn delete(&self, note_id: &str) -> Result<(), NoteError> {
        self.ensure_ready()?;
        match &self.backend {
            Backend::Local(store) => {
                let _guard = self.op_lock.lock().await;
                let mut notes = self.notes();
                let len_before = notes.len();
                notes.retain(|n| n.id != note_id);
                if notes.len() != len_before {
                    store.save(&notes)?;
                    self.notes_tx.send_replace(notes);
                    tracing::info!(note = %note_id, "note deleted locally");
                }
                Ok(())
            }
            Backend::Cloud(remote) => {
                remote.remove(note_id).await?;
                tracing::info!(note = %note_id, "note deleted from cloud");
                Ok(())
            }
        }
    }

    /// Bulk-inserts externally supplied note records.
    ///
    /// The raw input must be a JSON array; anything else fails with
    /// [`NoteError::Import`] and leaves the existing collection untouched.
    /// Missing fields are defaulted and sharing fields are always reset.
    /// Cloud mode submits one atomic batch; local mode prepends. Returns the
    /// number of imported notes.
    pub async fn import_notes(&self, raw: &str) -> Result<usize, NoteError> {
        self.ensure_ready()?;
        let records = transfer::parse_import(raw)?;
        let count = records.len();

        match &self.backend {
            Backend::Local(store) => {
                let _guard = self.op_lock.lock().await;
                let mut notes: Vec<Note> = records
                    .into_iter()
                    .map(|r| r.into_draft().into_note(LOCAL_USER_ID))
                    .collect();
                notes.extend(self.notes());
                store.save(&notes)?;
                self.notes_tx.send_replace(notes);
            }
            Backend::Cloud(remote) => {
                let drafts = records.into_iter().map(|r| r.into_draft()).collect();
                remote.batch_create(drafts).await?;
            }
        }

        tracing::info!(count, "notes imported");
        Ok(count)
    }

    /// Serializes the visible collection for download, stripping viewer- and
    /// sharing-specific fields. Fails with [`NoteError::Export`] when there
    /// is nothing to export.
    pub fn export_notes(&self) -> Result<String, NoteError> {
        let notes = self.notes();
        if notes.is_empty() {
            return Err(NoteError::Export("there are no notes to export".to_string()));
        }
        transfer::serialize_export(&notes)
    }

    /// Disposes the live subscription. Also happens on drop.
    pub fn shutdown(&self) {
        if let Ok(mut pump_slot) = self.pump.lock() {
            if let Some(handle) = pump_slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards subscription events into the published snapshot.
///
/// Snapshots are accepted in arrival order and the latest one always wins;
/// there is no sequence-number reconciliation. Errors keep the last-known
/// snapshot current and surface on the side channel.
async fn pump(
    mut stream: NoteStream,
    notes_tx: Arc<watch::Sender<Vec<Note>>>,
    errors_tx: mpsc::UnboundedSender<NoteError>,
) {
    while let Some(event) = stream.next().await {
        match event {
            RemoteEvent::Snapshot(mut notes) => {
                sort_notes(&mut notes);
                notes_tx.send_replace(notes);
            }
            RemoteEvent::Error(msg) => {
                tracing::warn!(error = %msg, "change stream error");
                let _ = errors_tx.send(NoteError::Persistence(msg));
            }
        }
    }
}

fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
