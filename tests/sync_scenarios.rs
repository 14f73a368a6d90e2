//! Cross-component scenarios: controllers for different viewers sharing one
//! cloud collection, and import/export round trips through the controller.

use std::time::Duration;

use simple_notes_core::{
    CloudCollection, LocalStore, NewNote, Note, SharedRole, SharedUser, SyncController, SyncState,
    Todo,
};
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::time::timeout;

async fn wait_for_notes<F>(rx: &mut watch::Receiver<Vec<Note>>, pred: F) -> Vec<Note>
where
    F: Fn(&[Note]) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            if pred(&rx.borrow()) {
                return rx.borrow().clone();
            }
            rx.changed().await.expect("controller dropped");
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

fn local_controller() -> (SyncController, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(
        temp_dir
            .path()
            .join(simple_notes_core::store::STORAGE_FILE_NAME),
    );
    (SyncController::local(store), temp_dir)
}

#[tokio::test]
async fn cloud_add_is_confirmed_by_the_change_stream() {
    let collection = CloudCollection::new();
    let controller = SyncController::cloud("viewer-a", collection);
    controller.init().await.unwrap();
    assert_eq!(controller.state(), SyncState::Ready);
    assert!(controller.notes().is_empty());

    let mut rx = controller.watch_notes();
    let id = controller
        .add(NewNote::new("Cloud note").with_content("body"))
        .await
        .unwrap();

    // No optimistic insert: the visible list updates once the subscription
    // re-delivers the confirmed record.
    let notes = wait_for_notes(&mut rx, |notes| notes.len() == 1).await;
    assert_eq!(notes[0].id, id);
    assert_eq!(notes[0].user_id, "viewer-a");
    assert!(notes[0].is_owner);
    assert_eq!(notes[0].created_at, notes[0].updated_at);
}

#[tokio::test]
async fn sharing_with_unregistered_email_stays_pending() {
    let collection = CloudCollection::new();
    let controller = SyncController::cloud("viewer-a", collection);
    controller.init().await.unwrap();

    let mut rx = controller.watch_notes();
    let id = controller
        .add(NewNote::new("Invite").with_content("body"))
        .await
        .unwrap();
    wait_for_notes(&mut rx, |notes| notes.len() == 1).await;

    // Viewer B has no account yet, so the entry is a pending placeholder.
    let shared = vec![SharedUser::pending("b@example.com")];
    controller.update_sharing(&id, shared).await.unwrap();

    let notes = wait_for_notes(&mut rx, |notes| !notes[0].shared_with.is_empty()).await;
    assert!(notes[0].shared_with[0].uid.starts_with("pending-"));
    assert!(notes[0].shared_with_uids.is_empty());
}

#[tokio::test]
async fn editor_toggle_reaches_the_owner() {
    let collection = CloudCollection::new();
    let owner = SyncController::cloud("viewer-a", collection.clone());
    owner.init().await.unwrap();

    let mut owner_rx = owner.watch_notes();
    let id = owner
        .add(NewNote::new("Groceries").with_todos(vec![Todo::new("Milk")]))
        .await
        .unwrap();
    wait_for_notes(&mut owner_rx, |notes| notes.len() == 1).await;

    owner
        .update_sharing(
            &id,
            vec![SharedUser::new(
                "viewer-b",
                "b@example.com",
                SharedRole::Editor,
            )],
        )
        .await
        .unwrap();
    wait_for_notes(&mut owner_rx, |notes| !notes[0].shared_with_uids.is_empty()).await;

    // Viewer B subscribes and sees the shared note, not as owner.
    let editor = SyncController::cloud("viewer-b", collection);
    editor.init().await.unwrap();
    let notes = editor.notes();
    assert_eq!(notes.len(), 1);
    assert!(!notes[0].is_owner);
    assert!(notes[0].can_edit("viewer-b"));

    // B toggles the todo; A's subscription receives the full updated note.
    let mut note = notes.into_iter().next().unwrap();
    note.todos[0].toggle();
    editor.update(note).await.unwrap();

    let updated = wait_for_notes(&mut owner_rx, |notes| notes[0].todos[0].completed).await;
    assert!(updated[0].is_owner);
    assert_eq!(updated[0].todos[0].text, "Milk");
}

#[tokio::test]
async fn cloud_delete_removes_for_every_subscriber() {
    let collection = CloudCollection::new();
    let owner = SyncController::cloud("viewer-a", collection.clone());
    owner.init().await.unwrap();

    let mut rx = owner.watch_notes();
    let id = owner
        .add(NewNote::new("Doomed").with_content("x"))
        .await
        .unwrap();
    wait_for_notes(&mut rx, |notes| notes.len() == 1).await;

    owner.delete(&id).await.unwrap();
    wait_for_notes(&mut rx, |notes| notes.is_empty()).await;

    // Deleting again is not an error.
    owner.delete(&id).await.unwrap();
}

#[tokio::test]
async fn cloud_import_is_one_atomic_batch() {
    let collection = CloudCollection::new();
    let controller = SyncController::cloud("viewer-a", collection);
    controller.init().await.unwrap();

    let mut rx = controller.watch_notes();
    let raw = r#"[
        {"title": "One", "content": "1"},
        {"content": "no title"},
        {"title": "Three", "todos": [{"id": "t1", "text": "step", "completed": false}]}
    ]"#;
    let count = controller.import_notes(raw).await.unwrap();
    assert_eq!(count, 3);

    let notes = wait_for_notes(&mut rx, |notes| notes.len() == 3).await;
    assert!(notes.iter().any(|n| n.title == "Untitled"));
    assert!(notes.iter().all(|n| n.user_id == "viewer-a"));
    assert!(notes.iter().all(|n| n.shared_with.is_empty()));
}

#[tokio::test]
async fn export_import_round_trip_preserves_user_fields() {
    let (source, _temp_a) = local_controller();
    source.init().await.unwrap();

    source
        .add(
            NewNote::new("Groceries")
                .with_tags(vec!["errands".to_string()])
                .with_todos(vec![Todo::new("Milk")]),
        )
        .await
        .unwrap();
    source
        .add(NewNote::new("Journal").with_content("dear diary"))
        .await
        .unwrap();

    let exported = source.export_notes().unwrap();

    let (target, _temp_b) = local_controller();
    target.init().await.unwrap();
    assert_eq!(target.import_notes(&exported).await.unwrap(), 2);

    let mut titles: Vec<String> = target.notes().iter().map(|n| n.title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Groceries".to_string(), "Journal".to_string()]);

    let groceries = target
        .notes()
        .into_iter()
        .find(|n| n.title == "Groceries")
        .unwrap();
    assert_eq!(groceries.tags, vec!["errands".to_string()]);
    assert_eq!(groceries.todos[0].text, "Milk");
    // Ownership and sharing are reset on import.
    assert!(groceries.is_owner);
    assert!(groceries.shared_with.is_empty());
}

#[tokio::test]
async fn collection_is_sorted_newest_first() {
    let collection = CloudCollection::new();
    let controller = SyncController::cloud("viewer-a", collection);
    controller.init().await.unwrap();

    let mut rx = controller.watch_notes();
    controller
        .add(NewNote::new("Older").with_content("1"))
        .await
        .unwrap();
    wait_for_notes(&mut rx, |notes| notes.len() == 1).await;
    controller
        .add(NewNote::new("Newer").with_content("2"))
        .await
        .unwrap();
    let notes = wait_for_notes(&mut rx, |notes| notes.len() == 2).await;

    assert!(notes[0].updated_at >= notes[1].updated_at);
}

#[tokio::test]
async fn dropping_the_controller_disposes_the_subscription() {
    let collection = CloudCollection::new();
    {
        let controller = SyncController::cloud("viewer-a", collection.clone());
        controller.init().await.unwrap();
        controller
            .add(NewNote::new("Kept").with_content("x"))
            .await
            .unwrap();
    }

    // The torn-down controller's subscription must not keep the collection
    // from accepting further writes.
    let survivor = SyncController::cloud("viewer-a", collection);
    survivor.init().await.unwrap();
    assert_eq!(survivor.notes().len(), 1);
    survivor
        .add(NewNote::new("More").with_content("y"))
        .await
        .unwrap();
}
