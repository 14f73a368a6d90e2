//! The sync layer: one reactive notes collection per viewer session.
//!
//! A [`SyncController`] presents the collection of notes visible to the
//! current viewer and routes every intent (add/update/delete/share/
//! import/export) to the active backend:
//!
//! - **local mode** (no viewer identity): mutations are applied to the
//!   in-memory collection first and persisted synchronously to the local
//!   slot, so the UI updates without a round trip.
//! - **cloud mode** (signed-in viewer): mutations are submitted to the
//!   shared cloud collection and the live subscription re-delivers the full
//!   confirmed matching set; each delivery atomically replaces the snapshot.
//!
//! Notifications are accepted in arrival order and the latest-delivered
//! snapshot is always treated as current.

mod controller;

pub use controller::{SyncController, SyncState};
