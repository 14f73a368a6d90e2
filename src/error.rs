//! Error taxonomy for the notes state layer.

use thiserror::Error;

/// Errors that can occur in the notes sync and sharing layer.
///
/// Backend write failures are never retried automatically; they propagate to
/// the caller so a UI can present an actionable message.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Bad input shape or content (empty title, invalid share email, ...).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Backend read/write failure.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Import boundary failure (not JSON, not an array, malformed record).
    #[error("import failed: {0}")]
    Import(String),

    /// Export boundary failure (nothing to export, serialization failure).
    #[error("export failed: {0}")]
    Export(String),

    /// Attempted mutation by a viewer without the required role.
    ///
    /// Role checks are advisory and enforced by UI gating; the stores do not
    /// re-verify roles on every call.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Operation needs a remote identity namespace and a signed-in viewer.
    #[error("{0} requires a signed-in account")]
    CloudOnly(&'static str),
}
