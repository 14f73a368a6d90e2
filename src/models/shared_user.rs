use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NoteError;

/// Placeholder uid prefix for invitees without a resolved account.
pub const PENDING_UID_PREFIX: &str = "pending-";

/// Role granted to a user a note is shared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedRole {
    Editor,
    Viewer,
}

impl SharedRole {
    /// Whether this role may mutate the note's content fields.
    pub fn can_edit(&self) -> bool {
        matches!(self, SharedRole::Editor)
    }
}

impl fmt::Display for SharedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedRole::Editor => write!(f, "editor"),
            SharedRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for SharedRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "editor" => Ok(SharedRole::Editor),
            "viewer" => Ok(SharedRole::Viewer),
            _ => Err(format!(
                "Invalid role '{}'. Valid options: editor, viewer",
                s
            )),
        }
    }
}

/// An entry in a note's access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedUser {
    /// Resolved user id, or a `pending-<token>` placeholder when the invitee
    /// has no account yet.
    pub uid: String,
    pub email: String,
    pub role: SharedRole,
}

impl SharedUser {
    pub fn new(uid: impl Into<String>, email: impl Into<String>, role: SharedRole) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            role,
        }
    }

    /// Creates a pending entry for an invitee without an account.
    ///
    /// New shares start as viewers; the owner can promote them later.
    pub fn pending(email: impl Into<String>) -> Self {
        Self {
            uid: format!(
                "{}{}",
                PENDING_UID_PREFIX,
                chrono::Utc::now().timestamp_millis()
            ),
            email: email.into(),
            role: SharedRole::Viewer,
        }
    }

    /// Whether this entry is an unresolved invitation.
    pub fn is_pending(&self) -> bool {
        self.uid.starts_with(PENDING_UID_PREFIX)
    }
}

/// Checks that an email has the rough `name@host.tld` shape used when
/// inviting someone to a note. Not a full RFC 5322 validation.
pub fn validate_share_email(email: &str) -> Result<(), NoteError> {
    let valid = !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && matches!(domain.rsplit_once('.'), Some((host, tld)) if !host.is_empty() && !tld.is_empty())
            }
            None => false,
        };

    if valid {
        Ok(())
    } else {
        Err(NoteError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )))
    }
}
