//! The identity collaborator boundary.
//!
//! Authentication provider wiring lives outside this crate; the core only
//! needs to know who is looking. Sign-in and sign-out are fire-and-forget
//! side effects observed via identity-change notification, never through a
//! return value.

use serde::{Deserialize, Serialize};

use crate::models::LOCAL_USER_ID;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// External identity provider contract.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserProfile>;
    fn sign_in(&self);
    fn sign_out(&self);
}

/// The identity a controller session runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Anonymous use; persistence confined to the device.
    Local,
    /// Signed-in use; persistence and sharing mediated by the cloud store.
    SignedIn(UserProfile),
}

impl Viewer {
    pub fn from_user(user: Option<UserProfile>) -> Self {
        match user {
            Some(profile) => Viewer::SignedIn(profile),
            None => Viewer::Local,
        }
    }

    pub fn viewer_id(&self) -> &str {
        match self {
            Viewer::Local => LOCAL_USER_ID,
            Viewer::SignedIn(profile) => &profile.id,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Viewer::SignedIn(_))
    }
}
