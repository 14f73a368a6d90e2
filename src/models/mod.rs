mod note;
mod shared_user;
mod text_options;
mod todo;

pub use note::{NewNote, Note, LOCAL_USER_ID, MAX_TITLE_LEN};
pub use shared_user::{validate_share_email, SharedRole, SharedUser, PENDING_UID_PREFIX};
pub use text_options::{TextAlign, TextOptions};
pub use todo::Todo;
