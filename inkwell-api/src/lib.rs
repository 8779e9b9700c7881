use chrono::Utc;

mod comment;
pub use comment::{Comment, CommentId, CommentTarget, LikeReceipt, NewComment};

mod content;
pub use content::{NovelId, NovelStatus, NovelSummary, Page, PageRequest, PostId, PostSummary};

mod error;
pub use error::Error;

mod user;
pub use user::{AuthToken, Role, User, UserId, UserSummary};

pub type Time = chrono::DateTime<Utc>;

pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}
