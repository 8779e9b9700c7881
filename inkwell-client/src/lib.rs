mod api_client;
pub use api_client::{ApiClient, ClientConfig};

mod backend;
pub use backend::CommentBackend;

mod comment;
pub use comment::CommentTreeExt;

mod dashboard;
pub use dashboard::DashboardStats;

mod error;
pub use error::Error;

mod flatten;
pub use flatten::{flatten_replies, flatten_thread, FlatReply, ThreadEntry};

mod interaction;
pub use interaction::{ActionKind, InteractionState};

mod session;
pub use session::{CommentSession, Notice, Outcome, Rejection, GENERIC_FAILURE};

mod token;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

pub mod api {
    pub use inkwell_api::*;
}
