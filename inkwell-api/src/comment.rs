use std::fmt;

use crate::{Error, NovelId, PostId, Time, UserSummary};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub author: UserSummary,
    pub content: String,
    pub created_at: Time,
    pub likes: u64,

    /// Comment this one answers, `None` for top-level comments
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    /// Direct replies, in the order the server sent them
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Number of comments in this comment's reply subtree, excluding itself
    pub fn reply_count(&self) -> usize {
        self.replies.iter().map(|r| 1 + r.reply_count()).sum()
    }
}

/// Body of a comment creation request
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn new(content: String, parent_id: Option<CommentId>) -> NewComment {
        NewComment { content, parent_id }
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.content)?;
        if self.content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        Ok(())
    }
}

/// Server answer to a like request
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeReceipt {
    pub id: CommentId,
    pub likes: u64,
}

/// Resource a comment thread hangs off
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CommentTarget {
    Post(PostId),
    Novel(NovelId),
}

impl CommentTarget {
    /// Path of the comment collection, relative to the api root
    pub fn path(&self) -> String {
        match self {
            CommentTarget::Post(id) => format!("posts/{}/comments", id.0),
            CommentTarget::Novel(id) => format!("novels/{}/comments", id.0),
        }
    }
}

impl fmt::Display for CommentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentTarget::Post(id) => write!(f, "post {}", id.0),
            CommentTarget::Novel(id) => write!(f, "novel {}", id.0),
        }
    }
}
