use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::{Comment, CommentId, CommentTarget, LikeReceipt, NewComment},
    Error,
};

/// Remote operations a comment session relies on
#[async_trait]
pub trait CommentBackend: Send + Sync {
    async fn fetch_comments(&self, target: CommentTarget) -> Result<Vec<Comment>, Error>;

    async fn like_comment(&self, id: CommentId) -> Result<LikeReceipt, Error>;

    async fn delete_comment(&self, id: CommentId) -> Result<(), Error>;

    async fn submit_comment(
        &self,
        target: CommentTarget,
        comment: &NewComment,
    ) -> Result<Comment, Error>;
}

#[async_trait]
impl<B: CommentBackend + ?Sized> CommentBackend for Arc<B> {
    async fn fetch_comments(&self, target: CommentTarget) -> Result<Vec<Comment>, Error> {
        (**self).fetch_comments(target).await
    }

    async fn like_comment(&self, id: CommentId) -> Result<LikeReceipt, Error> {
        (**self).like_comment(id).await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
        (**self).delete_comment(id).await
    }

    async fn submit_comment(
        &self,
        target: CommentTarget,
        comment: &NewComment,
    ) -> Result<Comment, Error> {
        (**self).submit_comment(target, comment).await
    }
}
