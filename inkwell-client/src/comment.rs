use crate::api::{Comment, CommentId};

/// Lookups and in-place patches over a fetched comment tree
pub trait CommentTreeExt {
    fn find_comment(&self, id: CommentId) -> Option<&Comment>;

    fn find_comment_mut(&mut self, id: CommentId) -> Option<&mut Comment>;

    /// Removes the comment along with its whole reply subtree
    fn remove_comment(&mut self, id: CommentId) -> Option<Comment>;

    /// Inserts under `comment.parent_id`, or at top level if that parent is not here
    fn insert_comment(&mut self, comment: Comment);

    fn total_comments(&self) -> usize;
}

impl CommentTreeExt for Vec<Comment> {
    fn find_comment(&self, id: CommentId) -> Option<&Comment> {
        for c in self.iter() {
            if c.id == id {
                return Some(c);
            }
            if let Some(res) = c.replies.find_comment(id) {
                return Some(res);
            }
        }
        None
    }

    fn find_comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        for c in self.iter_mut() {
            if c.id == id {
                return Some(c);
            }
            if let Some(res) = c.replies.find_comment_mut(id) {
                return Some(res);
            }
        }
        None
    }

    fn remove_comment(&mut self, id: CommentId) -> Option<Comment> {
        if let Some(pos) = self.iter().position(|c| c.id == id) {
            return Some(self.remove(pos));
        }
        self.iter_mut()
            .find_map(|c| c.replies.remove_comment(id))
    }

    fn insert_comment(&mut self, comment: Comment) {
        if let Some(parent_id) = comment.parent_id {
            if let Some(parent) = self.find_comment_mut(parent_id) {
                parent.replies.push(comment);
                return;
            }
            tracing::warn!(
                comment = %comment.id,
                parent = %parent_id,
                "parent of new comment is not in the thread, adding it at top level"
            );
        }
        self.push(comment);
    }

    fn total_comments(&self) -> usize {
        self.iter().map(|c| 1 + c.reply_count()).sum()
    }
}
