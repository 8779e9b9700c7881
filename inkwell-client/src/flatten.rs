use crate::api::{Comment, UserSummary};

/// One line of a flattened reply list
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlatReply<'a> {
    pub reply: &'a Comment,

    /// false for direct replies to the root comment
    pub is_nested: bool,

    /// Author of the comment `reply` answers
    pub parent_user: &'a UserSummary,
}

/// Flattens the whole reply subtree of `root` into a single timeline.
///
/// Replies are ordered by creation date regardless of which comment they answer.
/// Replies sharing a timestamp keep their depth-first encounter order.
pub fn flatten_replies(root: &Comment) -> Vec<FlatReply<'_>> {
    let mut res = Vec::with_capacity(root.reply_count());
    collect_replies(root, false, &mut res);
    res.sort_by_key(|r| r.reply.created_at);
    res
}

fn collect_replies<'a>(parent: &'a Comment, nested: bool, res: &mut Vec<FlatReply<'a>>) {
    for reply in parent.replies.iter() {
        res.push(FlatReply {
            reply,
            is_nested: nested,
            parent_user: &parent.author,
        });
        collect_replies(reply, true, res);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThreadEntry<'a> {
    Comment(&'a Comment),
    Reply(FlatReply<'a>),
}

impl<'a> ThreadEntry<'a> {
    pub fn comment(&self) -> &'a Comment {
        match self {
            ThreadEntry::Comment(c) => c,
            ThreadEntry::Reply(r) => r.reply,
        }
    }
}

/// Each top-level comment, in server order, followed by its flattened replies
pub fn flatten_thread(comments: &[Comment]) -> Vec<ThreadEntry<'_>> {
    comments
        .iter()
        .flat_map(|c| {
            std::iter::once(ThreadEntry::Comment(c))
                .chain(flatten_replies(c).into_iter().map(ThreadEntry::Reply))
        })
        .collect()
}
