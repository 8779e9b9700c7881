use std::collections::{HashMap, HashSet};

use crate::api::CommentId;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActionKind {
    Like,
    Delete,
}

/// Per-session interaction bookkeeping for one comment thread.
///
/// A comment is either idle or has exactly one action in flight.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InteractionState {
    in_flight: HashMap<CommentId, ActionKind>,
    liked: HashSet<CommentId>,
    composing_reply_to: Option<CommentId>,
}

impl InteractionState {
    pub fn new() -> InteractionState {
        InteractionState::default()
    }

    /// Moves `id` out of idle. Returns false, changing nothing, if it was not idle.
    pub fn begin(&mut self, id: CommentId, kind: ActionKind) -> bool {
        if self.in_flight.contains_key(&id) {
            return false;
        }
        self.in_flight.insert(id, kind);
        true
    }

    /// Moves `id` back to idle, if `kind` is what it was doing
    pub fn finish(&mut self, id: CommentId, kind: ActionKind) {
        if self.in_flight.get(&id) == Some(&kind) {
            self.in_flight.remove(&id);
        }
    }

    pub fn in_flight(&self, id: CommentId) -> Option<ActionKind> {
        self.in_flight.get(&id).copied()
    }

    pub fn num_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_liked(&self, id: CommentId) -> bool {
        self.liked.contains(&id)
    }

    pub fn mark_liked(&mut self, id: CommentId) -> bool {
        self.liked.insert(id)
    }

    pub fn unmark_liked(&mut self, id: CommentId) -> bool {
        self.liked.remove(&id)
    }

    pub fn composing_reply_to(&self) -> Option<CommentId> {
        self.composing_reply_to
    }

    pub fn start_reply(&mut self, id: CommentId) {
        self.composing_reply_to = Some(id);
    }

    pub fn cancel_reply(&mut self) {
        self.composing_reply_to = None;
    }

    /// Forget everything tied to the previous snapshot of the thread.
    ///
    /// In-flight markers survive: their requests are still outstanding and will
    /// clear them on completion.
    pub fn reset(&mut self) {
        self.liked.clear();
        self.composing_reply_to = None;
    }
}
