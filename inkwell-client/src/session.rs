use std::{collections::VecDeque, sync::Arc};

use chrono::Utc;
use parking_lot::Mutex;

use crate::{
    api::{self, Comment, CommentId, CommentTarget, NewComment, Time, User},
    ActionKind, CommentBackend, CommentTreeExt, Error, InteractionState,
};

pub const GENERIC_FAILURE: &str = "Something went wrong, please try again.";

/// Transient, dismissable message for the user
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub comment: Option<CommentId>,
    pub message: String,
    pub at: Time,
}

/// Why an action was refused before reaching the server
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
    NotLoggedIn,
    UnknownComment,
    PermissionDenied,
    EmptyContent,
    InvalidContent,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::NotLoggedIn => "You need to be logged in to do that.",
            Rejection::UnknownComment => "This comment is no longer available.",
            Rejection::PermissionDenied => "You are not allowed to delete this comment.",
            Rejection::EmptyContent => "Your comment cannot be empty.",
            Rejection::InvalidContent => "Your comment contains invalid characters.",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The server accepted the action and local state reflects it
    Completed,

    /// Another action on the same target is still in flight
    Skipped,

    Rejected(Rejection),

    /// The request failed. Optimistic changes are undone, unless the thread
    /// was refetched meanwhile, in which case the refetched data stands.
    Failed(Error),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

struct SessionState {
    /// Bumped each time the thread is refetched
    generation: u64,
    comments: Arc<Vec<Comment>>,
    interactions: InteractionState,
    submitting: bool,
    notices: VecDeque<Notice>,
}

impl SessionState {
    fn comments_mut(&mut self) -> &mut Vec<Comment> {
        Arc::make_mut(&mut self.comments)
    }

    fn notify(&mut self, comment: Option<CommentId>, message: &str) {
        self.notices.push_back(Notice {
            comment,
            message: String::from(message),
            at: Utc::now(),
        });
    }

    fn reject(&mut self, comment: Option<CommentId>, why: Rejection) -> Outcome {
        tracing::debug!(?comment, ?why, "refusing comment action");
        self.notify(comment, why.message());
        Outcome::Rejected(why)
    }

    fn fail(&mut self, comment: Option<CommentId>, action: &'static str, err: Error) -> Outcome {
        tracing::warn!(?comment, action, error = %err, "comment action failed");
        self.notify(comment, GENERIC_FAILURE);
        Outcome::Failed(err)
    }
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Action(CommentId, ActionKind),
    Submission,
}

/// Marks a slot busy until dropped, including when the request future is abandoned.
///
/// Must not be dropped while the session lock is held.
struct Pending<'a> {
    state: &'a Mutex<SessionState>,
    slot: Slot,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        match self.slot {
            Slot::Action(id, kind) => state.interactions.finish(id, kind),
            Slot::Submission => state.submitting = false,
        }
    }
}

type Rollback = Box<dyn FnOnce(&mut SessionState) + Send>;

/// A local change applied ahead of the server's answer
struct Optimistic {
    generation: u64,
    rollback: Rollback,
}

impl Optimistic {
    fn revert(self, state: &mut SessionState) {
        if state.generation == self.generation {
            (self.rollback)(state);
        } else {
            tracing::debug!("thread was refetched meanwhile, nothing to roll back");
        }
    }
}

/// View-model of one comment thread, as seen by `viewer`
pub struct CommentSession<B> {
    backend: B,
    target: CommentTarget,
    viewer: Option<User>,
    state: Mutex<SessionState>,
}

impl<B: CommentBackend> CommentSession<B> {
    /// Starts with an empty thread, call `refresh` to load it
    pub fn new(backend: B, target: CommentTarget, viewer: Option<User>) -> CommentSession<B> {
        CommentSession {
            backend,
            target,
            viewer,
            state: Mutex::new(SessionState {
                generation: 0,
                comments: Arc::new(Vec::new()),
                interactions: InteractionState::new(),
                submitting: false,
                notices: VecDeque::new(),
            }),
        }
    }

    pub fn target(&self) -> CommentTarget {
        self.target
    }

    pub fn viewer(&self) -> Option<&User> {
        self.viewer.as_ref()
    }

    /// Current snapshot of the thread, unaffected by later changes
    pub fn comments(&self) -> Arc<Vec<Comment>> {
        self.state.lock().comments.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn interactions(&self) -> InteractionState {
        self.state.lock().interactions.clone()
    }

    pub fn in_flight(&self, id: CommentId) -> Option<ActionKind> {
        self.state.lock().interactions.in_flight(id)
    }

    pub fn is_liked(&self, id: CommentId) -> bool {
        self.state.lock().interactions.is_liked(id)
    }

    /// Whether the delete affordance should be offered for `id`
    pub fn can_delete(&self, id: CommentId) -> bool {
        let state = self.state.lock();
        match (&self.viewer, state.comments.find_comment(id)) {
            (Some(viewer), Some(c)) => viewer.can_delete(c),
            _ => false,
        }
    }

    pub fn composing_reply_to(&self) -> Option<CommentId> {
        self.state.lock().interactions.composing_reply_to()
    }

    /// Returns false if `id` is not part of the thread
    pub fn start_reply(&self, id: CommentId) -> bool {
        let mut state = self.state.lock();
        if state.comments.find_comment(id).is_none() {
            return false;
        }
        state.interactions.start_reply(id);
        true
    }

    pub fn cancel_reply(&self) {
        self.state.lock().interactions.cancel_reply();
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.state.lock().notices.drain(..).collect()
    }

    fn pending(&self, slot: Slot) -> Pending<'_> {
        Pending {
            state: &self.state,
            slot,
        }
    }

    /// Replaces the local thread with the server's
    pub async fn refresh(&self) -> Outcome {
        let res = self.backend.fetch_comments(self.target).await;
        let mut state = self.state.lock();
        match res {
            Ok(comments) => {
                state.generation += 1;
                state.comments = Arc::new(comments);
                state.interactions.reset();
                tracing::debug!(
                    thread = %self.target,
                    generation = state.generation,
                    num_comments = state.comments.total_comments(),
                    "refreshed comment thread"
                );
                Outcome::Completed
            }
            Err(e) => state.fail(None, "refresh", e),
        }
    }

    pub async fn like(&self, id: CommentId) -> Outcome {
        let (pending, optimistic) = {
            let mut state = self.state.lock();
            if state.interactions.in_flight(id).is_some() || state.interactions.is_liked(id) {
                return Outcome::Skipped;
            }
            if self.viewer.is_none() {
                return state.reject(Some(id), Rejection::NotLoggedIn);
            }
            let previous_likes = match state.comments.find_comment(id).map(|c| c.likes) {
                Some(likes) => likes,
                None => return state.reject(Some(id), Rejection::UnknownComment),
            };

            state.interactions.begin(id, ActionKind::Like);
            state.interactions.mark_liked(id);
            if let Some(c) = state.comments_mut().find_comment_mut(id) {
                c.likes += 1;
            }
            let optimistic = Optimistic {
                generation: state.generation,
                rollback: Box::new(move |state: &mut SessionState| {
                    state.interactions.unmark_liked(id);
                    if let Some(c) = state.comments_mut().find_comment_mut(id) {
                        c.likes = previous_likes;
                    }
                }),
            };
            (self.pending(Slot::Action(id, ActionKind::Like)), optimistic)
        };

        let res = self.backend.like_comment(id).await;
        let outcome = {
            let mut state = self.state.lock();
            match res {
                Ok(receipt) => {
                    state.interactions.mark_liked(id);
                    if let Some(c) = state.comments_mut().find_comment_mut(receipt.id) {
                        c.likes = receipt.likes;
                    }
                    Outcome::Completed
                }
                Err(e) => {
                    optimistic.revert(&mut state);
                    state.fail(Some(id), "like", e)
                }
            }
        };
        drop(pending);
        outcome
    }

    /// Deletes `id` and its replies, once the server has confirmed it
    pub async fn delete(&self, id: CommentId) -> Outcome {
        let pending = {
            let mut state = self.state.lock();
            if state.interactions.in_flight(id).is_some() {
                return Outcome::Skipped;
            }
            let allowed = state
                .comments
                .find_comment(id)
                .map(|c| self.viewer.as_ref().map(|v| v.can_delete(c)));
            match allowed {
                None => return state.reject(Some(id), Rejection::UnknownComment),
                Some(None) => return state.reject(Some(id), Rejection::NotLoggedIn),
                Some(Some(false)) => return state.reject(Some(id), Rejection::PermissionDenied),
                Some(Some(true)) => (),
            }
            state.interactions.begin(id, ActionKind::Delete);
            self.pending(Slot::Action(id, ActionKind::Delete))
        };

        let res = self.backend.delete_comment(id).await;
        let outcome = {
            let mut state = self.state.lock();
            match res {
                Ok(()) => {
                    state.comments_mut().remove_comment(id);
                    state.interactions.unmark_liked(id);
                    if state.interactions.composing_reply_to() == Some(id) {
                        state.interactions.cancel_reply();
                    }
                    Outcome::Completed
                }
                Err(e) => state.fail(Some(id), "delete", e),
            }
        };
        drop(pending);
        outcome
    }

    pub async fn submit_reply(&self, parent_id: CommentId, content: impl Into<String>) -> Outcome {
        self.submit(Some(parent_id), content.into()).await
    }

    pub async fn submit_comment(&self, content: impl Into<String>) -> Outcome {
        self.submit(None, content.into()).await
    }

    async fn submit(&self, parent_id: Option<CommentId>, content: String) -> Outcome {
        let new = NewComment::new(String::from(content.trim()), parent_id);
        let pending = {
            let mut state = self.state.lock();
            if self.viewer.is_none() {
                return state.reject(parent_id, Rejection::NotLoggedIn);
            }
            match new.validate() {
                Ok(()) => (),
                Err(api::Error::EmptyContent) => {
                    return state.reject(parent_id, Rejection::EmptyContent)
                }
                Err(_) => return state.reject(parent_id, Rejection::InvalidContent),
            }
            if let Some(parent) = parent_id {
                if state.comments.find_comment(parent).is_none() {
                    return state.reject(parent_id, Rejection::UnknownComment);
                }
            }
            if state.submitting {
                return Outcome::Skipped;
            }
            state.submitting = true;
            self.pending(Slot::Submission)
        };

        let res = self.backend.submit_comment(self.target, &new).await;
        let outcome = {
            let mut state = self.state.lock();
            match res {
                Ok(created) => {
                    if parent_id.is_some() && state.interactions.composing_reply_to() == parent_id
                    {
                        state.interactions.cancel_reply();
                    }
                    // a refresh that ran while the request was in flight may already have it
                    if state.comments.find_comment(created.id).is_none() {
                        state.comments_mut().insert_comment(created);
                    } else {
                        tracing::debug!(comment = %created.id, "new comment was already refetched");
                    }
                    Outcome::Completed
                }
                Err(e) => state.fail(parent_id, "submit", e),
            }
        };
        drop(pending);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::FutureExt;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        api::{LikeReceipt, Role, UserId},
        comment::tests::{comment, user},
        flatten_replies,
    };

    #[derive(Default)]
    struct FakeBackend {
        comments: parking_lot::Mutex<Vec<Comment>>,
        next_id: AtomicI64,
        failing: AtomicBool,
        hold: AtomicBool,
        release: Notify,
        fetches: AtomicUsize,
        likes: AtomicUsize,
        deletes: AtomicUsize,
        submits: AtomicUsize,
    }

    impl FakeBackend {
        fn with(comments: Vec<Comment>) -> Arc<FakeBackend> {
            Arc::new(FakeBackend {
                comments: parking_lot::Mutex::new(comments),
                next_id: AtomicI64::new(100),
                ..FakeBackend::default()
            })
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn set_hold(&self, hold: bool) {
            self.hold.store(hold, Ordering::SeqCst);
        }

        async fn gate(&self) -> Result<(), Error> {
            if self.hold.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            match self.failing.load(Ordering::SeqCst) {
                true => Err(Error::Api(api::Error::Unknown(String::from("boom")))),
                false => Ok(()),
            }
        }
    }

    #[async_trait]
    impl CommentBackend for FakeBackend {
        async fn fetch_comments(&self, _target: CommentTarget) -> Result<Vec<Comment>, Error> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.failing.load(Ordering::SeqCst) {
                true => Err(Error::Api(api::Error::Unknown(String::from("boom")))),
                false => Ok(self.comments.lock().clone()),
            }
        }

        async fn like_comment(&self, id: CommentId) -> Result<LikeReceipt, Error> {
            self.likes.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            let mut comments = self.comments.lock();
            let c = comments
                .find_comment_mut(id)
                .ok_or_else(|| api::Error::NotFound(format!("comment {id}")))?;
            c.likes += 1;
            Ok(LikeReceipt { id, likes: c.likes })
        }

        async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            self.comments.lock().remove_comment(id);
            Ok(())
        }

        async fn submit_comment(
            &self,
            _target: CommentTarget,
            new: &NewComment,
        ) -> Result<Comment, Error> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Api(api::Error::Unknown(String::from("boom"))));
            }
            let mut created = comment(self.next_id.fetch_add(1, Ordering::SeqCst), 2, 500, vec![]);
            created.content = new.content.clone();
            created.parent_id = new.parent_id;
            self.comments.lock().insert_comment(created.clone());
            // committed, only the answer is held back
            self.gate().await?;
            Ok(created)
        }
    }

    fn viewer(id: i64, role: Role) -> User {
        User {
            id: UserId(id),
            username: user(id).username,
            role,
        }
    }

    // 1 (user1) <- 2 (user2) <- 3 (user3), and 5 (user1) on its own
    fn thread() -> Vec<Comment> {
        vec![
            comment(1, 1, 0, vec![comment(2, 2, 10, vec![comment(3, 3, 20, vec![])])]),
            comment(5, 1, 30, vec![]),
        ]
    }

    async fn open(
        backend: &Arc<FakeBackend>,
        viewer: Option<User>,
    ) -> CommentSession<Arc<FakeBackend>> {
        let session = CommentSession::new(
            backend.clone(),
            CommentTarget::Novel(api::NovelId(1)),
            viewer,
        );
        assert!(session.refresh().await.is_completed());
        session
    }

    fn likes_of(session: &CommentSession<Arc<FakeBackend>>, id: i64) -> u64 {
        session
            .comments()
            .find_comment(CommentId(id))
            .map(|c| c.likes)
            .expect("comment is not in the thread")
    }

    #[tokio::test]
    async fn refresh_loads_thread_and_resets_interactions() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        assert_eq!(session.comments().total_comments(), 4);
        assert_eq!(session.generation(), 1);

        assert!(session.like(CommentId(5)).await.is_completed());
        assert!(session.start_reply(CommentId(1)));
        assert!(session.is_liked(CommentId(5)));

        assert!(session.refresh().await.is_completed());
        assert_eq!(session.generation(), 2);
        assert!(!session.is_liked(CommentId(5)));
        assert_eq!(session.composing_reply_to(), None);
        assert_eq!(likes_of(&session, 5), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_thread() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, None).await;
        backend.set_failing(true);
        assert!(matches!(session.refresh().await, Outcome::Failed(_)));
        assert_eq!(session.generation(), 1);
        assert_eq!(session.comments().total_comments(), 4);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, GENERIC_FAILURE);
        assert!(session.take_notices().is_empty());
    }

    #[tokio::test]
    async fn like_is_optimistic_and_deduplicated() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        let first = session.like(CommentId(5));
        let meanwhile = async {
            // `first` is parked on the backend by now
            assert_eq!(session.in_flight(CommentId(5)), Some(ActionKind::Like));
            assert!(session.is_liked(CommentId(5)));
            assert_eq!(likes_of(&session, 5), 1);
            assert!(matches!(session.like(CommentId(5)).await, Outcome::Skipped));
            assert!(matches!(session.delete(CommentId(5)).await, Outcome::Skipped));
            backend.release.notify_one();
        };
        let (first, ()) = futures::join!(first, meanwhile);

        assert!(first.is_completed());
        assert_eq!(backend.likes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(session.in_flight(CommentId(5)), None);
        assert_eq!(likes_of(&session, 5), 1);
        assert!(matches!(session.like(CommentId(5)).await, Outcome::Skipped));
        assert_eq!(backend.likes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn likes_on_different_comments_overlap() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        let a = session.like(CommentId(1));
        let b = session.like(CommentId(3));
        let release = async {
            assert_eq!(session.interactions().num_in_flight(), 2);
            backend.release.notify_one();
            tokio::task::yield_now().await;
            backend.release.notify_one();
        };
        let (a, b, ()) = futures::join!(a, b, release);
        assert!(a.is_completed());
        assert!(b.is_completed());
        assert_eq!(backend.likes.load(Ordering::SeqCst), 2);
        assert_eq!(session.interactions().num_in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_like_rolls_back() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_failing(true);

        assert!(matches!(session.like(CommentId(3)).await, Outcome::Failed(_)));
        assert!(!session.is_liked(CommentId(3)));
        assert_eq!(likes_of(&session, 3), 0);
        assert_eq!(session.in_flight(CommentId(3)), None);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].comment, Some(CommentId(3)));

        backend.set_failing(false);
        assert!(session.like(CommentId(3)).await.is_completed());
        assert_eq!(likes_of(&session, 3), 1);
    }

    #[tokio::test]
    async fn rollback_is_dropped_after_refetch() {
        let mut comments = thread();
        comments[1].likes = 4;
        let backend = FakeBackend::with(comments);
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        let like = session.like(CommentId(5));
        let meanwhile = async {
            assert_eq!(likes_of(&session, 5), 5);
            backend.comments.lock()[1].likes = 9;
            assert!(session.refresh().await.is_completed());
            backend.set_failing(true);
            backend.release.notify_one();
        };
        let (like, ()) = futures::join!(like, meanwhile);

        assert!(matches!(like, Outcome::Failed(_)));
        assert_eq!(likes_of(&session, 5), 9);
        assert!(!session.is_liked(CommentId(5)));
    }

    #[tokio::test]
    async fn abandoned_like_frees_the_comment() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        assert!(session.like(CommentId(2)).now_or_never().is_none());
        assert_eq!(session.in_flight(CommentId(2)), None);
        assert_eq!(backend.likes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn anonymous_and_unknown_likes_are_refused() {
        let backend = FakeBackend::with(thread());
        let anonymous = open(&backend, None).await;
        assert!(matches!(
            anonymous.like(CommentId(1)).await,
            Outcome::Rejected(Rejection::NotLoggedIn)
        ));

        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        assert!(matches!(
            session.like(CommentId(42)).await,
            Outcome::Rejected(Rejection::UnknownComment)
        ));
        assert_eq!(backend.likes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_requires_ownership_or_elevation() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Author))).await;
        assert!(!session.can_delete(CommentId(1)));
        assert!(session.can_delete(CommentId(2)));

        assert!(matches!(
            session.delete(CommentId(1)).await,
            Outcome::Rejected(Rejection::PermissionDenied)
        ));
        assert_eq!(backend.deletes.load(Ordering::SeqCst), 0);
        assert!(session.comments().find_comment(CommentId(1)).is_some());
        assert_eq!(
            session.take_notices()[0].message,
            Rejection::PermissionDenied.message()
        );

        let admin = open(&backend, Some(viewer(9, Role::Admin))).await;
        assert!(admin.can_delete(CommentId(1)));
    }

    #[tokio::test]
    async fn delete_patches_local_thread_without_refetch() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        let snapshot = session.comments();

        assert!(session.delete(CommentId(2)).await.is_completed());
        assert_eq!(backend.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
        assert!(session.comments().find_comment(CommentId(2)).is_none());
        assert!(session.comments().find_comment(CommentId(3)).is_none());
        assert_eq!(session.in_flight(CommentId(2)), None);
        // snapshots handed out earlier are left alone
        assert!(snapshot.find_comment(CommentId(2)).is_some());
    }

    #[tokio::test]
    async fn failed_delete_leaves_comment_visible() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(1, Role::Reader))).await;
        backend.set_failing(true);

        assert!(matches!(session.delete(CommentId(5)).await, Outcome::Failed(_)));
        assert!(session.comments().find_comment(CommentId(5)).is_some());
        assert_eq!(session.in_flight(CommentId(5)), None);
        assert_eq!(session.take_notices()[0].message, GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn empty_replies_never_reach_the_server() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        assert!(matches!(
            session.submit_reply(CommentId(1), "   \n").await,
            Outcome::Rejected(Rejection::EmptyContent)
        ));
        assert!(matches!(
            session.submit_comment("nul\0").await,
            Outcome::Rejected(Rejection::InvalidContent)
        ));
        assert!(matches!(
            session.submit_reply(CommentId(77), "hello").await,
            Outcome::Rejected(Rejection::UnknownComment)
        ));
        assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reply_is_inserted_and_compose_state_cleared() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        assert!(session.start_reply(CommentId(3)));
        assert!(!session.start_reply(CommentId(33)));
        assert_eq!(session.composing_reply_to(), Some(CommentId(3)));

        assert!(session
            .submit_reply(CommentId(3), "  nice chapter  ")
            .await
            .is_completed());
        assert_eq!(session.composing_reply_to(), None);
        let comments = session.comments();
        let created = comments.find_comment(CommentId(100)).unwrap();
        assert_eq!(created.content, "nice chapter");
        assert_eq!(created.parent_id, Some(CommentId(3)));
        assert_eq!(comments[0].replies[0].replies[0].replies[0].id, CommentId(100));
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        assert!(session.submit_comment("top level").await.is_completed());
        assert_eq!(session.comments().len(), 3);
    }

    #[tokio::test]
    async fn failed_reply_keeps_compose_state() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        session.start_reply(CommentId(1));
        backend.set_failing(true);

        assert!(matches!(
            session.submit_reply(CommentId(1), "hi").await,
            Outcome::Failed(_)
        ));
        assert_eq!(session.composing_reply_to(), Some(CommentId(1)));
        assert_eq!(session.comments().total_comments(), 4);
    }

    #[tokio::test]
    async fn reply_seen_by_concurrent_refresh_appears_once() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        let reply = session.submit_reply(CommentId(1), "hello");
        let meanwhile = async {
            assert!(session.refresh().await.is_completed());
            assert!(session.comments().find_comment(CommentId(100)).is_some());
            backend.release.notify_one();
        };
        let (reply, ()) = futures::join!(reply, meanwhile);

        assert!(reply.is_completed());
        let comments = session.comments();
        assert_eq!(comments.total_comments(), 5);
        let ids: Vec<CommentId> = flatten_replies(&comments[0])
            .iter()
            .map(|r| r.reply.id)
            .collect();
        assert_eq!(ids, [CommentId(2), CommentId(3), CommentId(100)]);
    }

    #[tokio::test]
    async fn double_submit_is_skipped() {
        let backend = FakeBackend::with(thread());
        let session = open(&backend, Some(viewer(2, Role::Reader))).await;
        backend.set_hold(true);

        let first = session.submit_reply(CommentId(1), "one");
        let meanwhile = async {
            assert!(matches!(
                session.submit_reply(CommentId(1), "one").await,
                Outcome::Skipped
            ));
            backend.release.notify_one();
        };
        let (first, ()) = futures::join!(first, meanwhile);
        assert!(first.is_completed());
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
    }
}
