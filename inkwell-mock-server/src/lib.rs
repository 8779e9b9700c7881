use std::{collections::BTreeMap, collections::HashMap, net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Context};
use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use inkwell_api::{
    AuthToken, Comment, CommentId, CommentTarget, LikeReceipt, NewComment, NovelId, NovelStatus,
    NovelSummary, Page, PageRequest, PostId, PostSummary, Role, User, UserId,
};
use parking_lot::{Mutex, MutexGuard};

mod error;
pub use error::Error;

mod extractors;
mod handlers;

const MAX_PER_PAGE: u32 = 100;

/// In-memory implementation of the content api, for tests and local demos
#[derive(Clone, Default)]
pub struct MockServer(Arc<Mutex<MockState>>);

#[derive(Debug, Default)]
pub(crate) struct MockState {
    users: BTreeMap<UserId, User>,
    sessions: HashMap<AuthToken, UserId>,
    posts: Vec<PostSummary>,
    novels: Vec<NovelSummary>,
    // replies are always empty here, threads get rebuilt from `parent_id` on fetch
    comments: BTreeMap<CommentId, (CommentTarget, Comment)>,
    next_comment: i64,
    failing: bool,
    like_requests: usize,
    delete_requests: usize,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock()
    }

    pub(crate) fn authenticate(&self, token: &AuthToken) -> Result<User, Error> {
        let state = self.lock();
        state
            .sessions
            .get(token)
            .and_then(|id| state.users.get(id))
            .cloned()
            .ok_or(Error::unauthenticated())
    }

    /// Create a user, returning it along with a valid session token
    pub fn add_user(&self, name: &str, role: Role) -> (User, AuthToken) {
        let mut state = self.lock();
        let user = User {
            id: UserId(state.users.len() as i64 + 1),
            username: String::from(name),
            role,
        };
        let token = AuthToken(uuid::Uuid::new_v4().to_string());
        state.users.insert(user.id, user.clone());
        state.sessions.insert(token.clone(), user.id);
        (user, token)
    }

    pub fn add_post(&self, author: &User, title: &str, published: bool) -> PostId {
        let mut state = self.lock();
        let id = PostId(state.posts.len() as i64 + 1);
        state.posts.push(PostSummary {
            id,
            title: String::from(title),
            author: author.summary(),
            published,
            created_at: Utc::now(),
        });
        id
    }

    pub fn add_novel(
        &self,
        author: &User,
        title: &str,
        status: NovelStatus,
        chapter_count: u32,
    ) -> NovelId {
        let mut state = self.lock();
        let id = NovelId(state.novels.len() as i64 + 1);
        state.novels.push(NovelSummary {
            id,
            title: String::from(title),
            author: author.summary(),
            status,
            chapter_count,
            created_at: Utc::now(),
        });
        id
    }

    /// Insert a comment directly, bypassing authentication and validation
    pub fn seed_comment(
        &self,
        target: CommentTarget,
        author: &User,
        parent_id: Option<CommentId>,
        content: &str,
    ) -> CommentId {
        self.lock()
            .insert_comment(target, author, String::from(content), parent_id)
            .id
    }

    /// While set, every mutation answers with an internal server error
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Number of like requests that reached the server, failed ones included
    pub fn like_requests(&self) -> usize {
        self.lock().like_requests
    }

    pub fn delete_requests(&self) -> usize {
        self.lock().delete_requests
    }

    pub fn num_comments(&self) -> usize {
        self.lock().comments.len()
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/users/me", get(handlers::whoami))
            .route("/posts", get(handlers::list_posts))
            .route("/novels", get(handlers::list_novels))
            .route(
                "/posts/:id/comments",
                get(handlers::fetch_post_comments).post(handlers::submit_post_comment),
            )
            .route(
                "/novels/:id/comments",
                get(handlers::fetch_novel_comments).post(handlers::submit_novel_comment),
            )
            .route("/comments/:id", delete(handlers::delete_comment))
            .route("/comments/:id/like", post(handlers::like_comment));
        Router::new()
            .nest("/api", api)
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Serve on an ephemeral localhost port, returning the base url
    pub async fn spawn(&self) -> anyhow::Result<String> {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = axum::Server::try_bind(&addr)
            .with_context(|| format!("binding mock server to {addr}"))?
            .serve(self.router().into_make_service());
        let addr = server.local_addr();
        tracing::debug!(%addr, "mock server listening");
        tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::error!(?err, "mock server stopped");
            }
        });
        Ok(format!("http://{addr}"))
    }
}

impl MockState {
    fn check_failing(&self) -> Result<(), Error> {
        match self.failing {
            true => Err(Error::Anyhow(anyhow!("failure injected by the test harness"))),
            false => Ok(()),
        }
    }

    fn target_exists(&self, target: CommentTarget) -> bool {
        match target {
            CommentTarget::Post(id) => self.posts.iter().any(|p| p.id == id),
            CommentTarget::Novel(id) => self.novels.iter().any(|n| n.id == id),
        }
    }

    pub(crate) fn list_posts(&self, req: PageRequest) -> Page<PostSummary> {
        paginate(&self.posts, req)
    }

    pub(crate) fn list_novels(&self, req: PageRequest) -> Page<NovelSummary> {
        paginate(&self.novels, req)
    }

    pub(crate) fn thread(&self, target: CommentTarget) -> Result<Vec<Comment>, Error> {
        if !self.target_exists(target) {
            return Err(Error::not_found(target));
        }
        Ok(self.replies_to(target, None))
    }

    fn replies_to(&self, target: CommentTarget, parent: Option<CommentId>) -> Vec<Comment> {
        self.comments
            .values()
            .filter(|(t, c)| *t == target && c.parent_id == parent)
            .map(|(_, c)| Comment {
                replies: self.replies_to(target, Some(c.id)),
                ..c.clone()
            })
            .collect()
    }

    fn insert_comment(
        &mut self,
        target: CommentTarget,
        author: &User,
        content: String,
        parent_id: Option<CommentId>,
    ) -> Comment {
        self.next_comment += 1;
        let comment = Comment {
            id: CommentId(self.next_comment),
            author: author.summary(),
            content,
            created_at: Utc::now(),
            likes: 0,
            parent_id,
            replies: Vec::new(),
        };
        self.comments
            .insert(comment.id, (target, comment.clone()));
        comment
    }

    pub(crate) fn submit_comment(
        &mut self,
        target: CommentTarget,
        author: &User,
        data: NewComment,
    ) -> Result<Comment, Error> {
        self.check_failing()?;
        data.validate()?;
        if !self.target_exists(target) {
            return Err(Error::not_found(target));
        }
        if let Some(parent) = data.parent_id {
            match self.comments.get(&parent) {
                Some((t, _)) if *t == target => (),
                _ => return Err(Error::comment_not_found(parent)),
            }
        }
        Ok(self.insert_comment(target, author, data.content, data.parent_id))
    }

    pub(crate) fn like_comment(&mut self, id: CommentId) -> Result<LikeReceipt, Error> {
        self.like_requests += 1;
        self.check_failing()?;
        let (_, comment) = self
            .comments
            .get_mut(&id)
            .ok_or(Error::comment_not_found(id))?;
        comment.likes += 1;
        Ok(LikeReceipt {
            id,
            likes: comment.likes,
        })
    }

    /// Removes the comment along with all its replies
    pub(crate) fn delete_comment(&mut self, user: &User, id: CommentId) -> Result<(), Error> {
        self.delete_requests += 1;
        self.check_failing()?;
        let (_, comment) = self.comments.get(&id).ok_or(Error::comment_not_found(id))?;
        if !user.can_delete(comment) {
            return Err(Error::permission_denied());
        }
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let cur = doomed[i];
            doomed.extend(
                self.comments
                    .values()
                    .filter(|(_, c)| c.parent_id == Some(cur))
                    .map(|(_, c)| c.id),
            );
            i += 1;
        }
        tracing::debug!(?doomed, "deleting comments");
        for id in doomed {
            self.comments.remove(&id);
        }
        Ok(())
    }
}

fn paginate<T: Clone>(all: &[T], req: PageRequest) -> Page<T> {
    let req = PageRequest {
        page: req.page.max(1),
        per_page: req.per_page.clamp(1, MAX_PER_PAGE),
    };
    Page {
        items: all
            .iter()
            .skip(req.offset())
            .take(req.per_page as usize)
            .cloned()
            .collect(),
        page: req.page,
        per_page: req.per_page,
        total: all.len() as u64,
    }
}
