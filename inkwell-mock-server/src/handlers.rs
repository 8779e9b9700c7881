use axum::{
    extract::{Path, Query, State},
    Json,
};
use inkwell_api::{
    Comment, CommentId, CommentTarget, LikeReceipt, NewComment, NovelId, NovelSummary, Page,
    PageRequest, PostId, PostSummary, User,
};

use crate::{extractors::*, Error, MockServer};

pub async fn whoami(Auth(user): Auth) -> Json<User> {
    Json(user)
}

pub async fn list_posts(
    State(srv): State<MockServer>,
    Query(page): Query<PageRequest>,
) -> Json<Page<PostSummary>> {
    Json(srv.lock().list_posts(page))
}

pub async fn list_novels(
    State(srv): State<MockServer>,
    Query(page): Query<PageRequest>,
) -> Json<Page<NovelSummary>> {
    Json(srv.lock().list_novels(page))
}

pub async fn fetch_post_comments(
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(srv.lock().thread(CommentTarget::Post(PostId(id)))?))
}

pub async fn fetch_novel_comments(
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(srv.lock().thread(CommentTarget::Novel(NovelId(id)))?))
}

pub async fn submit_post_comment(
    Auth(user): Auth,
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    let target = CommentTarget::Post(PostId(id));
    Ok(Json(srv.lock().submit_comment(target, &user, data)?))
}

pub async fn submit_novel_comment(
    Auth(user): Auth,
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    let target = CommentTarget::Novel(NovelId(id));
    Ok(Json(srv.lock().submit_comment(target, &user, data)?))
}

pub async fn like_comment(
    Auth(user): Auth,
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
) -> Result<Json<LikeReceipt>, Error> {
    tracing::debug!(user = %user.username, comment = id, "like");
    Ok(Json(srv.lock().like_comment(CommentId(id))?))
}

pub async fn delete_comment(
    Auth(user): Auth,
    State(srv): State<MockServer>,
    Path(id): Path<i64>,
) -> Result<(), Error> {
    srv.lock().delete_comment(&user, CommentId(id))
}
