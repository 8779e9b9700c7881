use std::net::SocketAddr;

use anyhow::Context;
use inkwell_api::{CommentTarget, NovelStatus, Role};
use inkwell_mock_server::MockServer;

fn seed(srv: &MockServer) {
    let (ada, ada_token) = srv.add_user("ada", Role::Author);
    let (bob, bob_token) = srv.add_user("bob", Role::Reader);
    let (_, admin_token) = srv.add_user("admin", Role::Admin);
    tracing::info!(token = %ada_token.0, "author ada");
    tracing::info!(token = %bob_token.0, "reader bob");
    tracing::info!(token = %admin_token.0, "admin");

    let post = srv.add_post(&ada, "Welcome to the blog", true);
    srv.add_post(&ada, "Notes on pacing", false);
    let novel = srv.add_novel(&ada, "The Long Road", NovelStatus::Ongoing, 12);
    srv.add_novel(&ada, "Short Stories", NovelStatus::Completed, 7);

    let post = CommentTarget::Post(post);
    let root = srv.seed_comment(post, &bob, None, "Great first post!");
    let reply = srv.seed_comment(post, &ada, Some(root), "Thanks for reading");
    srv.seed_comment(post, &bob, Some(reply), "Looking forward to more");
    srv.seed_comment(CommentTarget::Novel(novel), &bob, None, "Chapter 12 was a ride");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = match std::env::var("INKWELL_MOCK_ADDR") {
        Ok(addr) => addr
            .parse()
            .with_context(|| format!("parsing INKWELL_MOCK_ADDR {addr:?}"))?,
        Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
    };

    let srv = MockServer::new();
    seed(&srv);

    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(srv.router().into_make_service())
        .await
        .context("serving axum webserver")
}
