use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

use crate::{
    api::{
        self, AuthToken, Comment, CommentId, CommentTarget, LikeReceipt, NewComment,
        NovelSummary, Page, PageRequest, PostSummary, User,
    },
    CommentBackend, DashboardStats, Error, TokenStore,
};

// Reads are retried on transient failures, mutations never are
const DEFAULT_READ_RETRIES: u32 = 3;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    /// Base url of the server, the api lives under `{host}/api/`
    pub host: String,

    pub max_read_retries: u32,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> ClientConfig {
        let host: String = host.into();
        ClientConfig {
            host: String::from(host.trim_end_matches('/')),
            max_read_retries: DEFAULT_READ_RETRIES,
        }
    }
}

/// Gateway to the remote content api
pub struct ApiClient {
    host: String,
    reader: ClientWithMiddleware,
    writer: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> ApiClient {
        let http = reqwest::Client::new();
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_read_retries);
        let reader = reqwest_middleware::ClientBuilder::new(http.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        ApiClient {
            host: config.host,
            reader,
            writer: http,
            tokens,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> Result<Option<AuthToken>, Error> {
        Ok(self.tokens.load()?)
    }

    pub fn set_token(&self, token: AuthToken) -> Result<(), Error> {
        self.tokens.save(&token)?;
        tracing::info!("stored new auth token");
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), Error> {
        self.tokens.clear()?;
        tracing::info!("cleared auth token");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }

    fn required_token(&self) -> Result<AuthToken, Error> {
        self.token()?.ok_or(Error::NotLoggedIn)
    }

    async fn fetch<R>(&self, path: &str, page: Option<PageRequest>) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let mut req = self.reader.get(&url);
        if let Some(page) = page {
            req = req.query(&page);
        }
        if let Some(token) = self.token()? {
            req = req.bearer_auth(token.0);
        }
        tracing::debug!(%url, "fetching");
        let resp = check_status(&url, req.send().await).await?;
        resp.json()
            .await
            .map_err(|source| Error::Decode { url, source })
    }

    async fn fetch_all<T>(&self, path: &str, per_page: u32) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        let mut walk = PageWalk::new(per_page);
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self.fetch(path, Some(walk.request())).await?;
            let more = walk.advance(path, &page);
            items.extend(page.items);
            if !more {
                return Ok(items);
            }
        }
    }

    /// Mutations always need a token and are sent exactly once
    fn mutation(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<(String, reqwest::RequestBuilder), Error> {
        let token = self.required_token()?;
        let url = self.url(path);
        let req = self
            .writer
            .request(method, &url)
            .bearer_auth(token.0);
        Ok((url, req))
    }

    pub async fn whoami(&self) -> Result<User, Error> {
        self.required_token()?;
        self.fetch("users/me", None).await
    }

    pub async fn list_posts(&self, page: PageRequest) -> Result<Page<PostSummary>, Error> {
        self.fetch("posts", Some(page)).await
    }

    pub async fn list_novels(&self, page: PageRequest) -> Result<Page<NovelSummary>, Error> {
        self.fetch("novels", Some(page)).await
    }

    pub async fn fetch_all_posts(&self) -> Result<Vec<PostSummary>, Error> {
        self.fetch_all("posts", PageRequest::DEFAULT_PER_PAGE).await
    }

    pub async fn fetch_all_novels(&self) -> Result<Vec<NovelSummary>, Error> {
        self.fetch_all("novels", PageRequest::DEFAULT_PER_PAGE).await
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, Error> {
        let posts = self.fetch_all_posts().await?;
        let novels = self.fetch_all_novels().await?;
        Ok(DashboardStats::compute(&posts, &novels))
    }
}

/// Cursor over a paginated listing, bounded by the total announced on the first page
struct PageWalk {
    next: PageRequest,
    max_pages: Option<u64>,
}

impl PageWalk {
    fn new(per_page: u32) -> PageWalk {
        PageWalk {
            next: PageRequest::first(per_page),
            max_pages: None,
        }
    }

    fn request(&self) -> PageRequest {
        self.next
    }

    /// Moves past `page`, returning false once the walk is over
    fn advance<T>(&mut self, path: &str, page: &Page<T>) -> bool {
        let max_pages = *self.max_pages.get_or_insert_with(|| page.num_pages());
        if page.is_last() {
            return false;
        }
        if u64::from(self.next.page) >= max_pages {
            tracing::warn!(
                path,
                max_pages,
                "server keeps paginating past the total it announced, stopping"
            );
            return false;
        }
        self.next = self.next.next();
        true
    }
}

async fn send(url: &str, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
    check_status(url, req.send().await.map_err(reqwest_middleware::Error::from)).await
}

async fn check_status(
    url: &str,
    resp: Result<reqwest::Response, reqwest_middleware::Error>,
) -> Result<reqwest::Response, Error> {
    let resp = resp.map_err(|source| Error::Transport {
        url: String::from(url),
        source,
    })?;
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.map_err(|source| Error::Decode {
        url: String::from(url),
        source,
    })?;
    match api::Error::parse(&body) {
        Ok(err) => {
            tracing::info!(%url, %status, "server returned error: {err}");
            Err(Error::Api(err))
        }
        Err(e) => {
            tracing::warn!(%url, %status, error = ?e, "server returned unparseable error");
            Err(Error::UnexpectedStatus {
                url: String::from(url),
                status,
            })
        }
    }
}

#[async_trait]
impl CommentBackend for ApiClient {
    async fn fetch_comments(&self, target: CommentTarget) -> Result<Vec<Comment>, Error> {
        self.fetch(&target.path(), None).await
    }

    async fn like_comment(&self, id: CommentId) -> Result<LikeReceipt, Error> {
        let (url, req) = self.mutation(reqwest::Method::POST, &format!("comments/{id}/like"))?;
        let resp = send(&url, req).await?;
        resp.json()
            .await
            .map_err(|source| Error::Decode { url, source })
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
        let (url, req) = self.mutation(reqwest::Method::DELETE, &format!("comments/{id}"))?;
        send(&url, req).await?;
        Ok(())
    }

    async fn submit_comment(
        &self,
        target: CommentTarget,
        comment: &NewComment,
    ) -> Result<Comment, Error> {
        let (url, req) = self.mutation(reqwest::Method::POST, &target.path())?;
        let resp = send(&url, req.json(comment)).await?;
        resp.json()
            .await
            .map_err(|source| Error::Decode { url, source })
    }
}
