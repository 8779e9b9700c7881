use crate::{Time, UserSummary};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub i64);

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct NovelId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub author: UserSummary,
    pub published: bool,
    pub created_at: Time,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NovelStatus {
    Ongoing,
    Completed,
    Hiatus,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelSummary {
    pub id: NovelId,
    pub title: String,
    pub author: UserSummary,
    pub status: NovelStatus,
    pub chapter_count: u32,
    pub created_at: Time,
}

/// Query string of paginated listings, pages start at 1
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 20;

    pub fn first(per_page: u32) -> PageRequest {
        PageRequest { page: 1, per_page }
    }

    pub fn next(&self) -> PageRequest {
        PageRequest {
            page: self.page + 1,
            per_page: self.per_page,
        }
    }

    /// Index of the first item of this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.per_page as usize
    }
}

impl Default for PageRequest {
    fn default() -> PageRequest {
        PageRequest::first(PageRequest::DEFAULT_PER_PAGE)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        // an empty page also ends the walk, whatever `total` claims
        self.items.is_empty() || u64::from(self.page) * u64::from(self.per_page) >= self.total
    }

    /// Number of pages needed to cover `total` at this page's size
    pub fn num_pages(&self) -> u64 {
        match u64::from(self.per_page) {
            0 => 0,
            per_page => (self.total + per_page - 1) / per_page,
        }
    }
}
