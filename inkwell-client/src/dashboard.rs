use crate::api::{NovelStatus, NovelSummary, PostSummary};

/// Admin overview computed from the full post and novel listings
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DashboardStats {
    pub posts: usize,
    pub published_posts: usize,
    pub draft_posts: usize,

    pub novels: usize,
    pub ongoing_novels: usize,
    pub completed_novels: usize,
    pub hiatus_novels: usize,

    pub chapters: u64,
}

impl DashboardStats {
    pub fn compute(posts: &[PostSummary], novels: &[NovelSummary]) -> DashboardStats {
        let mut stats = DashboardStats {
            posts: posts.len(),
            novels: novels.len(),
            ..DashboardStats::default()
        };
        for p in posts {
            match p.published {
                true => stats.published_posts += 1,
                false => stats.draft_posts += 1,
            }
        }
        for n in novels {
            match n.status {
                NovelStatus::Ongoing => stats.ongoing_novels += 1,
                NovelStatus::Completed => stats.completed_novels += 1,
                NovelStatus::Hiatus => stats.hiatus_novels += 1,
            }
            stats.chapters += u64::from(n.chapter_count);
        }
        stats
    }

    pub fn published_pct(&self) -> f64 {
        percent(self.published_posts as u64, self.posts as u64)
    }

    pub fn completed_pct(&self) -> f64 {
        percent(self.completed_novels as u64, self.novels as u64)
    }

    pub fn avg_chapters_per_novel(&self) -> f64 {
        match self.novels {
            0 => 0.0,
            n => self.chapters as f64 / n as f64,
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    match whole {
        0 => 0.0,
        whole => part as f64 * 100.0 / whole as f64,
    }
}
