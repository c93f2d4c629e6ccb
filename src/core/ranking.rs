use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Players per ranking page, fixed by the osu! API.
pub const PAGE_SIZE: u32 = 50;
/// Deepest position the osu! API lets us page to.
pub const MAX_POPULATION: u32 = 10_000;

// Snapshot of a player as seen on one ranking page.
// Each poll produces fresh values, they are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUser {
    pub id: u64,
    pub name: String,
    pub avatar_url: String,
    pub is_online: bool,
    pub pp: f64,
    pub rank: u32,
}

impl RankedUser {
    pub fn profile_url(&self) -> String {
        format!("https://osu.ppy.sh/users/{}", self.id)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RankingMode {
    #[default]
    Osu,
    Taiko,
    Fruits,
    Mania,
}

/// Anything able to hand out one page of the ranking at a time.
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<Vec<RankedUser>, FetchError>;
}

/// Position of the watcher in the ranking, always within `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    total_pages: u32,
}

impl PageCursor {
    pub fn new(total_pages: u32) -> Self {
        Self {
            page: 1,
            total_pages: total_pages.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Moves to the next page, wrapping `total_pages` back to 1.
    /// Returns whether the cursor wrapped.
    pub fn advance(&mut self) -> bool {
        self.page = self.page % self.total_pages + 1;
        self.page == 1
    }
}
