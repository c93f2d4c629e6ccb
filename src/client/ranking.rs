use crate::{
    client::osu::{Endpoint, OsuClient},
    core::ranking::{RankedUser, RankingMode, RankingSource},
    error::FetchError,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Walks the osu! performance ranking one page (50 players) at a time.
pub struct RankingFetcher {
    client: Arc<OsuClient>,
    mode: RankingMode,
}

impl RankingFetcher {
    pub fn new(client: Arc<OsuClient>, mode: RankingMode) -> Self {
        Self { client, mode }
    }

    fn parse_ranking(body: &str) -> Result<Vec<RankedUser>, FetchError> {
        // Response from the osu! rankings API.
        // Structs defined here as they are only used by this function.
        #[derive(Debug, Deserialize)]
        struct RankingResponse {
            ranking: Vec<RankingEntry>,
        }

        #[derive(Debug, Deserialize)]
        struct RankingEntry {
            pp: f64,
            global_rank: u32,
            user: RankingUser,
        }

        #[derive(Debug, Deserialize)]
        struct RankingUser {
            id: u64,
            username: String,
            #[serde(default)]
            avatar_url: String,
            // false as well when players hide their online status
            #[serde(default)]
            is_online: bool,
        }

        let parsed = serde_json::from_str::<RankingResponse>(body)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .ranking
            .into_iter()
            .map(|entry| RankedUser {
                id: entry.user.id,
                name: entry.user.username,
                avatar_url: entry.user.avatar_url,
                is_online: entry.user.is_online,
                pp: entry.pp,
                rank: entry.global_rank,
            })
            .collect())
    }
}

#[async_trait]
impl RankingSource for RankingFetcher {
    async fn fetch_page(&self, page: u32) -> Result<Vec<RankedUser>, FetchError> {
        // The client makes sure the token is valid before sending anything.
        let body = self
            .client
            .get(&Endpoint::Ranking(self.mode), &[("cursor[page]", page)])
            .await?;
        RankingFetcher::parse_ranking(&body)
    }
}
