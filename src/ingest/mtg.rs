//! Magic: The Gathering catalog source.
//!
//! API docs: https://scryfall.com/docs/api
//! Base URL: https://api.scryfall.com/
//! Pagination: responses carry `has_more` and a `next_page` URL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{CatalogSource, IngestReport};
use crate::catalog::{MtgCardRecord, SqliteCatalog};
use crate::types::GameType;

const BASE_URL: &str = "https://api.scryfall.com";

/// Every paper-printable card, one printing per row.
const SEARCH_QUERY: &str = "game%3Apaper";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchPage {
    data: Vec<CardDto>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardDto {
    id: String,
    name: String,
    /// Currency tag to quote, e.g. {"usd": "3.00", "eur": null}.
    #[serde(default)]
    prices: HashMap<String, Option<String>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MtgSource {
    http: Client,
}

impl MtgSource {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("binder/0.1.0 (collection-tracker)")
            .build()
            .context("Failed to build HTTP client for Scryfall")?;
        Ok(Self { http })
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchPage> {
        debug!(url = %url, "Fetching Scryfall search page");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Scryfall request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Scryfall error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse Scryfall search page")
    }

    fn to_record(card: CardDto) -> MtgCardRecord {
        MtgCardRecord {
            id: card.id,
            name: card.name,
            prices: card.prices,
        }
    }
}

#[async_trait]
impl CatalogSource for MtgSource {
    fn game(&self) -> GameType {
        GameType::Mtg
    }

    async fn sync(&self, catalog: &SqliteCatalog) -> Result<IngestReport> {
        let mut cards_upserted = 0;
        let mut pages_fetched = 0;
        let mut url = format!("{BASE_URL}/cards/search?q={SEARCH_QUERY}&unique=prints");

        loop {
            let page = self.fetch_page(&url).await?;
            pages_fetched += 1;

            for card in page.data {
                catalog.upsert_mtg(&Self::to_record(card)).await?;
                cards_upserted += 1;
            }

            match (page.has_more, page.next_page) {
                (true, Some(next)) => url = next,
                _ => break,
            }
        }

        Ok(IngestReport {
            game: GameType::Mtg,
            cards_upserted,
            pages_fetched,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
