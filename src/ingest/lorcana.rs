//! Disney Lorcana catalog source.
//!
//! API docs: https://lorcana-api.com/
//! Base URL: https://api.lorcana-api.com/
//! No market quotes upstream; ink cost is the only pricing fact.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogSource, IngestReport};
use crate::catalog::{LorcanaCardRecord, SqliteCatalog};
use crate::types::GameType;

const BASE_URL: &str = "https://api.lorcana-api.com";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// The API capitalizes its field names.
#[derive(Debug, Deserialize)]
struct CardDto {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Cost", default)]
    cost: Option<u32>,
    #[serde(rename = "Set_ID")]
    set_id: String,
    #[serde(rename = "Card_Num")]
    card_num: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct LorcanaSource {
    http: Client,
}

impl LorcanaSource {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent("binder/0.1.0 (collection-tracker)")
            .build()
            .context("Failed to build HTTP client for lorcana-api")?;
        Ok(Self { http })
    }

    async fn fetch_all(&self) -> Result<Vec<CardDto>> {
        let url = format!("{BASE_URL}/cards/all");
        debug!(url = %url, "Fetching Lorcana card database");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("lorcana-api request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("lorcana-api error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse lorcana-api cards response")
    }

    /// Cards are keyed by set and collector number, e.g. "TFC-42".
    fn to_record(card: CardDto) -> LorcanaCardRecord {
        LorcanaCardRecord {
            id: format!("{}-{}", card.set_id, card.card_num),
            name: card.name,
            cost: card.cost,
        }
    }
}

#[async_trait]
impl CatalogSource for LorcanaSource {
    fn game(&self) -> GameType {
        GameType::Lorcana
    }

    async fn sync(&self, catalog: &SqliteCatalog) -> Result<IngestReport> {
        let cards = self.fetch_all().await?;
        let mut cards_upserted = 0;

        for card in cards {
            catalog.upsert_lorcana(&Self::to_record(card)).await?;
            cards_upserted += 1;
        }

        Ok(IngestReport {
            game: GameType::Lorcana,
            cards_upserted,
            pages_fetched: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
