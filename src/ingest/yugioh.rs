//! Yu-Gi-Oh! catalog source.
//!
//! API docs: https://ygoprodeck.com/api-guide/
//! Base URL: https://db.ygoprodeck.com/api/v7/
//! The whole card database comes back in one response; vendor price
//! quotes ride along on each card.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogSource, IngestReport};
use crate::catalog::{SqliteCatalog, YugiohCardRecord};
use crate::types::{GameType, VendorQuote};

const BASE_URL: &str = "https://db.ygoprodeck.com/api/v7";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CardInfoResponse {
    data: Vec<CardDto>,
}

#[derive(Debug, Deserialize)]
struct CardDto {
    /// Numeric passcode; stored as text locally.
    id: i64,
    name: String,
    #[serde(default)]
    card_prices: Vec<VendorQuote>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct YugiohSource {
    http: Client,
}

impl YugiohSource {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent("binder/0.1.0 (collection-tracker)")
            .build()
            .context("Failed to build HTTP client for YGOPRODeck")?;
        Ok(Self { http })
    }

    async fn fetch_all(&self) -> Result<Vec<CardDto>> {
        let url = format!("{BASE_URL}/cardinfo.php");
        debug!(url = %url, "Fetching Yu-Gi-Oh! card database");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("YGOPRODeck request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("YGOPRODeck error {status}: {body}");
        }

        let parsed: CardInfoResponse = resp
            .json()
            .await
            .context("Failed to parse YGOPRODeck cardinfo response")?;
        Ok(parsed.data)
    }

    fn to_record(card: CardDto) -> YugiohCardRecord {
        YugiohCardRecord {
            id: card.id.to_string(),
            name: card.name,
            quotes: card.card_prices,
        }
    }
}

#[async_trait]
impl CatalogSource for YugiohSource {
    fn game(&self) -> GameType {
        GameType::Yugioh
    }

    async fn sync(&self, catalog: &SqliteCatalog) -> Result<IngestReport> {
        let cards = self.fetch_all().await?;
        let mut cards_upserted = 0;

        for card in cards {
            catalog.upsert_yugioh(&Self::to_record(card)).await?;
            cards_upserted += 1;
        }

        Ok(IngestReport {
            game: GameType::Yugioh,
            cards_upserted,
            pages_fetched: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
