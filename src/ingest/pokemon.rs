//! Pokémon TCG catalog source.
//!
//! API docs: https://docs.pokemontcg.io/
//! Base URL: https://api.pokemontcg.io/v2/
//! Auth: optional `X-Api-Key` header (higher rate limits when present).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{CatalogSource, IngestReport};
use crate::catalog::{PokemonCardRecord, SqliteCatalog};
use crate::types::{CardmarketPrices, GameType, TcgplayerPrices};

const BASE_URL: &str = "https://api.pokemontcg.io/v2";

/// API max is 250 cards per page.
const PAGE_SIZE: u32 = 250;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CardsPage {
    data: Vec<CardDto>,
    #[serde(rename = "totalCount", default)]
    total_count: u32,
}

/// We only deserialize the fields the pricer consumes.
#[derive(Debug, Deserialize)]
struct CardDto {
    id: String,
    name: String,
    #[serde(default)]
    tcgplayer: Option<PriceBlock<TcgplayerPrices>>,
    #[serde(default)]
    cardmarket: Option<PriceBlock<CardmarketPrices>>,
}

#[derive(Debug, Deserialize)]
struct PriceBlock<T> {
    #[serde(default)]
    prices: Option<T>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PokemonSource {
    http: Client,
    api_key: Option<SecretString>,
}

impl PokemonSource {
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("binder/0.1.0 (collection-tracker)")
            .build()
            .context("Failed to build HTTP client for pokemontcg.io")?;
        Ok(Self { http, api_key })
    }

    async fn fetch_page(&self, page: u32) -> Result<CardsPage> {
        let url = format!("{BASE_URL}/cards?page={page}&pageSize={PAGE_SIZE}");
        debug!(url = %url, "Fetching Pokémon cards page");

        let mut req = self.http.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key.expose_secret());
        }

        let resp = req.send().await.context("pokemontcg.io request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("pokemontcg.io error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse pokemontcg.io cards page")
    }

    fn to_record(card: CardDto) -> PokemonCardRecord {
        PokemonCardRecord {
            id: card.id,
            name: card.name,
            tcgplayer: card.tcgplayer.and_then(|b| b.prices),
            cardmarket: card.cardmarket.and_then(|b| b.prices),
        }
    }
}

#[async_trait]
impl CatalogSource for PokemonSource {
    fn game(&self) -> GameType {
        GameType::Pokemon
    }

    async fn sync(&self, catalog: &SqliteCatalog) -> Result<IngestReport> {
        let mut cards_upserted = 0;
        let mut pages_fetched = 0;
        let mut page = 1;

        loop {
            let batch = self.fetch_page(page).await?;
            pages_fetched += 1;
            let fetched = batch.data.len();

            for card in batch.data {
                catalog.upsert_pokemon(&Self::to_record(card)).await?;
                cards_upserted += 1;
            }

            // `totalCount` can be 0 on older API deployments; the empty
            // page is the reliable terminator.
            let total = batch.total_count as usize;
            if fetched == 0 || (total > 0 && cards_upserted >= total) {
                break;
            }
            page += 1;
        }

        Ok(IngestReport {
            game: GameType::Pokemon,
            cards_upserted,
            pages_fetched,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
