//! Card catalog — the read-only store of card metadata and price facts.
//!
//! The pricing core consumes catalogs through the `Catalog` trait and
//! never writes to them. The ingest jobs are the only writers, via the
//! upsert surface on `SqliteCatalog`. `MemoryCatalog` backs tests.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

use crate::types::{
    BinderError, CardPriceFacts, CardmarketPrices, GameType, TcgplayerPrices, VendorQuote,
};

// ---------------------------------------------------------------------------
// Lookup trait
// ---------------------------------------------------------------------------

/// Read-only card lookup consumed by the pricer and the ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the pricing projection for a card. `None` means the card
    /// is not in the catalog at all.
    async fn price_facts(
        &self,
        game: GameType,
        card_id: &str,
    ) -> Result<Option<CardPriceFacts>, BinderError>;

    /// Whether the catalog knows this card.
    async fn contains(&self, game: GameType, card_id: &str) -> Result<bool, BinderError> {
        Ok(self.price_facts(game, card_id).await?.is_some())
    }
}

// ---------------------------------------------------------------------------
// Upsert records (produced by the ingest clients)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PokemonCardRecord {
    pub id: String,
    pub name: String,
    pub tcgplayer: Option<TcgplayerPrices>,
    pub cardmarket: Option<CardmarketPrices>,
}

#[derive(Debug, Clone)]
pub struct YugiohCardRecord {
    pub id: String,
    pub name: String,
    pub quotes: Vec<VendorQuote>,
}

#[derive(Debug, Clone)]
pub struct MtgCardRecord {
    pub id: String,
    pub name: String,
    pub prices: HashMap<String, Option<String>>,
}

#[derive(Debug, Clone)]
pub struct LorcanaCardRecord {
    pub id: String,
    pub name: String,
    pub cost: Option<u32>,
}

// ---------------------------------------------------------------------------
// SQLite-backed catalog
// ---------------------------------------------------------------------------

/// Catalog backed by the shared SQLite database.
///
/// Price blocks are stored as JSON text columns; a malformed block is
/// treated as pricing data missing (valued at zero), not an error.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_pokemon(&self, card: &PokemonCardRecord) -> Result<(), BinderError> {
        let tcgplayer = card.tcgplayer.as_ref().and_then(to_json);
        let cardmarket = card.cardmarket.as_ref().and_then(to_json);
        sqlx::query(
            "INSERT INTO pokemon_cards (id, name, tcgplayer_prices, cardmarket_prices)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               tcgplayer_prices = excluded.tcgplayer_prices,
               cardmarket_prices = excluded.cardmarket_prices",
        )
        .bind(&card.id)
        .bind(&card.name)
        .bind(tcgplayer)
        .bind(cardmarket)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_yugioh(&self, card: &YugiohCardRecord) -> Result<(), BinderError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO yugioh_cards (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&card.id)
        .bind(&card.name)
        .execute(&mut *tx)
        .await?;

        // Quote rows are replaced wholesale on each sync.
        sqlx::query("DELETE FROM yugioh_card_prices WHERE card_id = ?1")
            .bind(&card.id)
            .execute(&mut *tx)
            .await?;
        for quote in &card.quotes {
            sqlx::query(
                "INSERT INTO yugioh_card_prices
                   (card_id, cardmarket_price, tcgplayer_price, ebay_price,
                    amazon_price, coolstuffinc_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&card.id)
            .bind(&quote.cardmarket_price)
            .bind(&quote.tcgplayer_price)
            .bind(&quote.ebay_price)
            .bind(&quote.amazon_price)
            .bind(&quote.coolstuffinc_price)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_mtg(&self, card: &MtgCardRecord) -> Result<(), BinderError> {
        let prices = serde_json::to_string(&card.prices).ok();
        sqlx::query(
            "INSERT INTO mtg_cards (id, name, prices) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               prices = excluded.prices",
        )
        .bind(&card.id)
        .bind(&card.name)
        .bind(prices)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_lorcana(&self, card: &LorcanaCardRecord) -> Result<(), BinderError> {
        sqlx::query(
            "INSERT INTO lorcana_cards (id, name, cost) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               cost = excluded.cost",
        )
        .bind(&card.id)
        .bind(&card.name)
        .bind(card.cost.map(|c| c as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pokemon_facts(&self, card_id: &str) -> Result<Option<CardPriceFacts>, BinderError> {
        let row = sqlx::query(
            "SELECT tcgplayer_prices, cardmarket_prices FROM pokemon_cards WHERE id = ?1",
        )
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let tcgplayer: Option<String> = row.get("tcgplayer_prices");
            let cardmarket: Option<String> = row.get("cardmarket_prices");
            CardPriceFacts::Pokemon {
                tcgplayer: tcgplayer.as_deref().and_then(|j| from_json(j, card_id)),
                cardmarket: cardmarket.as_deref().and_then(|j| from_json(j, card_id)),
            }
        }))
    }

    async fn yugioh_facts(&self, card_id: &str) -> Result<Option<CardPriceFacts>, BinderError> {
        let exists = sqlx::query("SELECT 1 FROM yugioh_cards WHERE id = ?1")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT cardmarket_price, tcgplayer_price, ebay_price,
                    amazon_price, coolstuffinc_price
             FROM yugioh_card_prices WHERE card_id = ?1 ORDER BY id",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        let quotes = rows
            .into_iter()
            .map(|row| VendorQuote {
                cardmarket_price: row.get("cardmarket_price"),
                tcgplayer_price: row.get("tcgplayer_price"),
                ebay_price: row.get("ebay_price"),
                amazon_price: row.get("amazon_price"),
                coolstuffinc_price: row.get("coolstuffinc_price"),
            })
            .collect();

        Ok(Some(CardPriceFacts::Yugioh { quotes }))
    }

    async fn mtg_facts(&self, card_id: &str) -> Result<Option<CardPriceFacts>, BinderError> {
        let row = sqlx::query("SELECT prices FROM mtg_cards WHERE id = ?1")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let prices: Option<String> = row.get("prices");
            CardPriceFacts::Mtg {
                prices: prices
                    .as_deref()
                    .and_then(|j| from_json(j, card_id))
                    .unwrap_or_default(),
            }
        }))
    }

    async fn lorcana_facts(&self, card_id: &str) -> Result<Option<CardPriceFacts>, BinderError> {
        let row = sqlx::query("SELECT cost FROM lorcana_cards WHERE id = ?1")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let cost: Option<i64> = row.get("cost");
            CardPriceFacts::Lorcana {
                cost: cost.and_then(|c| u32::try_from(c).ok()),
            }
        }))
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn price_facts(
        &self,
        game: GameType,
        card_id: &str,
    ) -> Result<Option<CardPriceFacts>, BinderError> {
        match game {
            GameType::Pokemon => self.pokemon_facts(card_id).await,
            GameType::Yugioh => self.yugioh_facts(card_id).await,
            GameType::Mtg => self.mtg_facts(card_id).await,
            GameType::Lorcana => self.lorcana_facts(card_id).await,
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str, card_id: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(card_id, error = %e, "Malformed price block in catalog; treating as missing");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory catalog
// ---------------------------------------------------------------------------

/// HashMap-backed catalog for tests and offline experiments.
#[derive(Default)]
pub struct MemoryCatalog {
    cards: RwLock<HashMap<(GameType, String), CardPriceFacts>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, game: GameType, card_id: impl Into<String>, facts: CardPriceFacts) {
        self.cards
            .write()
            .expect("catalog lock poisoned")
            .insert((game, card_id.into()), facts);
    }

    pub fn remove(&self, game: GameType, card_id: &str) {
        self.cards
            .write()
            .expect("catalog lock poisoned")
            .remove(&(game, card_id.to_string()));
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn price_facts(
        &self,
        game: GameType,
        card_id: &str,
    ) -> Result<Option<CardPriceFacts>, BinderError> {
        Ok(self
            .cards
            .read()
            .expect("catalog lock poisoned")
            .get(&(game, card_id.to_string()))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;
    use rust_decimal_macros::dec;

    async fn sqlite_catalog() -> SqliteCatalog {
        let pool = storage::connect("sqlite::memory:").await.unwrap();
        storage::migrate(&pool).await.unwrap();
        SqliteCatalog::new(pool)
    }

    #[tokio::test]
    async fn test_memory_catalog_roundtrip() {
        let catalog = MemoryCatalog::new();
        catalog.insert(
            GameType::Lorcana,
            "TFC-42",
            CardPriceFacts::Lorcana { cost: Some(3) },
        );

        assert!(catalog.contains(GameType::Lorcana, "TFC-42").await.unwrap());
        assert!(!catalog.contains(GameType::Lorcana, "TFC-43").await.unwrap());
        assert!(!catalog.contains(GameType::Mtg, "TFC-42").await.unwrap());

        catalog.remove(GameType::Lorcana, "TFC-42");
        assert!(!catalog.contains(GameType::Lorcana, "TFC-42").await.unwrap());
    }

    #[tokio::test]
    async fn test_pokemon_upsert_and_lookup() {
        let catalog = sqlite_catalog().await;
        catalog
            .upsert_pokemon(&PokemonCardRecord {
                id: "base1-4".into(),
                name: "Charizard".into(),
                tcgplayer: Some(TcgplayerPrices {
                    trend_price: Some(dec!(10.00)),
                    reverse_holo_trend: None,
                }),
                cardmarket: Some(CardmarketPrices {
                    average_sell_price: Some(dec!(9.50)),
                }),
            })
            .await
            .unwrap();

        let facts = catalog
            .price_facts(GameType::Pokemon, "base1-4")
            .await
            .unwrap()
            .unwrap();
        match facts {
            CardPriceFacts::Pokemon { tcgplayer, cardmarket } => {
                assert_eq!(tcgplayer.unwrap().trend_price, Some(dec!(10.00)));
                assert_eq!(cardmarket.unwrap().average_sell_price, Some(dec!(9.50)));
            }
            other => panic!("wrong variant: {other:?}"),
        }

        assert!(catalog
            .price_facts(GameType::Pokemon, "base1-999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_yugioh_quotes_replaced_on_resync() {
        let catalog = sqlite_catalog().await;
        let mut record = YugiohCardRecord {
            id: "46986414".into(),
            name: "Dark Magician".into(),
            quotes: vec![
                VendorQuote {
                    cardmarket_price: Some("3.00".into()),
                    ..Default::default()
                },
                VendorQuote {
                    ebay_price: Some("4.00".into()),
                    ..Default::default()
                },
            ],
        };
        catalog.upsert_yugioh(&record).await.unwrap();

        record.quotes = vec![VendorQuote {
            amazon_price: Some("5.00".into()),
            ..Default::default()
        }];
        catalog.upsert_yugioh(&record).await.unwrap();

        let facts = catalog
            .price_facts(GameType::Yugioh, "46986414")
            .await
            .unwrap()
            .unwrap();
        match facts {
            CardPriceFacts::Yugioh { quotes } => {
                assert_eq!(quotes.len(), 1);
                assert_eq!(quotes[0].amazon_price.as_deref(), Some("5.00"));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_yugioh_card_without_quotes_still_exists() {
        let catalog = sqlite_catalog().await;
        catalog
            .upsert_yugioh(&YugiohCardRecord {
                id: "123".into(),
                name: "Kuriboh".into(),
                quotes: Vec::new(),
            })
            .await
            .unwrap();

        assert!(catalog.contains(GameType::Yugioh, "123").await.unwrap());
        let facts = catalog
            .price_facts(GameType::Yugioh, "123")
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(facts, CardPriceFacts::Yugioh { quotes } if quotes.is_empty()));
    }

    #[tokio::test]
    async fn test_mtg_upsert_and_lookup() {
        let catalog = sqlite_catalog().await;
        let mut prices = HashMap::new();
        prices.insert("usd".to_string(), Some("3.00".to_string()));
        prices.insert("eur".to_string(), None);
        catalog
            .upsert_mtg(&MtgCardRecord {
                id: "aaa-1".into(),
                name: "Lightning Bolt".into(),
                prices,
            })
            .await
            .unwrap();

        let facts = catalog
            .price_facts(GameType::Mtg, "aaa-1")
            .await
            .unwrap()
            .unwrap();
        match facts {
            CardPriceFacts::Mtg { prices } => {
                assert_eq!(prices.get("usd"), Some(&Some("3.00".to_string())));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lorcana_upsert_and_lookup() {
        let catalog = sqlite_catalog().await;
        catalog
            .upsert_lorcana(&LorcanaCardRecord {
                id: "TFC-42".into(),
                name: "Elsa".into(),
                cost: Some(8),
            })
            .await
            .unwrap();

        let facts = catalog
            .price_facts(GameType::Lorcana, "TFC-42")
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(facts, CardPriceFacts::Lorcana { cost: Some(8) }));
    }
}
