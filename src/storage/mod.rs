//! Persistence layer.
//!
//! Owns the SQLite pool and the schema. Monetary columns are stored as
//! canonical 2-dp decimal strings and parsed into `Decimal` at the
//! edges; SQLite's numeric affinity is never relied on for money math.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (or create) the database at `url`.
///
/// The pool is capped at a single connection: SQLite has one writer at
/// a time anyway, and a single connection serializes every
/// read-modify-write of a list's totals.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL: {url}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {url}"))?;

    Ok(pool)
}

/// Create the schema if it does not exist yet. Idempotent.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS card_lists (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            created_by       TEXT NOT NULL,
            created_on       TEXT NOT NULL,
            name             TEXT NOT NULL,
            kind             TEXT NOT NULL,
            market_value     TEXT NOT NULL DEFAULT '0.00',
            collection_value TEXT NOT NULL DEFAULT '0.00',
            needs_update     INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create card_lists table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS list_cards (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            card_list_id        INTEGER NOT NULL
                                REFERENCES card_lists(id) ON DELETE CASCADE,
            pokemon_card_id     TEXT,
            yugioh_card_id      TEXT,
            mtg_card_id         TEXT,
            lorcana_card_id     TEXT,
            collected           INTEGER NOT NULL DEFAULT 0,
            cached_market_value TEXT NOT NULL DEFAULT '0.00',
            CHECK (
                (pokemon_card_id IS NOT NULL)
              + (yugioh_card_id  IS NOT NULL)
              + (mtg_card_id     IS NOT NULL)
              + (lorcana_card_id IS NOT NULL) = 1
            )
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create list_cards table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_list_cards_list
         ON list_cards (card_list_id)",
    )
    .execute(pool)
    .await
    .context("Failed to create list_cards index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pokemon_cards (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            tcgplayer_prices  TEXT,
            cardmarket_prices TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create pokemon_cards table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS yugioh_cards (
            id   TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create yugioh_cards table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS yugioh_card_prices (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id            TEXT NOT NULL
                               REFERENCES yugioh_cards(id) ON DELETE CASCADE,
            cardmarket_price   TEXT,
            tcgplayer_price    TEXT,
            ebay_price         TEXT,
            amazon_price       TEXT,
            coolstuffinc_price TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create yugioh_card_prices table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS mtg_cards (
            id     TEXT PRIMARY KEY,
            name   TEXT NOT NULL,
            prices TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create mtg_cards table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS lorcana_cards (
            id   TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            cost INTEGER
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create lorcana_cards table")?;

    info!("Database schema ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
