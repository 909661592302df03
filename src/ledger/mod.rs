//! List valuation ledger.
//!
//! Owns every list's `(market_value, collection_value)` pair and the
//! membership rows behind them. Incremental mutations apply a price
//! delta together with the row change in one transaction; the full
//! read path recomputes both totals from scratch and overwrites the
//! stored values, so drift accumulated by the incremental path never
//! survives a read.
//!
//! Quantity is modeled as repeated rows, one per physical copy, never
//! as a counter column: the collected flag is per-instance, and
//! collapsing copies into a count would lose that.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

use crate::pricing::CardPricer;
use crate::types::{
    AddCardOutcome, BinderError, CardList, CardRef, GameType, ListEntry, ListWithValuation,
    QuantityOp, ValuedEntry,
};

// ---------------------------------------------------------------------------
// List store
// ---------------------------------------------------------------------------

/// Persistent store for lists and their memberships.
///
/// All list mutations go through here; each one resolves the affected
/// card's price first, then applies the membership change and the
/// totals delta atomically.
#[derive(Clone)]
pub struct ListStore {
    pool: SqlitePool,
    pricer: CardPricer,
}

impl ListStore {
    pub fn new(pool: SqlitePool, pricer: CardPricer) -> Self {
        Self { pool, pricer }
    }

    // -- List CRUD --------------------------------------------------------

    pub async fn create_list(
        &self,
        name: &str,
        kind: &str,
        created_by: &str,
    ) -> Result<CardList, BinderError> {
        let result = sqlx::query(
            "INSERT INTO card_lists
               (created_by, created_on, name, kind, market_value, collection_value, needs_update)
             VALUES (?1, ?2, ?3, ?4, '0.00', '0.00', 0)",
        )
        .bind(created_by)
        .bind(Utc::now().to_rfc3339())
        .bind(name)
        .bind(kind)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(list_id = id, name, kind, "List created");
        self.get_list(id).await
    }

    /// Fetch a list's stored row as-is (totals possibly stale).
    pub async fn get_list(&self, list_id: i64) -> Result<CardList, BinderError> {
        sqlx::query(
            "SELECT id, created_by, created_on, name, kind,
                    market_value, collection_value, needs_update
             FROM card_lists WHERE id = ?1",
        )
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| list_from_row(&row))
        .ok_or(BinderError::ListNotFound(list_id))
    }

    /// Delete a list; membership rows go with it via cascade.
    pub async fn delete_list(&self, list_id: i64) -> Result<(), BinderError> {
        let result = sqlx::query("DELETE FROM card_lists WHERE id = ?1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BinderError::ListNotFound(list_id));
        }
        info!(list_id, "List deleted");
        Ok(())
    }

    // -- Incremental mutations --------------------------------------------

    /// Add one physical copy of a card to a list.
    pub async fn add_card(
        &self,
        list_id: i64,
        card: &CardRef,
    ) -> Result<AddCardOutcome, BinderError> {
        self.get_list(list_id).await?;
        if !self.pricer.card_exists(card).await? {
            return Err(BinderError::CardNotFound {
                game: card.game(),
                card_id: card.card_id().to_string(),
            });
        }
        let price = self.pricer.price(card).await?;

        let mut tx = self.pool.begin().await?;
        let insert = format!(
            "INSERT INTO list_cards (card_list_id, {}, collected, cached_market_value)
             VALUES (?1, ?2, 0, ?3)",
            card_column(card.game()),
        );
        let result = sqlx::query(&insert)
            .bind(list_id)
            .bind(card.card_id())
            .bind(money(price))
            .execute(&mut *tx)
            .await?;
        let entry_id = result.last_insert_rowid();

        let (market_value, collection_value) = read_totals(&mut tx, list_id).await?;
        let market_value = clamp(market_value + price);
        write_totals(&mut tx, list_id, market_value, collection_value, true).await?;

        let new_card_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM list_cards WHERE card_list_id = ?1")
                .bind(list_id)
                .fetch_one(&mut *tx)
                .await?
                .get("n");
        tx.commit().await?;

        info!(list_id, card = %card, price = %price, "Card added to list");
        Ok(AddCardOutcome {
            entry_id,
            new_card_count,
            market_value,
        })
    }

    /// Remove one physical copy of a card from a list, preferring an
    /// uncollected instance so collected state stays sticky.
    pub async fn remove_card(&self, list_id: i64, card: &CardRef) -> Result<(), BinderError> {
        self.get_list(list_id).await?;
        // Prices drift between add and remove; recompute rather than
        // trust the per-row cache across the catalog boundary.
        let price = self.pricer.price(card).await?;

        let mut tx = self.pool.begin().await?;
        let select = format!(
            "SELECT id, collected FROM list_cards
             WHERE card_list_id = ?1 AND {} = ?2
             ORDER BY collected ASC, id ASC LIMIT 1",
            card_column(card.game()),
        );
        let row = sqlx::query(&select)
            .bind(list_id)
            .bind(card.card_id())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| BinderError::CardNotInList {
                list_id,
                card: card.clone(),
            })?;
        let entry_id: i64 = row.get("id");
        let was_collected: bool = row.get("collected");

        sqlx::query("DELETE FROM list_cards WHERE id = ?1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        let (market_value, collection_value) = read_totals(&mut tx, list_id).await?;
        let market_value = clamp(market_value - price);
        let collection_value = if was_collected {
            clamp(collection_value - price)
        } else {
            collection_value
        };
        write_totals(&mut tx, list_id, market_value, collection_value, true).await?;
        tx.commit().await?;

        info!(list_id, card = %card, price = %price, was_collected, "Card removed from list");
        Ok(())
    }

    /// Increment adds a fresh copy; decrement deletes one.
    pub async fn update_quantity(
        &self,
        list_id: i64,
        card: &CardRef,
        op: QuantityOp,
    ) -> Result<(), BinderError> {
        match op {
            QuantityOp::Increment => self.add_card(list_id, card).await.map(|_| ()),
            QuantityOp::Decrement => self.remove_card(list_id, card).await,
        }
    }

    /// Flip one instance of a card between collected and uncollected.
    ///
    /// Collecting picks an uncollected instance; if none exists the
    /// call fails rather than double-counting an already-collected one.
    pub async fn set_collected(
        &self,
        list_id: i64,
        card: &CardRef,
        desired: bool,
    ) -> Result<(), BinderError> {
        self.get_list(list_id).await?;
        let price = self.pricer.price(card).await?;

        let mut tx = self.pool.begin().await?;
        let select = format!(
            "SELECT id FROM list_cards
             WHERE card_list_id = ?1 AND {} = ?2 AND collected = ?3
             ORDER BY id ASC LIMIT 1",
            card_column(card.game()),
        );
        let row = sqlx::query(&select)
            .bind(list_id)
            .bind(card.card_id())
            .bind(!desired)
            .fetch_optional(&mut *tx)
            .await?;
        let entry_id: i64 = match row {
            Some(row) => row.get("id"),
            None if desired => return Err(BinderError::NothingToCollect),
            None => return Err(BinderError::NothingToUncollect),
        };

        sqlx::query("UPDATE list_cards SET collected = ?1 WHERE id = ?2")
            .bind(desired)
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        let (market_value, collection_value) = read_totals(&mut tx, list_id).await?;
        let collection_value = if desired {
            clamp(collection_value + price)
        } else {
            clamp(collection_value - price)
        };
        write_totals(&mut tx, list_id, market_value, collection_value, true).await?;
        tx.commit().await?;

        info!(list_id, card = %card, collected = desired, price = %price, "Collection flag updated");
        Ok(())
    }

    // -- Full recompute ---------------------------------------------------

    /// Read a list with totals recomputed from every membership row.
    ///
    /// The recomputed totals (and per-row price snapshots) overwrite
    /// the stored values before returning, making every read
    /// self-healing against incremental drift.
    pub async fn get_with_valuation(
        &self,
        list_id: i64,
    ) -> Result<ListWithValuation, BinderError> {
        let mut list = self.get_list(list_id).await?;

        // Pricing goes through the catalog, which shares the pool, so
        // it cannot run inside the write transaction. A mutation can
        // therefore commit between the row read and the totals write;
        // the snapshot is re-checked inside the transaction and the
        // whole recompute retried when that happens, so the write never
        // clobbers a concurrent change or clears its flag.
        loop {
            let rows = sqlx::query(
                "SELECT id, card_list_id, pokemon_card_id, yugioh_card_id,
                        mtg_card_id, lorcana_card_id, collected, cached_market_value
                 FROM list_cards WHERE card_list_id = ?1 ORDER BY id",
            )
            .bind(list_id)
            .fetch_all(&self.pool)
            .await?;

            let mut entries = Vec::with_capacity(rows.len());
            let mut market_value = Decimal::ZERO;
            let mut collection_value = Decimal::ZERO;
            for row in &rows {
                let entry = entry_from_row(row)?;
                let price = self.pricer.price(&entry.card).await?;
                market_value += price;
                if entry.collected {
                    collection_value += price;
                }
                entries.push(ValuedEntry { entry, price });
            }
            let market_value = clamp(market_value);
            let collection_value = clamp(collection_value);

            let mut tx = self.pool.begin().await?;
            let current = membership_snapshot(&mut tx, list_id).await?;
            let priced: Vec<(i64, bool)> = entries
                .iter()
                .map(|v| (v.entry.id, v.entry.collected))
                .collect();
            if current != priced {
                debug!(list_id, "Membership changed during recompute; retrying");
                continue;
            }

            for valued in &mut entries {
                sqlx::query("UPDATE list_cards SET cached_market_value = ?1 WHERE id = ?2")
                    .bind(money(valued.price))
                    .bind(valued.entry.id)
                    .execute(&mut *tx)
                    .await?;
                valued.entry.cached_market_value = valued.price;
            }
            write_totals(&mut tx, list_id, market_value, collection_value, false).await?;
            tx.commit().await?;

            debug!(
                list_id,
                market_value = %market_value,
                collection_value = %collection_value,
                cards = entries.len(),
                "List totals recomputed"
            );

            list.market_value = market_value;
            list.collection_value = collection_value;
            list.needs_update = false;
            return Ok(ListWithValuation { list, entries });
        }
    }

    /// Recompute every list flagged `needs_update`. Idempotent; safe to
    /// retry; no ordering requirement between lists.
    pub async fn revalue_flagged(&self) -> Result<usize, BinderError> {
        let ids: Vec<i64> = sqlx::query("SELECT id FROM card_lists WHERE needs_update = 1")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get("id"))
            .collect();

        for id in &ids {
            self.get_with_valuation(*id).await?;
        }
        if !ids.is_empty() {
            info!(count = ids.len(), "Revalued flagged lists");
        }
        Ok(ids.len())
    }
}

// ---------------------------------------------------------------------------
// Row mapping & money helpers
// ---------------------------------------------------------------------------

fn card_column(game: GameType) -> &'static str {
    match game {
        GameType::Pokemon => "pokemon_card_id",
        GameType::Yugioh => "yugioh_card_id",
        GameType::Mtg => "mtg_card_id",
        GameType::Lorcana => "lorcana_card_id",
    }
}

/// Canonical storage form: 2-dp decimal string.
fn money(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

/// Stored values are written by `money`; anything unparseable reads as
/// zero, matching the priced-at-zero policy for bad data.
fn parse_money(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or(Decimal::ZERO)
}

fn clamp(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

fn list_from_row(row: &SqliteRow) -> CardList {
    let created_on: String = row.get("created_on");
    CardList {
        id: row.get("id"),
        created_by: row.get("created_by"),
        created_on: DateTime::parse_from_rfc3339(&created_on)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        name: row.get("name"),
        kind: row.get("kind"),
        market_value: parse_money(&row.get::<String, _>("market_value")),
        collection_value: parse_money(&row.get::<String, _>("collection_value")),
        needs_update: row.get("needs_update"),
    }
}

/// Decode a membership row, enforcing the exactly-one-card invariant.
fn entry_from_row(row: &SqliteRow) -> Result<ListEntry, BinderError> {
    let id: i64 = row.get("id");
    let columns = [
        (GameType::Pokemon, "pokemon_card_id"),
        (GameType::Yugioh, "yugioh_card_id"),
        (GameType::Mtg, "mtg_card_id"),
        (GameType::Lorcana, "lorcana_card_id"),
    ];

    let mut card: Option<CardRef> = None;
    for (game, column) in columns {
        if let Some(card_id) = row.get::<Option<String>, _>(column) {
            if card.replace(CardRef::new(game, card_id)).is_some() {
                return Err(BinderError::CorruptMembership(id));
            }
        }
    }
    let card = card.ok_or(BinderError::CorruptMembership(id))?;

    Ok(ListEntry {
        id,
        list_id: row.get("card_list_id"),
        card,
        collected: row.get("collected"),
        cached_market_value: parse_money(&row.get::<String, _>("cached_market_value")),
    })
}

/// The `(id, collected)` pairs a recompute's totals were derived from;
/// any membership or collection change alters this.
async fn membership_snapshot(
    tx: &mut Transaction<'_, Sqlite>,
    list_id: i64,
) -> Result<Vec<(i64, bool)>, BinderError> {
    let rows = sqlx::query(
        "SELECT id, collected FROM list_cards WHERE card_list_id = ?1 ORDER BY id",
    )
    .bind(list_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.get("id"), row.get("collected")))
        .collect())
}

async fn read_totals(
    tx: &mut Transaction<'_, Sqlite>,
    list_id: i64,
) -> Result<(Decimal, Decimal), BinderError> {
    let row = sqlx::query("SELECT market_value, collection_value FROM card_lists WHERE id = ?1")
        .bind(list_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(BinderError::ListNotFound(list_id))?;
    Ok((
        parse_money(&row.get::<String, _>("market_value")),
        parse_money(&row.get::<String, _>("collection_value")),
    ))
}

async fn write_totals(
    tx: &mut Transaction<'_, Sqlite>,
    list_id: i64,
    market_value: Decimal,
    collection_value: Decimal,
    needs_update: bool,
) -> Result<(), BinderError> {
    sqlx::query(
        "UPDATE card_lists
         SET market_value = ?1, collection_value = ?2, needs_update = ?3
         WHERE id = ?4",
    )
    .bind(money(market_value))
    .bind(money(collection_value))
    .bind(needs_update)
    .bind(list_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
