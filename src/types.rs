//! Shared types for the BINDER tracker.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that catalog, pricing, ledger
//! and server modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Game type
// ---------------------------------------------------------------------------

/// The four supported trading card games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Pokemon,
    Yugioh,
    Mtg,
    Lorcana,
}

impl GameType {
    /// All known games (useful for iteration).
    pub const ALL: &'static [GameType] = &[
        GameType::Pokemon,
        GameType::Yugioh,
        GameType::Mtg,
        GameType::Lorcana,
    ];

    /// Wire/database tag for this game.
    pub fn tag(&self) -> &'static str {
        match self {
            GameType::Pokemon => "pokemon",
            GameType::Yugioh => "yugioh",
            GameType::Mtg => "mtg",
            GameType::Lorcana => "lorcana",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Attempt to parse a string into a GameType (case-insensitive).
/// Unknown tags are a client error, not a pricing concern.
impl std::str::FromStr for GameType {
    type Err = BinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pokemon" | "pokémon" => Ok(GameType::Pokemon),
            "yugioh" | "yu-gi-oh!" | "yu-gi-oh" => Ok(GameType::Yugioh),
            "mtg" | "magic" => Ok(GameType::Mtg),
            "lorcana" => Ok(GameType::Lorcana),
            other => Err(BinderError::InvalidCardType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Card reference
// ---------------------------------------------------------------------------

/// A reference to exactly one card in exactly one game's catalog.
///
/// The persisted membership row has four nullable card-id columns; this
/// sum type is the in-memory shape, making "no card" or "two cards"
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "game", content = "card_id", rename_all = "lowercase")]
pub enum CardRef {
    Pokemon(String),
    Yugioh(String),
    Mtg(String),
    Lorcana(String),
}

impl CardRef {
    pub fn new(game: GameType, card_id: impl Into<String>) -> Self {
        let id = card_id.into();
        match game {
            GameType::Pokemon => CardRef::Pokemon(id),
            GameType::Yugioh => CardRef::Yugioh(id),
            GameType::Mtg => CardRef::Mtg(id),
            GameType::Lorcana => CardRef::Lorcana(id),
        }
    }

    pub fn game(&self) -> GameType {
        match self {
            CardRef::Pokemon(_) => GameType::Pokemon,
            CardRef::Yugioh(_) => GameType::Yugioh,
            CardRef::Mtg(_) => GameType::Mtg,
            CardRef::Lorcana(_) => GameType::Lorcana,
        }
    }

    pub fn card_id(&self) -> &str {
        match self {
            CardRef::Pokemon(id)
            | CardRef::Yugioh(id)
            | CardRef::Mtg(id)
            | CardRef::Lorcana(id) => id,
        }
    }
}

impl fmt::Display for CardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.game(), self.card_id())
    }
}

// ---------------------------------------------------------------------------
// Price facts
// ---------------------------------------------------------------------------

/// Pokémon TCGplayer price block (pokemontcg.io shape, one finish merged).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgplayerPrices {
    #[serde(default)]
    pub trend_price: Option<Decimal>,
    #[serde(default)]
    pub reverse_holo_trend: Option<Decimal>,
}

/// Pokémon Cardmarket price block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardmarketPrices {
    #[serde(default)]
    pub average_sell_price: Option<Decimal>,
}

/// One Yu-Gi-Oh! vendor price quote row. Upstream delivers these as
/// decimal strings; empty or absent vendors are simply skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorQuote {
    #[serde(default)]
    pub cardmarket_price: Option<String>,
    #[serde(default)]
    pub tcgplayer_price: Option<String>,
    #[serde(default)]
    pub ebay_price: Option<String>,
    #[serde(default)]
    pub amazon_price: Option<String>,
    #[serde(default)]
    pub coolstuffinc_price: Option<String>,
}

/// Read-only projection of a catalog card sufficient to price it.
/// The catalog owns this data; the pricer borrows it and never mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum CardPriceFacts {
    Pokemon {
        tcgplayer: Option<TcgplayerPrices>,
        cardmarket: Option<CardmarketPrices>,
    },
    Yugioh {
        quotes: Vec<VendorQuote>,
    },
    /// Scryfall-style map keyed by currency/finish; values are nullable
    /// decimal strings. Only "usd" is ever consulted.
    Mtg {
        prices: HashMap<String, Option<String>>,
    },
    /// Lorcana has no market price source; ink cost is the proxy.
    Lorcana {
        cost: Option<u32>,
    },
}

impl CardPriceFacts {
    pub fn game(&self) -> GameType {
        match self {
            CardPriceFacts::Pokemon { .. } => GameType::Pokemon,
            CardPriceFacts::Yugioh { .. } => GameType::Yugioh,
            CardPriceFacts::Mtg { .. } => GameType::Mtg,
            CardPriceFacts::Lorcana { .. } => GameType::Lorcana,
        }
    }
}

// ---------------------------------------------------------------------------
// Lists & memberships
// ---------------------------------------------------------------------------

/// A user-created named collection of card references with aggregate
/// value fields. `kind` is an informational game tag, not enforced
/// against membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardList {
    pub id: i64,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    pub name: String,
    pub kind: String,
    pub market_value: Decimal,
    pub collection_value: Decimal,
    pub needs_update: bool,
}

impl fmt::Display for CardList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) market=${} collected=${}",
            self.id, self.name, self.kind, self.market_value, self.collection_value,
        )
    }
}

/// One physical copy of a card placed into a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: i64,
    pub list_id: i64,
    pub card: CardRef,
    pub collected: bool,
    /// Snapshot of the card's price at the time it was cached. May go
    /// stale; authoritative reads always re-derive it.
    pub cached_market_value: Decimal,
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry#{} list={} {} collected={} cached=${}",
            self.id, self.list_id, self.card, self.collected, self.cached_market_value,
        )
    }
}

/// A membership row with its freshly recomputed price (full-read shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuedEntry {
    #[serde(flatten)]
    pub entry: ListEntry,
    pub price: Decimal,
}

/// A list plus its rows, with totals recomputed at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWithValuation {
    pub list: CardList,
    pub entries: Vec<ValuedEntry>,
}

/// Result of adding a card to a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCardOutcome {
    pub entry_id: i64,
    pub new_card_count: i64,
    pub market_value: Decimal,
}

/// Quantity adjustment direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityOp {
    Increment,
    Decrement,
}

impl std::str::FromStr for QuantityOp {
    type Err = BinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increment" => Ok(QuantityOp::Increment),
            "decrement" => Ok(QuantityOp::Decrement),
            other => Err(BinderError::InvalidOperation(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for BINDER.
#[derive(Debug, thiserror::Error)]
pub enum BinderError {
    #[error("List not found: {0}")]
    ListNotFound(i64),

    #[error("Card not found: {game}:{card_id}")]
    CardNotFound { game: GameType, card_id: String },

    #[error("Card not in list: {card} (list {list_id})")]
    CardNotInList { list_id: i64, card: CardRef },

    #[error("Invalid card type: {0}")]
    InvalidCardType(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Nothing to collect")]
    NothingToCollect,

    #[error("Nothing to uncollect")]
    NothingToUncollect,

    #[error("Corrupt membership row {0}: expected exactly one card reference")]
    CorruptMembership(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BinderError {
    /// Whether this error is the caller's fault (400-class) as opposed
    /// to a missing resource or an internal fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BinderError::InvalidCardType(_)
                | BinderError::InvalidOperation(_)
                | BinderError::NothingToCollect
                | BinderError::NothingToUncollect
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
