//! Pricing — one canonical price per card.
//!
//! `CardPricer` composes the per-game sample extraction with the
//! IQR-trimmed mean. Missing pricing data degrades to 0.00 rather than
//! erroring; catalog/storage faults bubble up to the caller.

pub mod average;
pub mod extract;

pub use average::robust_average;
pub use extract::extract_samples;

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::Catalog;
use crate::types::{BinderError, CardPriceFacts, CardRef};

/// Computes a single representative price for a card.
///
/// Holds the catalog as an explicit dependency; there is no ambient
/// global card store.
#[derive(Clone)]
pub struct CardPricer {
    catalog: Arc<dyn Catalog>,
}

impl CardPricer {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Price already-fetched facts. Total: worst case 0.00.
    pub fn price_facts(facts: &CardPriceFacts) -> Decimal {
        robust_average(&extract_samples(facts))
    }

    /// Resolve a card through the catalog and price it.
    ///
    /// A card with no catalog entry or no usable samples is valued at
    /// 0.00 — pricing data being missing is not an error. Storage
    /// faults are.
    pub async fn price(&self, card: &CardRef) -> Result<Decimal, BinderError> {
        match self.catalog.price_facts(card.game(), card.card_id()).await? {
            Some(facts) => Ok(Self::price_facts(&facts)),
            None => {
                debug!(card = %card, "No catalog entry; priced at zero");
                Ok(Decimal::ZERO)
            }
        }
    }

    /// Whether the underlying catalog knows this card at all.
    pub async fn card_exists(&self, card: &CardRef) -> Result<bool, BinderError> {
        self.catalog.contains(card.game(), card.card_id()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
