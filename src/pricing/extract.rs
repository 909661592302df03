//! Per-game extraction of candidate price samples.
//!
//! Pure projection from catalog price facts to numeric samples. Absent,
//! empty, malformed or negative fields are skipped, never an error:
//! partial vendor data is the norm, not the exception.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::types::CardPriceFacts;

/// Extract every usable price sample from a card's price facts.
///
/// The sample count is small (a handful per vendor source); order is
/// irrelevant. An empty result means the card has no usable pricing
/// data and will be valued at 0.00 downstream.
pub fn extract_samples(facts: &CardPriceFacts) -> Vec<Decimal> {
    let mut samples = Vec::new();

    match facts {
        CardPriceFacts::Pokemon { tcgplayer, cardmarket } => {
            if let Some(t) = tcgplayer {
                push_decimal(&mut samples, t.trend_price);
                push_decimal(&mut samples, t.reverse_holo_trend);
            }
            if let Some(c) = cardmarket {
                push_decimal(&mut samples, c.average_sell_price);
            }
        }
        CardPriceFacts::Yugioh { quotes } => {
            // A card can carry several quote rows, so the sample count
            // may exceed the five named vendors.
            for quote in quotes {
                push_parsed(&mut samples, quote.cardmarket_price.as_deref());
                push_parsed(&mut samples, quote.tcgplayer_price.as_deref());
                push_parsed(&mut samples, quote.ebay_price.as_deref());
                push_parsed(&mut samples, quote.amazon_price.as_deref());
                push_parsed(&mut samples, quote.coolstuffinc_price.as_deref());
            }
        }
        CardPriceFacts::Mtg { prices } => {
            if let Some(Some(usd)) = prices.get("usd") {
                push_parsed(&mut samples, Some(usd));
            }
        }
        CardPriceFacts::Lorcana { cost } => {
            if let Some(cost) = cost {
                samples.push(Decimal::from(*cost));
            }
        }
    }

    samples
}

fn push_decimal(samples: &mut Vec<Decimal>, value: Option<Decimal>) {
    if let Some(v) = value {
        if v >= Decimal::ZERO {
            samples.push(v);
        }
    }
}

fn push_parsed(samples: &mut Vec<Decimal>, value: Option<&str>) {
    if let Some(raw) = value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Ok(v) = Decimal::from_str(trimmed) {
            if v >= Decimal::ZERO {
                samples.push(v);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
