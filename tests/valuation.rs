//! End-to-end valuation scenarios against a real in-memory database.
//!
//! Each test wires the full stack: catalog, pricer, ledger. The HTTP
//! layer is covered by its own router tests.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal_macros::dec;

use binder::catalog::MemoryCatalog;
use binder::ledger::ListStore;
use binder::pricing::CardPricer;
use binder::storage;
use binder::types::{
    BinderError, CardPriceFacts, CardRef, CardmarketPrices, GameType, QuantityOp,
    TcgplayerPrices, VendorQuote,
};

async fn store_with_catalog() -> (ListStore, Arc<MemoryCatalog>) {
    let pool = storage::connect("sqlite::memory:").await.unwrap();
    storage::migrate(&pool).await.unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let store = ListStore::new(pool, CardPricer::new(catalog.clone()));
    (store, catalog)
}

fn mtg_facts(usd: &str) -> CardPriceFacts {
    let mut prices = HashMap::new();
    prices.insert("usd".to_string(), Some(usd.to_string()));
    CardPriceFacts::Mtg { prices }
}

#[tokio::test]
async fn mtg_card_values_list_at_usd_price() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    let outcome = store.add_card(list.id, &card).await.unwrap();

    assert_eq!(outcome.new_card_count, 1);
    assert_eq!(outcome.market_value, dec!(3.00));

    let valued = store.get_with_valuation(list.id).await.unwrap();
    assert_eq!(valued.list.market_value, dec!(3.00));
    assert_eq!(valued.list.collection_value, dec!(0.00));
    assert_eq!(valued.entries.len(), 1);
    assert_eq!(valued.entries[0].price, dec!(3.00));
}

#[tokio::test]
async fn yugioh_vendor_quotes_average_without_outliers() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(
        GameType::Yugioh,
        "46986414",
        CardPriceFacts::Yugioh {
            quotes: vec![VendorQuote {
                cardmarket_price: Some("3.00".into()),
                ebay_price: Some("4.00".into()),
                amazon_price: Some("3.80".into()),
                ..Default::default()
            }],
        },
    );

    let list = store.create_list("Duel", "yugioh", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Yugioh, "46986414");
    let outcome = store.add_card(list.id, &card).await.unwrap();
    assert_eq!(outcome.market_value, dec!(3.60));
}

#[tokio::test]
async fn pokemon_two_samples_average_to_midpoint() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(
        GameType::Pokemon,
        "base1-4",
        CardPriceFacts::Pokemon {
            tcgplayer: Some(TcgplayerPrices {
                trend_price: Some(dec!(10.00)),
                reverse_holo_trend: None,
            }),
            cardmarket: Some(CardmarketPrices {
                average_sell_price: Some(dec!(9.50)),
            }),
        },
    );

    let list = store.create_list("Vintage", "pokemon", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Pokemon, "base1-4");
    let outcome = store.add_card(list.id, &card).await.unwrap();
    assert_eq!(outcome.market_value, dec!(9.75));
}

#[tokio::test]
async fn priceless_card_adds_and_removes_at_exactly_zero() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Lorcana, "TFC-42", CardPriceFacts::Lorcana { cost: None });

    let list = store.create_list("Ink", "lorcana", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Lorcana, "TFC-42");

    let outcome = store.add_card(list.id, &card).await.unwrap();
    assert_eq!(outcome.market_value, dec!(0.00));

    store.remove_card(list.id, &card).await.unwrap();
    let valued = store.get_with_valuation(list.id).await.unwrap();
    assert_eq!(valued.list.market_value, dec!(0.00));
    assert_eq!(valued.list.collection_value, dec!(0.00));
    assert!(valued.entries.is_empty());
}

#[tokio::test]
async fn lorcana_cost_copy_adds_then_removes_to_exactly_zero() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Lorcana, "TFC-7", CardPriceFacts::Lorcana { cost: Some(3) });

    let list = store.create_list("Ink", "lorcana", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Lorcana, "TFC-7");

    let outcome = store.add_card(list.id, &card).await.unwrap();
    assert_eq!(outcome.market_value, dec!(3.00));

    store.remove_card(list.id, &card).await.unwrap();
    let valued = store.get_with_valuation(list.id).await.unwrap();
    assert_eq!(valued.list.market_value, dec!(0.00));
    assert_eq!(valued.list.collection_value, dec!(0.00));
    assert!(valued.entries.is_empty());
}

#[tokio::test]
async fn full_recompute_is_idempotent() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    store.add_card(list.id, &card).await.unwrap();
    store.add_card(list.id, &card).await.unwrap();

    let first = store.get_with_valuation(list.id).await.unwrap();
    let second = store.get_with_valuation(list.id).await.unwrap();

    assert_eq!(first.list.market_value, second.list.market_value);
    assert_eq!(first.list.collection_value, second.list.collection_value);
    assert_eq!(second.list.market_value, dec!(6.00));
    assert!(!second.list.needs_update);
}

#[tokio::test]
async fn totals_never_go_negative_after_price_rise() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    store.add_card(list.id, &card).await.unwrap();

    // Price rises upstream; removal subtracts the fresh, higher price.
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("5.00"));
    store.remove_card(list.id, &card).await.unwrap();

    let list = store.get_list(list.id).await.unwrap();
    assert_eq!(list.market_value, dec!(0.00));
}

#[tokio::test]
async fn recompute_reconciles_drifted_totals() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));
    catalog.insert(GameType::Mtg, "ponder", mtg_facts("2.00"));

    let list = store.create_list("Mixed", "mtg", "pierre").await.unwrap();
    let bolt = CardRef::new(GameType::Mtg, "bolt");
    let ponder = CardRef::new(GameType::Mtg, "ponder");
    store.add_card(list.id, &bolt).await.unwrap();
    store.add_card(list.id, &ponder).await.unwrap();

    // Incremental totals were built from the old prices.
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("10.00"));

    let valued = store.get_with_valuation(list.id).await.unwrap();
    assert_eq!(valued.list.market_value, dec!(12.00));
    for entry in &valued.entries {
        assert_eq!(entry.entry.cached_market_value, entry.price);
    }
}

#[tokio::test]
async fn collecting_twice_fails_and_leaves_value_untouched() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    store.add_card(list.id, &card).await.unwrap();

    store.set_collected(list.id, &card, true).await.unwrap();
    let after_first = store.get_list(list.id).await.unwrap();
    assert_eq!(after_first.collection_value, dec!(3.00));

    let err = store.set_collected(list.id, &card, true).await.unwrap_err();
    assert!(matches!(err, BinderError::NothingToCollect));

    let after_second = store.get_list(list.id).await.unwrap();
    assert_eq!(after_second.collection_value, dec!(3.00));
}

#[tokio::test]
async fn decrement_removes_an_uncollected_copy_first() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    store.add_card(list.id, &card).await.unwrap();
    store.add_card(list.id, &card).await.unwrap();
    store.set_collected(list.id, &card, true).await.unwrap();

    store
        .update_quantity(list.id, &card, QuantityOp::Decrement)
        .await
        .unwrap();

    let valued = store.get_with_valuation(list.id).await.unwrap();
    assert_eq!(valued.entries.len(), 1);
    assert!(valued.entries[0].entry.collected);
    assert_eq!(valued.list.collection_value, dec!(3.00));
}

#[tokio::test]
async fn revaluation_pass_clears_flagged_lists() {
    let (store, catalog) = store_with_catalog().await;
    catalog.insert(GameType::Mtg, "bolt", mtg_facts("3.00"));

    let list = store.create_list("Burn", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "bolt");
    store.add_card(list.id, &card).await.unwrap();

    assert_eq!(store.revalue_flagged().await.unwrap(), 1);
    assert_eq!(store.revalue_flagged().await.unwrap(), 0);

    let list = store.get_list(list.id).await.unwrap();
    assert!(!list.needs_update);
}

#[tokio::test]
async fn adding_unknown_card_is_rejected() {
    let (store, _catalog) = store_with_catalog().await;
    let list = store.create_list("Empty", "mtg", "pierre").await.unwrap();
    let card = CardRef::new(GameType::Mtg, "does-not-exist");

    let err = store.add_card(list.id, &card).await.unwrap_err();
    assert!(matches!(err, BinderError::CardNotFound { .. }));
}
