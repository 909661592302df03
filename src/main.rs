//! BINDER — multi-game trading card collection tracker.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the database, optionally syncs the card catalogs, serves the
//! REST API, and runs the periodic revaluation loop with graceful
//! shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use binder::catalog::SqliteCatalog;
use binder::config::AppConfig;
use binder::ingest;
use binder::ledger::ListStore;
use binder::pricing::CardPricer;
use binder::server::{spawn_server, ServerState};
use binder::storage;

const BANNER: &str = r#"
 ____ ___ _   _ ____  _____ ____
| __ )_ _| \ | |  _ \| ____|  _ \
|  _ \| ||  \| | | | |  _| | |_) |
| |_) | || |\  | |_| | |___|  _ <
|____/___|_| \_|____/|_____|_| \_\

  Trading Card Collection Tracker
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        database = %cfg.database.url,
        server_port = cfg.server.port,
        revalue_interval_secs = cfg.revaluer.interval_secs,
        "BINDER starting up"
    );

    // -- Database and core services ---------------------------------------

    let pool = storage::connect(&cfg.database.url).await?;
    storage::migrate(&pool).await?;

    let catalog = SqliteCatalog::new(pool.clone());
    let pricer = CardPricer::new(Arc::new(catalog.clone()));
    let store = ListStore::new(pool, pricer);

    // -- Catalog ingestion -------------------------------------------------

    let sources = ingest::enabled_sources(&cfg.catalog)?;
    info!(sources = sources.len(), "Catalog sources enabled");

    if cfg.ingest.run_on_startup {
        info!("Running startup catalog sync");
        ingest::run_sources(&sources, &catalog).await;
    }

    // -- REST API ----------------------------------------------------------

    if cfg.server.enabled {
        spawn_server(
            Arc::new(ServerState {
                store: store.clone(),
            }),
            cfg.server.port,
        )?;
    }

    // -- Revaluation loop --------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.revaluer.interval_secs));
    // First tick fires immediately; skip straight to the steady cadence.
    interval.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.revaluer.interval_secs,
        "Entering revaluation loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match store.revalue_flagged().await {
                    Ok(0) => {}
                    Ok(revalued) => info!(revalued, "Flagged lists revalued"),
                    Err(e) => error!(error = %e, "Revaluation pass failed — continuing"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("BINDER shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("binder=info"));

    let json_logging = std::env::var("BINDER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
