//! Catalog ingestion — pulls card metadata and price facts from the
//! upstream TCG APIs into the local catalog tables.
//!
//! Each game has its own client implementing `CatalogSource`. A failed
//! source is logged and skipped; the others still run.

pub mod lorcana;
pub mod mtg;
pub mod pokemon;
pub mod yugioh;

pub use lorcana::LorcanaSource;
pub use mtg::MtgSource;
pub use pokemon::PokemonSource;
pub use yugioh::YugiohSource;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::catalog::SqliteCatalog;
use crate::config::CatalogConfig;
use crate::types::GameType;

/// Outcome of one source's sync run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub game: GameType,
    pub cards_upserted: usize,
    pub pages_fetched: usize,
}

/// One upstream card-catalog API.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn game(&self) -> GameType;

    /// Pull the full catalog from upstream and upsert it locally.
    async fn sync(&self, catalog: &SqliteCatalog) -> Result<IngestReport>;
}

/// Build the enabled sources from config.
pub fn enabled_sources(cfg: &CatalogConfig) -> Result<Vec<Box<dyn CatalogSource>>> {
    let mut sources: Vec<Box<dyn CatalogSource>> = Vec::new();

    if cfg.pokemon.enabled {
        // A missing key just means the lower unauthenticated rate limit.
        let api_key = cfg
            .pokemon
            .api_key_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .map(SecretString::new);
        sources.push(Box::new(PokemonSource::new(api_key)?));
    }
    if cfg.yugioh.enabled {
        sources.push(Box::new(YugiohSource::new()?));
    }
    if cfg.mtg.enabled {
        sources.push(Box::new(MtgSource::new()?));
    }
    if cfg.lorcana.enabled {
        sources.push(Box::new(LorcanaSource::new()?));
    }

    Ok(sources)
}

/// Run every source against the catalog, continuing past failures.
pub async fn run_sources(
    sources: &[Box<dyn CatalogSource>],
    catalog: &SqliteCatalog,
) -> Vec<IngestReport> {
    let mut reports = Vec::new();
    for source in sources {
        match source.sync(catalog).await {
            Ok(report) => {
                info!(
                    game = source.game().tag(),
                    cards = report.cards_upserted,
                    pages = report.pages_fetched,
                    "Catalog sync complete"
                );
                reports.push(report);
            }
            Err(e) => {
                warn!(game = source.game().tag(), error = %e, "Catalog sync failed, continuing");
            }
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, PokemonSourceConfig, SourceConfig};

    #[test]
    fn test_enabled_sources_respects_flags() {
        let cfg = CatalogConfig {
            pokemon: PokemonSourceConfig {
                enabled: false,
                api_key_env: None,
            },
            yugioh: SourceConfig { enabled: true },
            mtg: SourceConfig { enabled: true },
            lorcana: SourceConfig { enabled: false },
        };

        let sources = enabled_sources(&cfg).unwrap();
        let games: Vec<GameType> = sources.iter().map(|s| s.game()).collect();
        assert_eq!(games, vec![GameType::Yugioh, GameType::Mtg]);
    }
}
