//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub revaluer: RevaluerConfig,
    pub ingest: IngestConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevaluerConfig {
    /// How often flagged lists are re-totalled.
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Pull card catalogs from the upstream APIs on startup.
    pub run_on_startup: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub pokemon: PokemonSourceConfig,
    pub yugioh: SourceConfig,
    pub mtg: SourceConfig,
    pub lorcana: SourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PokemonSourceConfig {
    pub enabled: bool,
    /// Env var holding the pokemontcg.io API key. Optional; the API
    /// works unauthenticated at a lower rate limit.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub enabled: bool,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
