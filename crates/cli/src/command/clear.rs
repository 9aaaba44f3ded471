use anyhow::Result;
use grip_config::Config;
use grip_core::{AssetManager, HttpFetcher, VERSION};
use std::sync::Arc;

/// Clears the cached styles and assets.
pub fn run(config: &Config) -> Result<()> {
    let assets = AssetManager::new(
        config.cache_path(VERSION),
        Vec::new(),
        Arc::new(HttpFetcher::default()),
    );

    assets.clear()?;

    if let Some(cache_path) = assets.cache_path() {
        tracing::info!(cache_path = %cache_path.display(), "Cache cleared");
    }

    Ok(())
}
