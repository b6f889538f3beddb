//! Caller-facing facade: watchlist + assembler + cache.

use crate::assembler::{AssembleError, CategoryAssembler};
use crate::cache::{CacheEntry, CacheStore, KeyScheme, StagedCache};
use crate::config::WatchboardConfig;
use crate::data::{SeriesProvider, WatchlistError, WatchlistSource};
use crate::refresh::{RefreshDriver, RefreshError, RefreshSummary};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Watchlist(#[from] WatchlistError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("symbol {0} is not on the watchlist")]
    UnknownSymbol(String),
}

/// Result of a flag toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    /// Category the symbol is listed under.
    pub origin: String,
    /// Whether any cached record was updated. False when the symbol has not
    /// been fetched yet; the next build picks the flag up from the watchlist.
    pub cached: bool,
}

pub struct Dashboard {
    cache: StagedCache,
    assembler: CategoryAssembler,
    watchlist: Box<dyn WatchlistSource>,
    categories: Vec<String>,
}

impl Dashboard {
    pub fn new(
        cache: StagedCache,
        assembler: CategoryAssembler,
        watchlist: Box<dyn WatchlistSource>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            cache,
            assembler,
            watchlist,
            categories,
        }
    }

    /// Wire everything from configuration.
    pub fn from_config(
        config: &WatchboardConfig,
        provider: Arc<dyn SeriesProvider>,
        watchlist: Box<dyn WatchlistSource>,
    ) -> Self {
        let cache = StagedCache::open(
            CacheStore::new(&config.cache_file),
            KeyScheme::new(&config.fund_categories),
        );
        let assembler =
            CategoryAssembler::new(provider, config.indicators, config.provider.clone());
        Self::new(cache, assembler, watchlist, config.categories.clone())
    }

    pub fn cache(&self) -> &StagedCache {
        &self.cache
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Records for `category`.
    ///
    /// Served from the cache unless `refresh` is set or nothing is cached;
    /// otherwise built now and written through to the cache.
    pub fn category(&self, name: &str, refresh: bool) -> Result<CacheEntry, DashboardError> {
        let key = self.cache.keys().key_for(name);
        if !refresh {
            if let Some(entry) = self.cache.get(&key) {
                debug!(%key, "served from cache");
                return Ok(entry);
            }
        }

        let watchlist = self.watchlist.load()?;
        let records = self.assembler.build(name.trim(), &watchlist)?;
        // A failed write is logged by the cache; the fresh records are still served.
        let _ = self.cache.set(key, records.clone());
        Ok(CacheEntry {
            records,
            last_updated: self.cache.last_updated(),
        })
    }

    /// Refresh every configured category as one generation.
    pub fn refresh_all(&self) -> Result<RefreshSummary, DashboardError> {
        let watchlist = self.watchlist.load()?;
        let summary = RefreshDriver::new(&self.cache, &self.assembler).run(&self.categories, &watchlist)?;
        Ok(summary)
    }

    /// Toggle ownership: persist it to the watchlist, then move cached records.
    pub fn update_flag(&self, symbol: &str, flag: bool) -> Result<FlagChange, DashboardError> {
        let symbol = symbol.trim();
        let origin = self
            .watchlist
            .set_flag(symbol, flag)?
            .ok_or_else(|| DashboardError::UnknownSymbol(symbol.to_string()))?;
        let cached = self.cache.update_flag(symbol, flag);
        info!(symbol, flag, %origin, cached, "ownership updated");
        Ok(FlagChange { origin, cached })
    }
}
