//! Full refresh cycle: stage every category, then commit once.

use crate::assembler::{AssembleError, CategoryAssembler};
use crate::cache::StagedCache;
use crate::data::Watchlist;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    /// The provider throttled us; the cycle was aborted and Live is unchanged.
    #[error("refresh aborted after {staged} categories: {source}")]
    RateLimited {
        staged: usize,
        #[source]
        source: AssembleError,
    },

    /// Every category was built but nothing was staged, so Live is unchanged.
    #[error("refresh produced no entries; live data kept")]
    NothingStaged,
}

/// Outcome of a committed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    /// Categories staged, in refresh order.
    pub categories: Vec<String>,
    pub records: usize,
    pub elapsed: Duration,
}

/// Drives one refresh cycle across a fixed category list.
pub struct RefreshDriver<'a> {
    cache: &'a StagedCache,
    assembler: &'a CategoryAssembler,
}

impl<'a> RefreshDriver<'a> {
    pub fn new(cache: &'a StagedCache, assembler: &'a CategoryAssembler) -> Self {
        Self { cache, assembler }
    }

    /// Build and stage each category, then publish them as one generation.
    ///
    /// Empty categories are staged too, so the new generation says
    /// "nothing listed" rather than keeping a stale list.
    pub fn run(&self, categories: &[String], watchlist: &Watchlist) -> Result<RefreshSummary, RefreshError> {
        let started = Instant::now();
        info!(
            provider = self.assembler.provider_name(),
            categories = categories.len(),
            "refresh starting"
        );
        self.cache.start_refresh();

        let mut staged = Vec::with_capacity(categories.len());
        let mut records = 0;
        for category in categories {
            let built = match self.assembler.build(category, watchlist) {
                Ok(built) => built,
                Err(source) => {
                    warn!(%category, error = %source, "aborting refresh");
                    self.cache.abort_refresh();
                    return Err(RefreshError::RateLimited {
                        staged: staged.len(),
                        source,
                    });
                }
            };
            records += built.len();
            let key = self.cache.keys().key_for(category);
            // Staging writes never persist, so they cannot fail.
            let _ = self.cache.set(key, built);
            staged.push(category.clone());
        }

        if !self.cache.commit_refresh() {
            self.cache.abort_refresh();
            return Err(RefreshError::NothingStaged);
        }

        let summary = RefreshSummary {
            categories: staged,
            records,
            elapsed: started.elapsed(),
        };
        info!(
            provider = self.assembler.provider_name(),
            categories = summary.categories.len(),
            records = summary.records,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "refresh committed"
        );
        Ok(summary)
    }
}
