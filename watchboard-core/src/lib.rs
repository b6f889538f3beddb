//! Watchboard Core: category dashboards of technical indicators over market data.
//!
//! This crate contains:
//! - Domain types (bars, values, category records, sort policy)
//! - Indicator engine (Wilder RSI, ATR and ATR%)
//! - Series providers and the watchlist definition
//! - Category assembly and the staged-commit snapshot cache
//! - Refresh driver and the dashboard facade

pub mod assembler;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod refresh;

pub use assembler::{AssembleError, CategoryAssembler};
pub use cache::{CacheEntry, StagedCache};
pub use config::WatchboardConfig;
pub use dashboard::{Dashboard, DashboardError, FlagChange};
pub use refresh::{RefreshDriver, RefreshError, RefreshSummary};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send_sync<T: Send + Sync>() {}

        require_send_sync::<domain::Bar>();
        require_send_sync::<domain::CategoryRecord>();
        require_send_sync::<cache::StagedCache>();
        require_send_sync::<cache::Snapshot>();
        require_send_sync::<data::DataError>();
        require_send_sync::<assembler::CategoryAssembler>();
        require_send_sync::<dashboard::Dashboard>();
    }
}
