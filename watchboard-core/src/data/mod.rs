//! Market-data providers and the watchlist definition.

pub mod provider;
pub mod watchlist;
pub mod yahoo;

pub use provider::{BarBatch, DataError, Fundamentals, Lookback, SeriesProvider};
pub use watchlist::{Constituent, JsonWatchlist, Watchlist, WatchlistEntry, WatchlistError, WatchlistSource};
pub use yahoo::YahooProvider;
