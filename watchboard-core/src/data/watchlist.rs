//! Watchlist definition: category, then industry, then instruments.
//!
//! Stored as JSON:
//!
//! ```json
//! { "Categories": { "Energy": { "Oil & Gas": [ { "symbol": "XOM", "flag": true } ] } } }
//! ```
//!
//! The `Owned` pseudo-category is derived: every entry with `flag = true`,
//! whatever its category. Owned entries still belong to their own category.

use crate::domain::OWNED_CATEGORY;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("read watchlist {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse watchlist {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("write watchlist {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// One instrument as listed in the watchlist file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    #[serde(default)]
    pub flag: bool,
    #[serde(rename = "Name", alias = "name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "stockUrl", default, skip_serializing_if = "Option::is_none")]
    pub stock_url: Option<String>,
    /// Fields this crate does not read, kept so rewrites leave them intact.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A watchlist entry with its category and industry attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Constituent {
    pub symbol: String,
    pub name: Option<String>,
    pub flag: bool,
    pub category: String,
    pub industry: String,
    pub stock_url: Option<String>,
}

/// The complete watchlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    #[serde(rename = "Categories", default)]
    pub categories: BTreeMap<String, BTreeMap<String, Vec<WatchlistEntry>>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Watchlist {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Constituents of `category`, each symbol at most once (first listing wins).
    ///
    /// For `Owned`, every flagged entry across all categories.
    pub fn constituents(&self, category: &str) -> Vec<Constituent> {
        let mut seen = HashSet::new();
        self.iter_constituents()
            .filter(|c| {
                if category == OWNED_CATEGORY {
                    c.flag
                } else {
                    c.category == category
                }
            })
            .filter(|c| seen.insert(c.symbol.clone()))
            .collect()
    }

    /// Set the ownership flag on every listing of `symbol`. Symbols compare
    /// trimmed, the same way constituents are read.
    ///
    /// Returns the origin category, or `None` when the symbol is not listed.
    pub fn set_flag(&mut self, symbol: &str, flag: bool) -> Option<String> {
        let symbol = symbol.trim();
        let mut origin = None;
        for (category, industries) in self.categories.iter_mut() {
            for entry in industries.values_mut().flatten() {
                if entry.symbol.trim() == symbol {
                    entry.flag = flag;
                    origin.get_or_insert_with(|| category.clone());
                }
            }
        }
        origin
    }

    fn iter_constituents(&self) -> impl Iterator<Item = Constituent> + '_ {
        self.categories.iter().flat_map(|(category, industries)| {
            industries.iter().flat_map(move |(industry, entries)| {
                entries.iter().map(move |e| Constituent {
                    symbol: e.symbol.trim().to_string(),
                    name: e.name.clone(),
                    flag: e.flag,
                    category: category.clone(),
                    industry: industry.clone(),
                    stock_url: e.stock_url.clone(),
                })
            })
        })
    }
}

/// Where the watchlist comes from and where flag changes go.
pub trait WatchlistSource: Send + Sync {
    fn load(&self) -> Result<Watchlist, WatchlistError>;

    /// Persist a flag change. Returns the symbol's origin category, or
    /// `None` when the symbol is not listed.
    fn set_flag(&self, symbol: &str, flag: bool) -> Result<Option<String>, WatchlistError>;
}

/// Watchlist backed by a JSON file.
pub struct JsonWatchlist {
    path: PathBuf,
}

impl JsonWatchlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, watchlist: &Watchlist) -> Result<(), WatchlistError> {
        let write_err = |reason: String| WatchlistError::Write {
            path: self.path.clone(),
            reason,
        };
        let json = serde_json::to_string_pretty(watchlist).map_err(|e| write_err(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            write_err(format!("atomic rename failed: {e}"))
        })
    }
}

impl WatchlistSource for JsonWatchlist {
    fn load(&self) -> Result<Watchlist, WatchlistError> {
        let content = fs::read_to_string(&self.path).map_err(|source| WatchlistError::Read {
            path: self.path.clone(),
            source,
        })?;
        Watchlist::from_json(&content).map_err(|source| WatchlistError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn set_flag(&self, symbol: &str, flag: bool) -> Result<Option<String>, WatchlistError> {
        let mut watchlist = self.load()?;
        let origin = watchlist.set_flag(symbol, flag);
        if origin.is_some() {
            self.write(&watchlist)?;
            info!(symbol, flag, "watchlist flag updated");
        }
        Ok(origin)
    }
}

#[cfg(test)]
pub(crate) fn sample_watchlist() -> Watchlist {
    Watchlist::from_json(
        r#"{"Categories": {
            "Energy": {
                "Oil & Gas": [
                    {"symbol": "XOM", "flag": true, "Name": "Exxon"},
                    {"symbol": "CVX"}
                ]
            },
            "Tech": {
                "Software": [{"symbol": "MSFT", "flag": true}, {"symbol": "ORCL"}],
                "Hardware": [{"symbol": "AAPL", "stockUrl": "https://example.com/aapl"}]
            }
        }}"#,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(c: &[Constituent]) -> Vec<&str> {
        c.iter().map(|c| c.symbol.as_str()).collect()
    }

    #[test]
    fn category_constituents_include_owned_entries() {
        let w = sample_watchlist();
        assert_eq!(symbols(&w.constituents("Energy")), vec!["XOM", "CVX"]);
        // BTreeMap order: Hardware before Software
        assert_eq!(symbols(&w.constituents("Tech")), vec!["AAPL", "MSFT", "ORCL"]);
    }

    #[test]
    fn owned_collects_flagged_entries_with_origin() {
        let w = sample_watchlist();
        let owned = w.constituents(OWNED_CATEGORY);
        assert_eq!(symbols(&owned), vec!["XOM", "MSFT"]);
        assert_eq!(owned[0].category, "Energy");
        assert_eq!(owned[1].industry, "Software");
    }

    #[test]
    fn duplicates_collapse_to_first_listing() {
        let w = Watchlist::from_json(
            r#"{"Categories": {"Tech": {
                "A": [{"symbol": "AAPL", "Name": "first"}],
                "B": [{"symbol": "AAPL", "Name": "second"}]
            }}}"#,
        )
        .unwrap();
        let c = w.constituents("Tech");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn unknown_category_is_empty() {
        assert!(sample_watchlist().constituents("Nope").is_empty());
    }

    #[test]
    fn set_flag_reports_origin() {
        let mut w = sample_watchlist();
        assert_eq!(w.set_flag("ORCL", true).as_deref(), Some("Tech"));
        assert!(w.constituents(OWNED_CATEGORY).iter().any(|c| c.symbol == "ORCL"));
        assert_eq!(w.set_flag("NOPE", true), None);
    }

    #[test]
    fn set_flag_matches_padded_symbols() {
        let mut w = Watchlist::from_json(
            r#"{"Categories": {"Tech": {"Hardware": [{"symbol": " AAPL "}]}}}"#,
        )
        .unwrap();
        assert_eq!(w.set_flag("AAPL", true).as_deref(), Some("Tech"));
        assert_eq!(symbols(&w.constituents(OWNED_CATEGORY)), vec!["AAPL"]);
        assert_eq!(w.set_flag(" AAPL", false).as_deref(), Some("Tech"));
        assert!(w.constituents(OWNED_CATEGORY).is_empty());
    }

    #[test]
    fn flag_rewrite_keeps_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list_watchlist.json");
        fs::write(
            &path,
            r#"{"version": 3, "Categories": {"Energy": {"Oil & Gas": [
                {"symbol": "CVX", "tags": ["dividend", "large-cap"], "note": "watch Q3"}
            ]}}}"#,
        )
        .unwrap();

        let source = JsonWatchlist::new(&path);
        assert_eq!(source.set_flag("CVX", true).unwrap().as_deref(), Some("Energy"));

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &written["Categories"]["Energy"]["Oil & Gas"][0];
        assert_eq!(entry["flag"], serde_json::json!(true));
        assert_eq!(entry["tags"], serde_json::json!(["dividend", "large-cap"]));
        assert_eq!(entry["note"], serde_json::json!("watch Q3"));
        assert_eq!(written["version"], serde_json::json!(3));
    }

    #[test]
    fn json_watchlist_persists_flag_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list_watchlist.json");
        fs::write(&path, serde_json::to_string(&sample_watchlist()).unwrap()).unwrap();

        let source = JsonWatchlist::new(&path);
        assert_eq!(source.set_flag("CVX", true).unwrap().as_deref(), Some("Energy"));

        let reloaded = source.load().unwrap();
        let owned = reloaded.constituents(OWNED_CATEGORY);
        assert!(owned.iter().any(|c| c.symbol == "CVX"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let source = JsonWatchlist::new("/nonexistent/list_watchlist.json");
        assert!(matches!(source.load(), Err(WatchlistError::Read { .. })));
    }
}
