//! Cache key scheme.
//!
//! Equity categories live under `stocks:<category>`, fund categories under
//! `funds:<category>`. The `Owned` pseudo-category is always `stocks:Owned`.

use crate::domain::{SortPolicy, OWNED_CATEGORY};
use std::collections::HashSet;

const STOCKS: &str = "stocks";
const FUNDS: &str = "funds";

#[derive(Debug, Clone, Default)]
pub struct KeyScheme {
    fund_categories: HashSet<String>,
}

impl KeyScheme {
    pub fn new<I, S>(fund_categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fund_categories: fund_categories
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .collect(),
        }
    }

    pub fn key_for(&self, category: &str) -> String {
        let category = category.trim();
        let namespace = if self.fund_categories.contains(category) {
            FUNDS
        } else {
            STOCKS
        };
        format!("{namespace}:{category}")
    }

    pub fn owned_key(&self) -> String {
        format!("{STOCKS}:{OWNED_CATEGORY}")
    }

    /// Category name encoded in a key, if the key follows the scheme.
    pub fn category_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix("stocks:")
            .or_else(|| key.strip_prefix("funds:"))
    }

    /// Sort policy for the list stored under `key`.
    pub fn sort_policy(&self, key: &str) -> SortPolicy {
        SortPolicy::for_category(self.category_of(key).unwrap_or(key))
    }
}
