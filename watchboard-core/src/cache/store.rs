//! Cache document persistence.
//!
//! Layout: one JSON file `{ "data": { <key>: [record, ...] }, "last_updated": "..." }`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Legacy documents that are a bare key → records map are accepted on load
//! - Corrupt files are quarantined as `{file}.quarantined` and the cache starts empty

use crate::domain::CategoryRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub type Entries = BTreeMap<String, Vec<CategoryRecord>>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("persist cache {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
}

/// Borrowed view used for writing, so a snapshot is never cloned to save it.
#[derive(Serialize)]
struct DocumentRef<'a> {
    data: &'a Entries,
    last_updated: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Current { data: Entries, last_updated: String },
    Legacy(Entries),
}

/// Contents read back from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDocument {
    pub entries: Entries,
    pub last_updated: Option<String>,
}

/// The on-disk cache file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file yields an empty document; an
    /// unreadable or corrupt one is quarantined and also yields empty.
    pub fn load(&self) -> LoadedDocument {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no cache file, starting empty");
            return LoadedDocument::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<StoredDocument>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(StoredDocument::Current { data, last_updated }) => {
                info!(entries = data.len(), "cache loaded");
                LoadedDocument {
                    entries: data,
                    last_updated: Some(last_updated),
                }
            }
            Ok(StoredDocument::Legacy(data)) => {
                info!(entries = data.len(), "cache loaded (legacy format)");
                LoadedDocument {
                    entries: data,
                    last_updated: None,
                }
            }
            Err(e) => {
                let quarantine = self.quarantine_path();
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "quarantining unreadable cache file"
                );
                let _ = fs::rename(&self.path, &quarantine);
                LoadedDocument::default()
            }
        }
    }

    /// Write the whole document atomically.
    pub fn save(&self, entries: &Entries, last_updated: &str) -> Result<(), CacheError> {
        let persist_err = |reason: String| CacheError::Persist {
            path: self.path.clone(),
            reason,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| persist_err(format!("create dir: {e}")))?;
        }

        let doc = DocumentRef {
            data: entries,
            last_updated,
        };
        let json = serde_json::to_vec(&doc).map_err(|e| persist_err(format!("serialize: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| persist_err(format!("write: {e}")))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            persist_err(format!("atomic rename failed: {e}"))
        })?;

        info!(entries = entries.len(), "cache saved");
        Ok(())
    }

    pub(crate) fn save_logged(&self, entries: &Entries, last_updated: &str) -> Result<(), CacheError> {
        self.save(entries, last_updated).map_err(|e| {
            error!(error = %e, "cache write failed; in-memory state remains authoritative");
            e
        })
    }

    fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".quarantined");
        self.path.with_file_name(name)
    }
}

/// Cache-wide timestamp, US Central time: `MM/DD HH:MM AM CT`.
pub fn central_time_stamp() -> String {
    Utc::now()
        .with_timezone(&chrono_tz::US::Central)
        .format("%m/%d %I:%M %p CT")
        .to_string()
}
