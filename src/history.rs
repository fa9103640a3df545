//! Search history: newest-first, capped, with favorites and tags. The
//! original kept this in browser storage; here an optional JSON file plays
//! that role, loaded leniently (missing or corrupt files start empty) and
//! saved best-effort after every mutation.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::cache::now_ms;
use crate::item::slugify;

/// Most-recent entries kept; older ones fall off the end.
pub const DEFAULT_CAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: String,
    pub query: String,
    pub ts_ms: u64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub struct SearchHistory {
    inner: Mutex<Vec<SearchRecord>>,
    cap: usize,
    path: Option<PathBuf>,
}

impl SearchHistory {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            cap: cap.max(1),
            path: None,
        }
    }

    /// Load from a JSON file; any read or parse error yields an empty
    /// history backed by that path.
    pub fn load_from_file(path: impl Into<PathBuf>, cap: usize) -> Self {
        let path = path.into();
        let mut records = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<Vec<SearchRecord>>(&s).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        records.truncate(cap.max(1));
        Self {
            inner: Mutex::new(records),
            cap: cap.max(1),
            path: Some(path),
        }
    }

    /// Record a search. A repeated query moves its existing entry to the
    /// front (keeping favorite/tags) instead of duplicating it.
    pub fn record(&self, query: &str) -> SearchRecord {
        self.record_at(query, now_ms())
    }

    pub fn record_at(&self, query: &str, now_ms: u64) -> SearchRecord {
        let record = {
            let mut v = self.inner.lock().expect("history mutex poisoned");
            let record = match v.iter().position(|r| r.query == query) {
                Some(idx) => {
                    let mut existing = v.remove(idx);
                    existing.ts_ms = now_ms;
                    existing
                }
                None => SearchRecord {
                    id: format!("{}-{}", slugify(query), now_ms),
                    query: query.to_string(),
                    ts_ms: now_ms,
                    favorite: false,
                    tags: Vec::new(),
                },
            };
            v.insert(0, record.clone());
            v.truncate(self.cap);
            record
        };
        self.save();
        record
    }

    /// Newest-first copy of all entries.
    pub fn snapshot(&self) -> Vec<SearchRecord> {
        self.inner.lock().expect("history mutex poisoned").clone()
    }

    /// Flip the favorite flag; false if the id is unknown.
    pub fn toggle_favorite(&self, id: &str) -> bool {
        let found = {
            let mut v = self.inner.lock().expect("history mutex poisoned");
            match v.iter_mut().find(|r| r.id == id) {
                Some(r) => {
                    r.favorite = !r.favorite;
                    true
                }
                None => false,
            }
        };
        if found {
            self.save();
        }
        found
    }

    /// Add a tag if absent; false if the id is unknown.
    pub fn add_tag(&self, id: &str, tag: &str) -> bool {
        let found = {
            let mut v = self.inner.lock().expect("history mutex poisoned");
            match v.iter_mut().find(|r| r.id == id) {
                Some(r) => {
                    if !r.tags.iter().any(|t| t == tag) {
                        r.tags.push(tag.to_string());
                    }
                    true
                }
                None => false,
            }
        };
        if found {
            self.save();
        }
        found
    }

    pub fn remove_tag(&self, id: &str, tag: &str) -> bool {
        let found = {
            let mut v = self.inner.lock().expect("history mutex poisoned");
            match v.iter_mut().find(|r| r.id == id) {
                Some(r) => {
                    r.tags.retain(|t| t != tag);
                    true
                }
                None => false,
            }
        };
        if found {
            self.save();
        }
        found
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut v = self.inner.lock().expect("history mutex poisoned");
            let before = v.len();
            v.retain(|r| r.id != id);
            v.len() != before
        };
        if removed {
            self.save();
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.lock().expect("history mutex poisoned").clear();
        self.save();
    }

    /// Best-effort persistence; failures are logged, never surfaced.
    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let snapshot = self.snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!(error = ?e, path = %path.display(), "history save failed");
                }
            }
            Err(e) => tracing::warn!(error = ?e, "history serialize failed"),
        }
    }
}
