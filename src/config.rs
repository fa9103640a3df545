//! Runtime configuration. Precedence: environment variables (after a `.env`
//! load in the entrypoint) over an optional TOML file over built-in
//! defaults. Loading never fails: a missing or unparsable file falls back to
//! the defaults so the service always comes up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::sources::edamam::Credential;

const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog backend bases, tried in order (primary, hosted fallback).
    pub catalog_bases: Vec<String>,
    /// Scraper backend bases, tried in order.
    pub scrape_bases: Vec<String>,
    /// Edamam credential rotation pool.
    pub edamam_credentials: Vec<Credential>,
    pub calorie_ninjas_key: String,
    /// Aggregate result cache TTL.
    pub cache_ttl_secs: u64,
    /// Guest limiter allowance and rolling window.
    pub guest_max_uses: u32,
    pub guest_window_secs: u64,
    /// Where search history persists; `None` keeps it in memory only.
    pub history_path: Option<String>,
    pub history_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_bases: vec![
                "http://localhost:5001/api".to_string(),
                "https://food-catalog-backend.onrender.com/api".to_string(),
            ],
            scrape_bases: vec![
                "https://food-catalog-backend.onrender.com/api".to_string(),
                "http://localhost:5001/api".to_string(),
            ],
            edamam_credentials: Vec::new(),
            calorie_ninjas_key: String::new(),
            cache_ttl_secs: 5 * 60,
            guest_max_uses: crate::ratelimit::DEFAULT_MAX_USES,
            guest_window_secs: crate::ratelimit::DEFAULT_WINDOW.as_secs(),
            history_path: None,
            history_cap: crate::history::DEFAULT_CAP,
        }
    }
}

impl AppConfig {
    /// Load config: `$AGGREGATOR_CONFIG_PATH`, then `config/aggregator.toml`,
    /// then defaults; env vars override credentials and bases either way.
    pub fn load() -> Self {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            Self::from_file(&PathBuf::from(p))
        } else {
            Self::from_file(Path::new(DEFAULT_CONFIG_PATH))
        };
        cfg.apply_env();
        cfg
    }

    fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<AppConfig>(&s) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Environment overrides. Credentials usually arrive this way rather than
    /// through the file, so keys stay out of the repo.
    fn apply_env(&mut self) {
        if let Ok(base) = std::env::var("CATALOG_BASE_URL") {
            if !base.is_empty() {
                self.catalog_bases.insert(0, base);
            }
        }
        if let Ok(base) = std::env::var("SCRAPE_BASE_URL") {
            if !base.is_empty() {
                self.scrape_bases.insert(0, base);
            }
        }
        let mut pool = Vec::new();
        for suffix in ["", "_2", "_3"] {
            let id = std::env::var(format!("EDAMAM_APP_ID{suffix}")).unwrap_or_default();
            let key = std::env::var(format!("EDAMAM_APP_KEY{suffix}")).unwrap_or_default();
            if !id.is_empty() && !key.is_empty() {
                pool.push(Credential {
                    app_id: id,
                    app_key: key,
                });
            }
        }
        if !pool.is_empty() {
            self.edamam_credentials = pool;
        }
        if let Ok(key) = std::env::var("CALORIE_NINJAS_API_KEY") {
            if !key.is_empty() {
                self.calorie_ninjas_key = key;
            }
        }
        if let Ok(path) = std::env::var("SEARCH_HISTORY_PATH") {
            if !path.is_empty() {
                self.history_path = Some(path);
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn guest_window(&self) -> Duration {
        Duration::from_secs(self.guest_window_secs)
    }
}
