//! Scraping backend adapter. The scraper lives behind several candidate base
//! URLs (hosted instance, local dev instance); each is tried in order until
//! one returns results. Scraped fields are noisy, so names run through the
//! HTML cleanup pass.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::item::{
    placeholder_image, score_nutrients, slugify, NormalizedItem, Nutrients, ScoreThresholds,
    SOURCE_SCRAPE, UNKNOWN_NAME,
};
use crate::normalize::clean_text;
use crate::sources::{absorb_error, http_client, SourceAdapter};

// Scraping is slow; give it the long window.
const TIMEOUT: Duration = Duration::from_secs(20);

const THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 15.0,
    fiber_min: 3.0,
    sugar_max: 10.0,
    fat_penalty: 20.0,
    sugar_penalty: 15.0,
};

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    results: Vec<ScrapedItem>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapedItem {
    #[serde(default)]
    name: Option<String>,
    /// Some scraper builds call the field `product` instead.
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    nutritional_info: ScrapedNutrition,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapedNutrition {
    #[serde(default)]
    calories: f64,
    #[serde(default)]
    protein: f64,
    #[serde(default)]
    carbs: f64,
    #[serde(default)]
    fat: f64,
    #[serde(default)]
    fiber: f64,
    #[serde(default)]
    sugar: f64,
}

pub struct ScrapeAdapter {
    bases: Vec<String>,
    client: reqwest::Client,
}

impl ScrapeAdapter {
    pub fn new(bases: Vec<String>) -> Self {
        Self {
            bases,
            client: http_client(TIMEOUT),
        }
    }

    async fn fetch(&self, base: &str, query: &str) -> Result<Vec<NormalizedItem>> {
        let url = format!("{}/grocery/scrape", base.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .context("scrape get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("scrape status {}", resp.status());
        }
        let body: ScrapeResponse = resp.json().await.context("scrape body")?;
        Ok(normalize_results(body, query))
    }
}

fn normalize_results(body: ScrapeResponse, query: &str) -> Vec<NormalizedItem> {
    let slug = slugify(query);
    body.results
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let name = raw
                .name
                .or(raw.product)
                .map(|n| clean_text(&n))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            let nutrients = Nutrients {
                protein: raw.nutritional_info.protein,
                carbs: raw.nutritional_info.carbs,
                fat: raw.nutritional_info.fat,
                fiber: raw.nutritional_info.fiber,
                sugar: raw.nutritional_info.sugar,
                sodium: 0.0,
            }
            .sanitized();
            NormalizedItem {
                id: format!("{}-{}-{}", SOURCE_SCRAPE, slug, i),
                source: SOURCE_SCRAPE.to_string(),
                brand: raw
                    .brand
                    .or(raw.platform)
                    .map(|b| clean_text(&b))
                    .filter(|b| !b.is_empty()),
                serving: None,
                calories: raw.nutritional_info.calories.max(0.0),
                score: score_nutrients(&nutrients, &THRESHOLDS),
                nutrients,
                image_url: raw
                    .image_url
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| placeholder_image(&name)),
                ingredients: Vec::new(),
                allergens: Vec::new(),
                additives: Vec::new(),
                name,
            }
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for ScrapeAdapter {
    async fn search(&self, query: &str) -> Vec<NormalizedItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        for base in &self.bases {
            match self.fetch(base, query).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => {
                    tracing::debug!(base, "scrape base returned no results");
                }
                Err(e) => {
                    absorb_error(SOURCE_SCRAPE, &e);
                }
            }
        }
        Vec::new()
    }

    fn name(&self) -> &'static str {
        SOURCE_SCRAPE
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }
}
