//! Edamam food-database adapter (key-based). Credentials come as an ordered
//! pool: each pair is tried in turn until one yields non-empty results, and
//! running off the end of the pool is the terminal state; the adapter
//! reports empty rather than wrapping around.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::item::{
    placeholder_image, score_nutrients, NormalizedItem, Nutrients, ScoreThresholds,
    SOURCE_EDAMAM, UNKNOWN_NAME,
};
use crate::sources::{absorb_error, http_client, SourceAdapter};

const BASE_URL: &str = "https://api.edamam.com/api/food-database/v2/parser";
const MAX_HITS: usize = 5;
const TIMEOUT: Duration = Duration::from_secs(10);

const THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 15.0,
    fiber_min: 3.0,
    sugar_max: 10.0,
    fat_penalty: 20.0,
    sugar_penalty: 15.0,
};

/// One app_id/app_key pair from the rotation pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    pub app_id: String,
    pub app_key: String,
}

#[derive(Debug, Deserialize)]
struct ParserResponse {
    #[serde(default)]
    hints: Vec<Hint>,
}

#[derive(Debug, Deserialize)]
struct Hint {
    food: Food,
}

#[derive(Debug, Deserialize)]
struct Food {
    #[serde(rename = "foodId", default)]
    food_id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    nutrients: EdamamNutrients,
}

/// Edamam's nutrient field codes, per 100g.
#[derive(Debug, Default, Deserialize)]
struct EdamamNutrients {
    #[serde(rename = "ENERC_KCAL", default)]
    energy_kcal: f64,
    #[serde(rename = "PROCNT", default)]
    protein: f64,
    #[serde(rename = "CHOCDF", default)]
    carbs: f64,
    #[serde(rename = "FAT", default)]
    fat: f64,
    #[serde(rename = "FIBTG", default)]
    fiber: f64,
    #[serde(rename = "SUGAR", default)]
    sugar: f64,
    #[serde(rename = "NA", default)]
    sodium: f64,
}

pub struct EdamamAdapter {
    credentials: Vec<Credential>,
    client: reqwest::Client,
}

impl EdamamAdapter {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            client: http_client(TIMEOUT),
        }
    }

    async fn fetch(&self, cred: &Credential, query: &str) -> Result<Vec<NormalizedItem>> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("app_id", cred.app_id.as_str()),
                ("app_key", cred.app_key.as_str()),
                ("ingr", query),
                ("nutrition-type", "logging"),
            ])
            .send()
            .await
            .context("edamam get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("edamam status {}", resp.status());
        }
        let body: ParserResponse = resp.json().await.context("edamam body")?;
        Ok(normalize_hints(body, query))
    }
}

fn normalize_hints(body: ParserResponse, query: &str) -> Vec<NormalizedItem> {
    body.hints
        .into_iter()
        .take(MAX_HITS)
        .enumerate()
        .map(|(i, hint)| {
            let food = hint.food;
            let name = food
                .label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            let nutrients = Nutrients {
                protein: food.nutrients.protein,
                carbs: food.nutrients.carbs,
                fat: food.nutrients.fat,
                fiber: food.nutrients.fiber,
                sugar: food.nutrients.sugar,
                sodium: food.nutrients.sodium,
            }
            .sanitized();
            let upstream_id = food
                .food_id
                .unwrap_or_else(|| crate::item::slugify(query));
            NormalizedItem {
                id: format!("{}-{}-{}", SOURCE_EDAMAM, upstream_id, i),
                source: SOURCE_EDAMAM.to_string(),
                brand: food.brand.filter(|b| !b.is_empty()),
                serving: Some("100g".to_string()),
                calories: food.nutrients.energy_kcal.max(0.0),
                score: score_nutrients(&nutrients, &THRESHOLDS),
                nutrients,
                image_url: food
                    .image
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
impl SourceAdapter for EdamamAdapter {
    async fn search(&self, query: &str) -> Vec<NormalizedItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        for cred in &self.credentials {
            match self.fetch(cred, query).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => {
                    tracing::debug!(app_id = %cred.app_id, "edamam credential yielded no hits");
                }
                Err(e) => {
                    absorb_error(SOURCE_EDAMAM, &e);
                }
            }
        }
        // Pool exhausted.
        Vec::new()
    }

    fn name(&self) -> &'static str {
        SOURCE_EDAMAM
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }
}
