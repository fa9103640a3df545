//! CalorieNinjas adapter (key-based). One endpoint, per-100g macros with
//! `_g`/`_mg` suffixed field names, API key in the `X-Api-Key` header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::item::{
    placeholder_image, score_nutrients, slugify, NormalizedItem, Nutrients, ScoreThresholds,
    SOURCE_CALORIE_NINJAS, UNKNOWN_NAME,
};
use crate::sources::{absorb_error, http_client, SourceAdapter};

const BASE_URL: &str = "https://api.calorieninjas.com/v1/nutrition";
const MAX_ITEMS: usize = 5;
const TIMEOUT: Duration = Duration::from_secs(10);

// CalorieNinjas reports per 100g, so the bar sits lower than the catalog's.
const THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 10.0,
    fiber_min: 2.0,
    sugar_max: 10.0,
    fat_penalty: 15.0,
    sugar_penalty: 15.0,
};

#[derive(Debug, Deserialize)]
struct NutritionResponse {
    #[serde(default)]
    items: Vec<NutritionRecord>,
}

#[derive(Debug, Deserialize)]
struct NutritionRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    calories: f64,
    #[serde(default)]
    serving_size_g: f64,
    #[serde(default)]
    protein_g: f64,
    #[serde(default)]
    carbohydrates_total_g: f64,
    #[serde(default)]
    fat_total_g: f64,
    #[serde(default)]
    fiber_g: f64,
    #[serde(default)]
    sugar_g: f64,
    #[serde(default)]
    sodium_mg: f64,
}

pub struct CalorieNinjasAdapter {
    api_key: String,
    client: reqwest::Client,
}

impl CalorieNinjasAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: http_client(TIMEOUT),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<NormalizedItem>> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[("query", query)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("calorieninjas get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("calorieninjas status {}", resp.status());
        }
        let body: NutritionResponse = resp.json().await.context("calorieninjas body")?;
        Ok(normalize_records(body, query))
    }
}

fn normalize_records(body: NutritionResponse, query: &str) -> Vec<NormalizedItem> {
    let query_slug = slugify(query);
    body.items
        .into_iter()
        .take(MAX_ITEMS)
        .enumerate()
        .map(|(i, rec)| {
            let name = rec
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            let nutrients = Nutrients {
                protein: rec.protein_g,
                carbs: rec.carbohydrates_total_g,
                fat: rec.fat_total_g,
                fiber: rec.fiber_g,
                sugar: rec.sugar_g,
                sodium: rec.sodium_mg,
            }
            .sanitized();
            let serving = if rec.serving_size_g > 0.0 {
                Some(format!("{}g", rec.serving_size_g.round() as i64))
            } else {
                Some("100g".to_string())
            };
            NormalizedItem {
                id: format!("{}-{}-{}", SOURCE_CALORIE_NINJAS, query_slug, i),
                source: SOURCE_CALORIE_NINJAS.to_string(),
                brand: None,
                serving,
                calories: rec.calories.max(0.0),
                score: score_nutrients(&nutrients, &THRESHOLDS),
                nutrients,
                image_url: placeholder_image(&name),
                ingredients: Vec::new(),
                allergens: Vec::new(),
                additives: Vec::new(),
                name,
            }
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for CalorieNinjasAdapter {
    async fn search(&self, query: &str) -> Vec<NormalizedItem> {
        if query.trim().is_empty() || self.api_key.is_empty() {
            return Vec::new();
        }
        match self.fetch(query).await {
            Ok(items) => items,
            Err(e) => absorb_error(SOURCE_CALORIE_NINJAS, &e),
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_CALORIE_NINJAS
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NutrientScore;

    const NUTRITION_JSON: &str = r#"{
        "items": [
            {
                "name": "chicken breast",
                "calories": 165.1,
                "serving_size_g": 100.0,
                "fat_total_g": 3.6,
                "fat_saturated_g": 1.0,
                "protein_g": 31.0,
                "sodium_mg": 74,
                "potassium_mg": 256,
                "cholesterol_mg": 85,
                "carbohydrates_total_g": 0.0,
                "fiber_g": 2.4,
                "sugar_g": 0.0
            },
            {
                "name": "chocolate cake",
                "calories": 371.0,
                "serving_size_g": 100.0,
                "fat_total_g": 15.1,
                "protein_g": 5.3,
                "sodium_mg": 315,
                "carbohydrates_total_g": 53.4,
                "fiber_g": 1.8,
                "sugar_g": 36.2
            }
        ]
    }"#;

    #[test]
    fn normalizes_per_100g_records() {
        let body: NutritionResponse = serde_json::from_str(NUTRITION_JSON).unwrap();
        let items = normalize_records(body, "chicken breast");
        assert_eq!(items.len(), 2);

        let chicken = &items[0];
        assert_eq!(chicken.id, "calorie-ninjas-chicken-breast-0");
        assert_eq!(chicken.name, "chicken breast");
        assert_eq!(chicken.serving.as_deref(), Some("100g"));
        assert_eq!(chicken.nutrients.sodium, 74.0);
        assert_eq!(chicken.score, NutrientScore::Favorable);

        let cake = &items[1];
        assert_eq!(cake.score, NutrientScore::Unfavorable);
    }

    #[test]
    fn unknown_fields_are_ignored_and_missing_ones_default() {
        let body: NutritionResponse =
            serde_json::from_str(r#"{"items":[{"calories": 10.0}]}"#).unwrap();
        let items = normalize_records(body, "q");
        assert_eq!(items[0].name, UNKNOWN_NAME);
        assert_eq!(items[0].nutrients, Nutrients::default());
    }

    #[test]
    fn empty_items_yield_empty() {
        let body: NutritionResponse = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(normalize_records(body, "q").is_empty());
    }
}
