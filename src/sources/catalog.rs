//! Internal product catalog adapter. Talks to the backend product service's
//! search endpoint, trying the primary base URL and then the hosted fallback,
//! and maps catalog products onto the normalized item shape.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::item::{
    placeholder_image, score_nutrients, NormalizedItem, NutrientScore, Nutrients,
    ScoreThresholds, SOURCE_CATALOG, UNKNOWN_NAME,
};
use crate::sources::{absorb_error, http_client, SourceAdapter};

const THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 15.0,
    fiber_min: 3.0,
    sugar_max: 10.0,
    fat_penalty: 20.0,
    sugar_penalty: 15.0,
};

/// Catalog health scores (0-10) decide the classification outright when they
/// are conclusive; the macro thresholds only break the middle band.
const HEALTH_FAVORABLE_MIN: f64 = 7.0;
const HEALTH_UNFAVORABLE_MAX: f64 = 3.0;

const SEARCH_LIMIT: usize = 20;
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<CatalogProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub nutritional_info: NutritionalInfo,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub dietary_info: Vec<String>,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NutritionalInfo {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
}

pub struct CatalogAdapter {
    bases: Vec<String>,
    client: reqwest::Client,
}

impl CatalogAdapter {
    pub fn new(bases: Vec<String>) -> Self {
        Self {
            bases,
            client: http_client(TIMEOUT),
        }
    }

    async fn fetch(&self, base: &str, query: &str) -> Result<Vec<NormalizedItem>> {
        let url = format!("{}/products/search", base.trim_end_matches('/'));
        let limit = SEARCH_LIMIT.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("query", query), ("limit", limit.as_str())])
            .send()
            .await
            .context("catalog search get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("catalog search status {}", resp.status());
        }
        let body: SearchResponse = resp.json().await.context("catalog search body")?;
        Ok(body
            .products
            .into_iter()
            .enumerate()
            .map(|(i, p)| normalize_product(p, i))
            .collect())
    }
}

/// Map one catalog product onto the normalized shape; score from the health
/// score when conclusive, macro thresholds otherwise.
pub fn normalize_product(p: CatalogProduct, idx: usize) -> NormalizedItem {
    let name = p
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let nutrients = Nutrients {
        protein: p.nutritional_info.protein,
        carbs: p.nutritional_info.carbs,
        fat: p.nutritional_info.fat,
        fiber: p.nutritional_info.fiber,
        sugar: p.nutritional_info.sugar,
        sodium: p.nutritional_info.sodium,
    }
    .sanitized();

    let score = match p.health_score {
        Some(h) if h >= HEALTH_FAVORABLE_MIN => NutrientScore::Favorable,
        Some(h) if h <= HEALTH_UNFAVORABLE_MAX => NutrientScore::Unfavorable,
        _ => score_nutrients(&nutrients, &THRESHOLDS),
    };

    let image_url = p
        .image_url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| placeholder_image(&name));

    NormalizedItem {
        id: format!("{}-{}-{}", SOURCE_CATALOG, crate::item::slugify(&name), idx),
        name,
        source: SOURCE_CATALOG.to_string(),
        brand: p.brand.filter(|b| !b.is_empty()),
        serving: None,
        calories: sane(p.nutritional_info.calories),
        nutrients,
        score,
        image_url,
        ingredients: p.ingredients,
        allergens: p.allergens,
        additives: Vec::new(),
    }
}

fn sane(v: f64) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        0.0
    }
}

#[async_trait]
impl SourceAdapter for CatalogAdapter {
    async fn search(&self, query: &str) -> Vec<NormalizedItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        for base in &self.bases {
            match self.fetch(base, query).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => {
                    tracing::debug!(base, "catalog base returned no products");
                }
                Err(e) => {
                    absorb_error(SOURCE_CATALOG, &e);
                }
            }
        }
        Vec::new()
    }

    fn name(&self) -> &'static str {
        SOURCE_CATALOG
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "name": "Organic Greek Yogurt",
        "brand": "Fresh Farms",
        "category": "Dairy",
        "nutritionalInfo": {
            "calories": 120,
            "protein": 15,
            "carbs": 8,
            "fat": 4,
            "fiber": 0,
            "sugar": 5
        },
        "ingredients": ["Milk", "Live cultures"],
        "allergens": ["Milk"],
        "dietaryInfo": ["Vegetarian"],
        "healthScore": 8,
        "imageUrl": "https://img.example/yogurt.jpg",
        "price": 4.5,
        "tags": ["protein"]
    }"#;

    #[test]
    fn normalizes_a_full_product() {
        let p: CatalogProduct = serde_json::from_str(PRODUCT_JSON).unwrap();
        let item = normalize_product(p, 0);
        assert_eq!(item.name, "Organic Greek Yogurt");
        assert_eq!(item.source, SOURCE_CATALOG);
        assert_eq!(item.brand.as_deref(), Some("Fresh Farms"));
        assert_eq!(item.nutrients.protein, 15.0);
        assert_eq!(item.nutrients.sugar, 5.0);
        assert_eq!(item.allergens, vec!["Milk"]);
        // Health score 8 is conclusive regardless of the protein boundary.
        assert_eq!(item.score, NutrientScore::Favorable);
        assert!(item.id.starts_with("catalog-organic-greek-yogurt-"));
    }

    #[test]
    fn protein_boundary_at_fifteen_vs_sixteen() {
        // Inconclusive health score: the macro thresholds decide.
        let mk = |protein: f64| -> NormalizedItem {
            let p = CatalogProduct {
                name: Some("Test Yogurt".into()),
                brand: None,
                category: None,
                nutritional_info: NutritionalInfo {
                    calories: 100.0,
                    protein,
                    carbs: 8.0,
                    fat: 4.0,
                    fiber: 4.0,
                    sugar: 5.0,
                    sodium: 40.0,
                },
                ingredients: vec![],
                allergens: vec![],
                dietary_info: vec![],
                health_score: Some(5.0),
                image_url: None,
                tags: vec![],
            };
            normalize_product(p, 0)
        };
        assert_eq!(mk(15.0).score, NutrientScore::Neutral, "15 is not > 15");
        assert_eq!(mk(16.0).score, NutrientScore::Favorable);
    }

    #[test]
    fn missing_fields_default_safely() {
        let p: CatalogProduct = serde_json::from_str("{}").unwrap();
        let item = normalize_product(p, 3);
        assert_eq!(item.name, UNKNOWN_NAME);
        assert_eq!(item.nutrients, Nutrients::default());
        assert!(item.image_url.contains("unsplash"));
        assert!(item.ingredients.is_empty());
    }

    #[test]
    fn malformed_body_fails_closed() {
        let parsed: Result<SearchResponse, _> = serde_json::from_str("{ nope");
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_products_list_parses_to_empty() {
        let body: SearchResponse =
            serde_json::from_str(r#"{"products": [], "total": 0, "page": 1, "totalPages": 0}"#)
                .unwrap();
        assert!(body.products.is_empty());
    }
}
