//! Open Food Facts adapter (no key). Tries the v2 search endpoint and falls
//! back to the legacy v1 `cgi/search.pl` endpoint; also does barcode lookups
//! the same v2-then-v1 way. The richest source for ingredient text, allergen
//! and additive tags, and the nutri-score grade.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::item::{
    placeholder_image, score_nutrients, slugify, NormalizedItem, NutrientScore, Nutrients,
    ScoreThresholds, SOURCE_OPEN_FOOD_FACTS, UNKNOWN_NAME,
};
use crate::normalize::{split_ingredients, strip_lang_prefix};
use crate::sources::{absorb_error, http_client, SourceAdapter};

const V2_SEARCH_URL: &str = "https://world.openfoodfacts.org/api/v2/search";
const V1_SEARCH_URL: &str = "https://world.openfoodfacts.org/cgi/search.pl";
const V2_PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v2/product";
const V1_PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v0/product";

const PAGE_SIZE: usize = 10;
const TIMEOUT: Duration = Duration::from_secs(10);

const THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 15.0,
    fiber_min: 3.0,
    sugar_max: 10.0,
    fat_penalty: 20.0,
    sugar_penalty: 15.0,
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: Option<i64>,
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OffProduct {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    ingredients_text: Option<String>,
    #[serde(default)]
    allergens_tags: Vec<String>,
    #[serde(default)]
    additives_tags: Vec<String>,
    #[serde(default)]
    nutriscore_grade: Option<String>,
    #[serde(default)]
    nutriments: OffNutriments,
}

/// Open Food Facts nutriment keys, per 100g. Sodium arrives in grams and is
/// carried onward in milligrams.
#[derive(Debug, Default, Deserialize)]
struct OffNutriments {
    #[serde(rename = "energy-kcal_100g", default)]
    energy_kcal: f64,
    #[serde(rename = "proteins_100g", default)]
    protein: f64,
    #[serde(rename = "carbohydrates_100g", default)]
    carbs: f64,
    #[serde(rename = "fat_100g", default)]
    fat: f64,
    #[serde(rename = "fiber_100g", default)]
    fiber: f64,
    #[serde(rename = "sugars_100g", default)]
    sugar: f64,
    #[serde(rename = "sodium_100g", default)]
    sodium_g: f64,
}

pub struct OpenFoodFactsAdapter {
    client: reqwest::Client,
}

impl Default for OpenFoodFactsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenFoodFactsAdapter {
    pub fn new() -> Self {
        Self {
            client: http_client(TIMEOUT),
        }
    }

    async fn search_v2(&self, query: &str) -> Result<Vec<NormalizedItem>> {
        let page_size = PAGE_SIZE.to_string();
        let resp = self
            .client
            .get(V2_SEARCH_URL)
            .query(&[
                ("search_terms", query),
                ("page_size", page_size.as_str()),
                ("fields", "code,product_name,brands,image_url,ingredients_text,allergens_tags,additives_tags,nutriscore_grade,nutriments"),
            ])
            .send()
            .await
            .context("off v2 get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("off v2 status {}", resp.status());
        }
        let body: SearchResponse = resp.json().await.context("off v2 body")?;
        Ok(normalize_products(body.products, query))
    }

    async fn search_v1(&self, query: &str) -> Result<Vec<NormalizedItem>> {
        let page_size = PAGE_SIZE.to_string();
        let resp = self
            .client
            .get(V1_SEARCH_URL)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await
            .context("off v1 get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("off v1 status {}", resp.status());
        }
        let body: SearchResponse = resp.json().await.context("off v1 body")?;
        Ok(normalize_products(body.products, query))
    }

    /// Barcode lookup, v2 then v1. `None` covers unknown codes and upstream
    /// failures alike.
    pub async fn lookup_barcode(&self, code: &str) -> Option<NormalizedItem> {
        for url in [
            format!("{}/{}", V2_PRODUCT_URL, code),
            format!("{}/{}.json", V1_PRODUCT_URL, code),
        ] {
            match self.fetch_product(&url).await {
                Ok(Some(p)) => {
                    return Some(normalize_product(p, code, 0));
                }
                Ok(None) => continue,
                Err(e) => {
                    absorb_error(SOURCE_OPEN_FOOD_FACTS, &e);
                }
            }
        }
        None
    }

    async fn fetch_product(&self, url: &str) -> Result<Option<OffProduct>> {
        let resp = self.client.get(url).send().await.context("off product get()")?;
        if !resp.status().is_success() {
            anyhow::bail!("off product status {}", resp.status());
        }
        let body: ProductResponse = resp.json().await.context("off product body")?;
        // v1 signals a miss with status 0; v2 omits the product instead.
        if body.status == Some(0) {
            return Ok(None);
        }
        Ok(body.product)
    }
}

fn normalize_products(products: Vec<OffProduct>, query: &str) -> Vec<NormalizedItem> {
    let slug = slugify(query);
    products
        .into_iter()
        .enumerate()
        .map(|(i, p)| normalize_product(p, &slug, i))
        .collect()
}

fn normalize_product(p: OffProduct, fallback_id: &str, idx: usize) -> NormalizedItem {
    let name = p
        .product_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let nutrients = Nutrients {
        protein: p.nutriments.protein,
        carbs: p.nutriments.carbs,
        fat: p.nutriments.fat,
        fiber: p.nutriments.fiber,
        sugar: p.nutriments.sugar,
        sodium: p.nutriments.sodium_g * 1000.0,
    }
    .sanitized();

    let score = match p.nutriscore_grade.as_deref() {
        Some("a") | Some("b") => NutrientScore::Favorable,
        Some("d") | Some("e") => NutrientScore::Unfavorable,
        _ => score_nutrients(&nutrients, &THRESHOLDS),
    };

    let upstream_id = p
        .code
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| fallback_id.to_string());

    NormalizedItem {
        id: format!("{}-{}-{}", SOURCE_OPEN_FOOD_FACTS, upstream_id, idx),
        source: SOURCE_OPEN_FOOD_FACTS.to_string(),
        brand: p.brands.filter(|b| !b.is_empty()),
        serving: Some("100g".to_string()),
        calories: p.nutriments.energy_kcal.max(0.0),
        score,
        nutrients,
        image_url: p
            .image_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| placeholder_image(&name)),
        ingredients: p
            .ingredients_text
            .map(|t| split_ingredients(&t))
            .unwrap_or_default(),
        allergens: p.allergens_tags.iter().map(|t| strip_lang_prefix(t)).collect(),
        additives: p.additives_tags.iter().map(|t| strip_lang_prefix(t)).collect(),
        name,
    }
}

#[async_trait]
impl SourceAdapter for OpenFoodFactsAdapter {
    async fn search(&self, query: &str) -> Vec<NormalizedItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        match self.search_v2(query).await {
            Ok(items) if !items.is_empty() => return items,
            Ok(_) => tracing::debug!("off v2 returned no products"),
            Err(e) => {
                absorb_error(SOURCE_OPEN_FOOD_FACTS, &e);
            }
        }
        match self.search_v1(query).await {
            Ok(items) => items,
            Err(e) => absorb_error(SOURCE_OPEN_FOOD_FACTS, &e),
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_OPEN_FOOD_FACTS
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }
}
