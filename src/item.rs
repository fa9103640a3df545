//! # Normalized item
//!
//! The common shape every source adapter produces and the aggregator
//! consumes. Nutrient fields are always finite and zero-filled so downstream
//! arithmetic never has to guard against null, and the score is recomputed at
//! normalization time from per-source thresholds rather than trusted from
//! upstream.

use serde::{Deserialize, Serialize};

/// Source tags carried in `NormalizedItem::source`.
pub const SOURCE_CATALOG: &str = "catalog";
pub const SOURCE_EDAMAM: &str = "edamam";
pub const SOURCE_CALORIE_NINJAS: &str = "calorie-ninjas";
pub const SOURCE_OPEN_FOOD_FACTS: &str = "open-food-facts";
pub const SOURCE_SCRAPE: &str = "scrape";
pub const SOURCE_SYNTHETIC: &str = "synthetic";

/// Name used when the upstream record carries none.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Three-valued nutrition classification, recomputed on every normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientScore {
    Favorable,
    Neutral,
    Unfavorable,
}

/// Per-100g (or per-serving, source dependent) macro breakdown in grams,
/// sodium in milligrams. Missing upstream values are zero, never null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
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

impl Nutrients {
    /// Clamp every field to a finite, non-negative number.
    pub fn sanitized(mut self) -> Self {
        for v in [
            &mut self.protein,
            &mut self.carbs,
            &mut self.fat,
            &mut self.fiber,
            &mut self.sugar,
            &mut self.sodium,
        ] {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }
        self
    }
}

/// Nutrient thresholds deciding the three-valued score. Each adapter owns a
/// set matching its upstream's field semantics.
#[derive(Debug, Clone, Copy)]
pub struct ScoreThresholds {
    pub protein_min: f64,
    pub fiber_min: f64,
    pub sugar_max: f64,
    pub fat_penalty: f64,
    pub sugar_penalty: f64,
}

/// Apply thresholds to a sanitized nutrient set.
///
/// The favorable branch is checked first; an item that is both high-protein
/// and high-fat classifies as favorable, matching the upstream services this
/// replaces.
pub fn score_nutrients(n: &Nutrients, t: &ScoreThresholds) -> NutrientScore {
    if n.protein > t.protein_min && n.fiber > t.fiber_min && n.sugar < t.sugar_max {
        NutrientScore::Favorable
    } else if n.fat > t.fat_penalty || n.sugar > t.sugar_penalty {
        NutrientScore::Unfavorable
    } else {
        NutrientScore::Neutral
    }
}

/// One search result, normalized from whichever upstream produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// Unique within one aggregate call: source + upstream id + suffix.
    /// Re-running a search may mint a new id for the same logical item.
    pub id: String,
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving: Option<String>,
    #[serde(default)]
    pub calories: f64,
    pub nutrients: Nutrients,
    pub score: NutrientScore,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additives: Vec<String>,
}

/// Deterministic placeholder image for items whose upstream has none.
pub fn placeholder_image(name: &str) -> String {
    format!(
        "https://source.unsplash.com/random/300x300/?{},food",
        slugify(name)
    )
}

/// Lowercase, URL-safe slug: alphanumeric runs joined by '-'.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("item");
    }
    out
}
