//! Synthetic placeholder results for total source exhaustion. Deterministic:
//! the same query always yields the same items (seeded from a sha256 of the
//! query, no RNG), so the UI degrades predictably and tests can assert exact
//! output. These items are tagged [`SOURCE_SYNTHETIC`] and must never be
//! cached, so a retry can still reach real sources.

use sha2::{Digest, Sha256};

use crate::item::{
    placeholder_image, score_nutrients, slugify, NormalizedItem, Nutrients, ScoreThresholds,
    SOURCE_SYNTHETIC,
};

/// Thresholds for scoring the synthesized macros; same rule as the catalog.
const SYNTHETIC_THRESHOLDS: ScoreThresholds = ScoreThresholds {
    protein_min: 15.0,
    fiber_min: 3.0,
    sugar_max: 10.0,
    fat_penalty: 20.0,
    sugar_penalty: 15.0,
};

/// Name variants, in order. The first mirrors the query directly so the grid
/// never looks unrelated to what the user typed.
const VARIANTS: [&str; 3] = ["{} (estimated)", "{} alternative", "Organic {}"];

/// Produce a small fixed set of plausible items for a query.
pub fn synthetic_results(query: &str) -> Vec<NormalizedItem> {
    let digest = Sha256::digest(query.trim().to_lowercase().as_bytes());
    let slug = slugify(query);
    let title = title_case(query);

    VARIANTS
        .iter()
        .enumerate()
        .map(|(i, variant)| {
            // Four seed bytes per item keep the variants distinct but stable.
            let b = &digest[i * 4..i * 4 + 4];
            let nutrients = Nutrients {
                protein: (b[0] % 25) as f64,
                carbs: 5.0 + (b[1] % 45) as f64,
                fat: (b[2] % 18) as f64,
                fiber: (b[3] % 8) as f64,
                sugar: (b[1] % 14) as f64,
                sodium: (b[2] as f64) * 3.0,
            }
            .sanitized();
            let name = variant.replace("{}", &title);
            NormalizedItem {
                id: format!("{}-{}-{}", SOURCE_SYNTHETIC, slug, i),
                name,
                source: SOURCE_SYNTHETIC.to_string(),
                brand: None,
                serving: Some("100g".to_string()),
                calories: 60.0 + (b[0] as f64) * 1.5,
                score: score_nutrients(&nutrients, &SYNTHETIC_THRESHOLDS),
                nutrients,
                image_url: placeholder_image(query),
                ingredients: Vec::new(),
                allergens: Vec::new(),
                additives: Vec::new(),
            }
        })
        .collect()
}

fn title_case(s: &str) -> String {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Item".to_string(),
    }
}
