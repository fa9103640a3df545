//! Text cleanup for upstream fields: scraped product names arrive with HTML
//! entities and markup, open-data tags carry language prefixes, ingredient
//! lists come as one comma-joined string.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize a product name or description: decode HTML entities, strip tags,
/// collapse whitespace, cap length.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 200 chars is plenty for a product name.
    if out.chars().count() > 200 {
        out = out.chars().take(200).collect();
    }
    out
}

/// Split an ingredients blob ("water, sugar, salt (0.2%)") into trimmed parts.
pub fn split_ingredients(text: &str) -> Vec<String> {
    text.split(',')
        .map(|p| clean_text(p))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Strip the language prefix from an open-data tag: "en:milk" -> "milk".
pub fn strip_lang_prefix(tag: &str) -> String {
    match tag.split_once(':') {
        Some((prefix, rest)) if prefix.len() <= 3 => rest.to_string(),
        _ => tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_tags_and_entities() {
        assert_eq!(
            clean_text("  <b>Organic</b>&nbsp;&amp; Fresh  Milk "),
            "Organic & Fresh Milk"
        );
    }

    #[test]
    fn clean_text_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(clean_text(&long).chars().count(), 200);
    }

    #[test]
    fn split_ingredients_trims_and_drops_empty() {
        let parts = split_ingredients("water,  sugar , ,salt (0.2%)");
        assert_eq!(parts, vec!["water", "sugar", "salt (0.2%)"]);
    }

    #[test]
    fn strip_lang_prefix_only_touches_short_prefixes() {
        assert_eq!(strip_lang_prefix("en:milk"), "milk");
        assert_eq!(strip_lang_prefix("fr:lait"), "lait");
        assert_eq!(strip_lang_prefix("contains:nuts maybe"), "contains:nuts maybe");
        assert_eq!(strip_lang_prefix("milk"), "milk");
    }
}
