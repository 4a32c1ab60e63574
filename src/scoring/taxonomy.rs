//! Table-driven normalization of recipe vocabulary
//!
//! Protein and cooking-method names arrive as free text in English or
//! Turkish. Scoring compares coarse buckets, so this module maps raw names
//! onto canonical buckets via synonym tables, and normalizes ingredient
//! names for set comparison. The tables are data: extending a locale means
//! adding synonyms here, not touching scoring logic.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Canonical protein buckets with their English and Turkish synonyms
///
/// Matching is case-insensitive substring; first matching bucket wins.
const PROTEIN_BUCKETS: &[(&str, &[&str])] = &[
    ("chicken", &["chicken", "tavuk", "piliç"]),
    ("beef", &["beef", "steak", "veal", "dana", "sığır", "biftek"]),
    (
        "fish",
        &["fish", "salmon", "tuna", "seabass", "balık", "somon", "levrek", "hamsi"],
    ),
    ("pork", &["pork", "bacon", "ham", "domuz"]),
    ("lamb", &["lamb", "mutton", "kuzu"]),
    (
        "vegetarian",
        &[
            "vegetarian",
            "vegan",
            "tofu",
            "lentil",
            "chickpea",
            "bean",
            "vejetaryen",
            "mercimek",
            "nohut",
            "fasulye",
        ],
    ),
];

/// Canonical cooking-method buckets with synonyms
///
/// `stir-fry` is listed before `frying` so the more specific bucket wins
/// the substring match.
const METHOD_BUCKETS: &[(&str, &[&str])] = &[
    ("baking", &["bake", "baking", "roast", "oven", "fırın"]),
    ("grilling", &["grill", "barbecue", "bbq", "ızgara", "izgara", "mangal"]),
    (
        "stir-fry",
        &["stir-fry", "stir fry", "sauté", "saute", "wok", "sote"],
    ),
    ("boiling", &["boil", "simmer", "stew", "haşlama", "güveç"]),
    ("steaming", &["steam", "buhar", "buğulama"]),
    ("frying", &["fry", "fried", "kızartma", "kızart"]),
];

/// Common pantry items excluded from ingredient novelty comparison
static PANTRY_STOPLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "salt",
        "pepper",
        "water",
        "oil",
        "sugar",
        "flour",
        "butter",
        "tuz",
        "karabiber",
        "biber",
        "su",
        "yağ",
        "zeytinyağı",
        "şeker",
        "un",
        "tereyağı",
    ]
    .into_iter()
    .collect()
});

/// Map a raw protein name onto its canonical bucket
///
/// Returns `None` when the name matches no bucket; callers treat that as
/// its own distinct value rather than forcing a bucket.
pub fn normalize_protein(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    PROTEIN_BUCKETS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| lowered.contains(s)))
        .map(|(canonical, _)| *canonical)
}

/// Map a raw cooking-method name onto its canonical bucket
pub fn normalize_method(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    METHOD_BUCKETS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| lowered.contains(s)))
        .map(|(canonical, _)| *canonical)
}

/// Protein bucket or the lowercased raw value when no bucket matches
pub fn protein_key(name: &str) -> String {
    normalize_protein(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_lowercase())
}

/// Method bucket or the lowercased raw value when no bucket matches
pub fn method_key(name: &str) -> String {
    normalize_method(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_lowercase())
}

/// Cuisine comparison key: case-insensitive exact match
pub fn cuisine_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize an ingredient name for set comparison
///
/// Lowercases, keeps only letters of the supported locale alphabets
/// (ASCII plus Turkish), and collapses whitespace. Quantities and
/// punctuation fall away, so `"500 g Chicken-Thigh"` becomes
/// `"g chicken thigh"` from a raw entry and `"chicken thigh"` from a
/// structured one.
pub fn normalize_ingredient(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || "çğıöşü".contains(c) {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a normalized ingredient is a pantry staple
///
/// A staple is an exact stoplist entry or a phrase whose every word is on
/// the stoplist (`"olive oil"` stays, `"salt"` and `"karabiber"` go).
pub fn is_pantry_staple(normalized: &str) -> bool {
    if normalized.is_empty() {
        return true;
    }
    if PANTRY_STOPLIST.contains(normalized) {
        return true;
    }
    normalized
        .split_whitespace()
        .all(|word| PANTRY_STOPLIST.contains(word))
}

/// Extract the distinguishing ingredient set from ingredient entries
///
/// Handles both entry shapes through `IngredientEntry::item`, normalizes
/// each name, and drops pantry staples and empties.
pub fn distinguishing_ingredients(entries: &[crate::types::IngredientEntry]) -> HashSet<String> {
    entries
        .iter()
        .map(|e| normalize_ingredient(e.item()))
        .filter(|n| !is_pantry_staple(n))
        .collect()
}
