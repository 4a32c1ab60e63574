//! Multi-factor diversity scoring and constraint building
//!
//! Scores a candidate draft against recent history on four signals —
//! cuisine rotation, protein variety, cooking-method variety, and
//! ingredient novelty — and combines them with the semantic similarity
//! signal into one weighted overall score. Also derives forward-looking
//! avoid/suggest constraints from the same history window.

use crate::config::{DiversityWeights, ScoringWindows};
use crate::error::Result;
use crate::scoring::taxonomy;
use crate::types::{DiversityConstraints, DiversityScore, RecipeDraft, RecipeMemory};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Weighted-count saturation per signal: the count at which the sub-score
/// reaches zero. Cuisine repetition is penalized hardest, cooking-method
/// repetition is tolerated most.
const CUISINE_SATURATION: f32 = 3.0;
const PROTEIN_SATURATION: f32 = 4.0;
const METHOD_SATURATION: f32 = 5.0;

/// Sub-score boundaries for the textual feedback
const STRENGTH_CUTOFF: f32 = 0.7;
const WEAKNESS_CUTOFF: f32 = 0.4;

/// Share of the constraint window at which a value becomes an "avoid" entry
const OVERUSE_RATIO: f32 = 0.4;

/// Proteins offered as suggestions when underrepresented in the window
const SUGGEST_PROTEIN_CANDIDATES: &[&str] = &["chicken", "fish", "beef", "vegetarian", "lamb"];

/// Minimum occurrences before a candidate protein stops being suggested
const SUGGEST_MIN_OCCURRENCES: u32 = 2;

/// Diversity scorer with validated weights and per-signal windows
///
/// History slices are expected newest-first, as returned by
/// `MemoryStore::get_recent_recipes`.
#[derive(Debug, Clone)]
pub struct DiversityScorer {
    weights: DiversityWeights,
    windows: ScoringWindows,
}

impl DiversityScorer {
    /// Create a scorer, failing fast when the weights do not sum to 1.0
    pub fn new(weights: DiversityWeights, windows: ScoringWindows) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights, windows })
    }

    pub fn weights(&self) -> &DiversityWeights {
        &self.weights
    }

    /// Score a candidate draft against recent history
    ///
    /// `max_similarity` is the result of the embedding similarity scan; the
    /// semantic sub-score is its complement. The overall score is clamped to
    /// [0, 1] regardless of inputs.
    pub fn calculate_diversity_score(
        &self,
        draft: &RecipeDraft,
        history: &[RecipeMemory],
        max_similarity: f32,
    ) -> DiversityScore {
        let cuisine_variety = self.cuisine_rotation_score(draft, history);
        let protein_diversity = self.protein_variety_score(draft, history);
        let cooking_method_variety = self.method_variety_score(draft, history);
        let ingredient_novelty = self.ingredient_novelty_score(draft, history);

        let semantic = (1.0 - max_similarity).clamp(0.0, 1.0);

        let overall_score = (self.weights.semantic * semantic
            + self.weights.cuisine * cuisine_variety
            + self.weights.protein * protein_diversity
            + self.weights.method * cooking_method_variety
            + self.weights.ingredient * ingredient_novelty)
            .clamp(0.0, 1.0);

        let (strengths, weaknesses) = self.describe(
            draft,
            cuisine_variety,
            protein_diversity,
            cooking_method_variety,
            ingredient_novelty,
            overall_score,
        );

        debug!(
            cuisine = cuisine_variety,
            protein = protein_diversity,
            method = cooking_method_variety,
            ingredient = ingredient_novelty,
            overall = overall_score,
            "Diversity score computed"
        );

        DiversityScore {
            cuisine_variety,
            protein_diversity,
            cooking_method_variety,
            ingredient_novelty,
            overall_score,
            strengths,
            weaknesses,
        }
    }

    /// Recency-weighted rotation score for the candidate's cuisine
    ///
    /// No cuisine tag is neutral (0.5); empty history is maximal variety
    /// (1.0). Otherwise each matching record at window position `i`
    /// contributes `exp(-i / decay)`, and the score falls linearly with the
    /// weighted count.
    fn cuisine_rotation_score(&self, draft: &RecipeDraft, history: &[RecipeMemory]) -> f32 {
        let Some(cuisine) = draft.metadata.cuisine.as_deref() else {
            return 0.5;
        };
        if history.is_empty() {
            return 1.0;
        }

        let key = taxonomy::cuisine_key(cuisine);
        let weighted = Self::weighted_occurrences(
            history,
            self.windows.cuisine_window,
            self.windows.cuisine_decay,
            |record| {
                record
                    .draft
                    .metadata
                    .cuisine
                    .as_deref()
                    .map(taxonomy::cuisine_key)
                    .as_deref()
                    == Some(key.as_str())
            },
        );

        (1.0 - weighted / CUISINE_SATURATION).max(0.0)
    }

    /// Rotation score over coarse protein buckets
    fn protein_variety_score(&self, draft: &RecipeDraft, history: &[RecipeMemory]) -> f32 {
        let Some(protein) = draft.metadata.primary_protein.as_deref() else {
            return 0.5;
        };
        if history.is_empty() {
            return 1.0;
        }

        let key = taxonomy::protein_key(protein);
        let weighted = Self::weighted_occurrences(
            history,
            self.windows.protein_window,
            self.windows.protein_decay,
            |record| {
                record
                    .draft
                    .metadata
                    .primary_protein
                    .as_deref()
                    .map(taxonomy::protein_key)
                    .as_deref()
                    == Some(key.as_str())
            },
        );

        (1.0 - weighted / PROTEIN_SATURATION).max(0.0)
    }

    /// Rotation score over coarse cooking-method buckets
    fn method_variety_score(&self, draft: &RecipeDraft, history: &[RecipeMemory]) -> f32 {
        let Some(method) = draft.metadata.cooking_method.as_deref() else {
            return 0.5;
        };
        if history.is_empty() {
            return 1.0;
        }

        let key = taxonomy::method_key(method);
        let weighted = Self::weighted_occurrences(
            history,
            self.windows.method_window,
            self.windows.method_decay,
            |record| {
                record
                    .draft
                    .metadata
                    .cooking_method
                    .as_deref()
                    .map(taxonomy::method_key)
                    .as_deref()
                    == Some(key.as_str())
            },
        );

        (1.0 - weighted / METHOD_SATURATION).max(0.0)
    }

    /// Ingredient novelty via mean Jaccard overlap
    ///
    /// Overlap above 50% drives the score to zero. A candidate with no
    /// distinguishing ingredients (everything pantry) scores neutral 0.5.
    fn ingredient_novelty_score(&self, draft: &RecipeDraft, history: &[RecipeMemory]) -> f32 {
        let candidate = taxonomy::distinguishing_ingredients(&draft.ingredients);
        if candidate.is_empty() {
            return 0.5;
        }

        let window = &history[..history.len().min(self.windows.ingredient_window)];
        if window.is_empty() {
            return 1.0;
        }

        let total_overlap: f32 = window
            .iter()
            .map(|record| {
                let other = taxonomy::distinguishing_ingredients(&record.draft.ingredients);
                jaccard(&candidate, &other)
            })
            .sum();
        let avg_overlap = total_overlap / window.len() as f32;

        (1.0 - 2.0 * avg_overlap).max(0.0)
    }

    /// Sum of `exp(-i / decay)` over matching records in the trailing window
    ///
    /// Position 0 is the most recent record and carries the highest weight.
    fn weighted_occurrences(
        history: &[RecipeMemory],
        window: usize,
        decay: f32,
        matches: impl Fn(&RecipeMemory) -> bool,
    ) -> f32 {
        history
            .iter()
            .take(window)
            .enumerate()
            .filter(|(_, record)| matches(record))
            .map(|(index, _)| (-(index as f32) / decay).exp())
            .sum()
    }

    /// Build the human-readable strength/weakness tags
    ///
    /// Sub-scores at or above 0.7 become strengths, below 0.4 weaknesses.
    /// Defaults guarantee the feedback is never empty.
    fn describe(
        &self,
        draft: &RecipeDraft,
        cuisine: f32,
        protein: f32,
        method: f32,
        ingredient: f32,
        overall: f32,
    ) -> (Vec<String>, Vec<String>) {
        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();

        let cuisine_name = draft.metadata.cuisine.as_deref().unwrap_or("unknown");
        let protein_name = draft.metadata.primary_protein.as_deref().unwrap_or("unknown");
        let method_name = draft.metadata.cooking_method.as_deref().unwrap_or("unknown");

        let dimensions = [
            (cuisine, "cuisine", cuisine_name, "not overused recently", "repeated too often recently"),
            (protein, "protein", protein_name, "adds variety", "appears too often recently"),
            (method, "cooking method", method_name, "rotates well", "repeated too often recently"),
            (
                ingredient,
                "ingredients",
                "combination",
                "mostly novel against recent recipes",
                "overlap heavily with recent recipes",
            ),
        ];

        for (score, dimension, value, good, bad) in dimensions {
            if score >= STRENGTH_CUTOFF {
                strengths.push(format!("{} ({}) {}", dimension, value, good));
            } else if score < WEAKNESS_CUTOFF {
                weaknesses.push(format!("{} ({}) {}", dimension, value, bad));
            }
        }

        if strengths.is_empty() {
            strengths.push("acceptable variety across recent recipes".to_string());
        }
        if weaknesses.is_empty() && overall < 0.6 {
            weaknesses.push("could be more diverse overall".to_string());
        }

        (strengths, weaknesses)
    }

    /// Derive avoid/suggest constraints from the trailing history window
    ///
    /// Any cuisine/protein/method occurring in at least 40% of the window is
    /// an avoid entry. Candidate proteins seen fewer than twice become
    /// suggestions. Cuisine suggestions are disabled by configuration, for
    /// the same product reason the cuisine weight is zero.
    pub fn build_constraints(
        &self,
        history: &[RecipeMemory],
        window_size: usize,
    ) -> DiversityConstraints {
        let window = &history[..history.len().min(window_size)];
        if window.is_empty() {
            return DiversityConstraints::default();
        }

        let mut cuisines: HashMap<String, u32> = HashMap::new();
        let mut proteins: HashMap<String, u32> = HashMap::new();
        let mut methods: HashMap<String, u32> = HashMap::new();

        for record in window {
            let meta = &record.draft.metadata;
            if let Some(c) = meta.cuisine.as_deref() {
                *cuisines.entry(taxonomy::cuisine_key(c)).or_insert(0) += 1;
            }
            if let Some(p) = meta.primary_protein.as_deref() {
                *proteins.entry(taxonomy::protein_key(p)).or_insert(0) += 1;
            }
            if let Some(m) = meta.cooking_method.as_deref() {
                *methods.entry(taxonomy::method_key(m)).or_insert(0) += 1;
            }
        }

        let overuse_threshold = (window.len() as f32 * OVERUSE_RATIO).ceil() as u32;
        let overused = |counts: &HashMap<String, u32>| -> Vec<String> {
            let mut list: Vec<String> = counts
                .iter()
                .filter(|(_, &count)| count >= overuse_threshold)
                .map(|(value, _)| value.clone())
                .collect();
            list.sort();
            list
        };

        let mut suggest_proteins: Vec<String> = SUGGEST_PROTEIN_CANDIDATES
            .iter()
            .filter(|candidate| {
                proteins.get(**candidate).copied().unwrap_or(0) < SUGGEST_MIN_OCCURRENCES
            })
            .map(|c| c.to_string())
            .collect();
        suggest_proteins.sort();

        DiversityConstraints {
            avoid_cuisines: overused(&cuisines),
            avoid_proteins: overused(&proteins),
            avoid_methods: overused(&methods),
            suggest_cuisines: Vec::new(),
            suggest_proteins,
            suggest_methods: Vec::new(),
        }
    }
}

/// Jaccard similarity of two ingredient sets
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    intersection / union
}
