//! Engine configuration: diversity weights, scoring windows, and per-category
//! generation thresholds
//!
//! Weights and thresholds are tunable data, not code. The weight sum
//! invariant is checked at construction so a bad configuration fails at
//! startup rather than at request time.

use crate::error::{RepertoireError, Result};
use serde::{Deserialize, Serialize};

/// Weights for combining the diversity sub-scores into the overall score
///
/// The cuisine weight is deliberately zero in the shipped configuration:
/// diversity is driven by protein, method, and ingredients so recipes stay
/// within familiar cuisines. The cuisine scoring path stays live so the
/// weight can be raised by editing this table only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiversityWeights {
    /// Weight of `1 - max_similarity` (embedding distance)
    pub semantic: f32,
    pub cuisine: f32,
    pub protein: f32,
    pub method: f32,
    pub ingredient: f32,
}

impl Default for DiversityWeights {
    fn default() -> Self {
        Self {
            semantic: 0.20,
            cuisine: 0.00,
            protein: 0.20,
            method: 0.20,
            ingredient: 0.40,
        }
    }
}

impl DiversityWeights {
    /// Sum of all component weights
    pub fn sum(&self) -> f32 {
        self.semantic + self.cuisine + self.protein + self.method + self.ingredient
    }

    /// Validate the sum-to-one invariant (±0.001 tolerance)
    ///
    /// Returns a configuration error so callers fail at startup, never
    /// mid-request.
    pub fn validate(&self) -> Result<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > 0.001 {
            return Err(RepertoireError::config(format!(
                "diversity weights must sum to 1.0, got {:.4}",
                sum
            )));
        }
        Ok(())
    }
}

/// Trailing-window sizes and decay divisors per diversity signal
///
/// Windows differ because repetition tolerance differs: cuisine repetition
/// is penalized hardest, cooking-method repetition is tolerated most.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWindows {
    pub cuisine_window: usize,
    pub protein_window: usize,
    pub method_window: usize,
    pub ingredient_window: usize,

    /// Divisor in `exp(-index / divisor)` position decay, per signal
    pub cuisine_decay: f32,
    pub protein_decay: f32,
    pub method_decay: f32,
}

impl Default for ScoringWindows {
    fn default() -> Self {
        Self {
            cuisine_window: 10,
            protein_window: 8,
            method_window: 12,
            ingredient_window: 5,
            cuisine_decay: 3.0,
            protein_decay: 2.0,
            method_decay: 4.0,
        }
    }
}

/// Similarity/diversity thresholds for one meal-type category
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub similarity_threshold: f32,
    pub diversity_threshold: f32,
}

/// Empirically tuned per-category thresholds
///
/// Looser for categories with naturally low variety (breakfast, salads),
/// tighter for categories expected to vary widely (dinner, desserts).
/// These values came from product tuning; treat them as data requiring
/// product input to change.
const CATEGORY_THRESHOLDS: &[(&str, CategoryThresholds)] = &[
    (
        "breakfast",
        CategoryThresholds {
            similarity_threshold: 0.90,
            diversity_threshold: 0.50,
        },
    ),
    (
        "salad",
        CategoryThresholds {
            similarity_threshold: 0.90,
            diversity_threshold: 0.50,
        },
    ),
    (
        "soup",
        CategoryThresholds {
            similarity_threshold: 0.88,
            diversity_threshold: 0.55,
        },
    ),
    (
        "dinner",
        CategoryThresholds {
            similarity_threshold: 0.82,
            diversity_threshold: 0.65,
        },
    ),
    (
        "dessert",
        CategoryThresholds {
            similarity_threshold: 0.82,
            diversity_threshold: 0.65,
        },
    ),
];

/// Default diversity threshold for meal types without a category entry
pub const DEFAULT_DIVERSITY_THRESHOLD: f32 = 0.60;

/// Look up category-specific thresholds for a meal type
///
/// Matching is case-insensitive. Returns `None` for unlisted categories,
/// which fall back to request defaults.
pub fn category_thresholds(meal_type: &str) -> Option<CategoryThresholds> {
    let lowered = meal_type.to_lowercase();
    CATEGORY_THRESHOLDS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, t)| *t)
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weights: DiversityWeights,
    pub windows: ScoringWindows,

    /// Maximum generation attempts per request
    pub max_retries: u32,

    /// Base similarity threshold when no category override applies
    pub similarity_threshold: f32,

    /// History window consulted by the generation path, in days
    pub temporal_window_days: i64,

    /// Constraint-builder trailing window, in records
    pub constraint_window: usize,

    /// Retention age for cleanup jobs, in days
    pub retention_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: DiversityWeights::default(),
            windows: ScoringWindows::default(),
            max_retries: 3,
            similarity_threshold: 0.85,
            temporal_window_days: 14,
            constraint_window: 10,
            retention_days: 90,
        }
    }
}

impl EngineConfig {
    /// Validate startup invariants, failing fast on a bad configuration
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if self.max_retries == 0 {
            return Err(RepertoireError::config("max_retries must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RepertoireError::config(
                "similarity_threshold must be within [0, 1]",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        DiversityWeights::default().validate().unwrap();
    }

    #[test]
    fn test_bad_weights_fail_validation() {
        let weights = DiversityWeights {
            semantic: 0.5,
            cuisine: 0.5,
            protein: 0.5,
            method: 0.0,
            ingredient: 0.0,
        };
        let err = weights.validate().unwrap_err();
        assert!(matches!(err, RepertoireError::Config(_)));
    }

    #[test]
    fn test_weight_tolerance() {
        // Within ±0.001 passes
        let weights = DiversityWeights {
            semantic: 0.2004,
            cuisine: 0.0,
            protein: 0.2,
            method: 0.2,
            ingredient: 0.4,
        };
        weights.validate().unwrap();
    }

    #[test]
    fn test_category_lookup_is_case_insensitive() {
        let t = category_thresholds("Breakfast").unwrap();
        assert_eq!(t.similarity_threshold, 0.90);
        assert_eq!(t.diversity_threshold, 0.50);
    }

    #[test]
    fn test_unlisted_category_returns_none() {
        assert!(category_thresholds("brunch").is_none());
    }

    #[test]
    fn test_default_engine_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }
}
