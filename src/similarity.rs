//! Embedding similarity checks against recipe history
//!
//! Provides cosine similarity plus the two history scans used by the
//! generation gate: a plain maximum-similarity scan and a temporally decayed
//! variant where recent recipes dominate the signal.

use crate::error::{RepertoireError, Result};
use crate::types::{RecipeId, RecipeMemory};
use chrono::Utc;
use tracing::{debug, warn};

/// Default acceptance threshold for the similarity gate
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Default per-day decay factor for the decayed scan
pub const DEFAULT_DECAY_FACTOR: f32 = 0.95;

/// Result of scanning a candidate embedding against history
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCheck {
    /// True when `max_similarity >= threshold`
    pub is_similar: bool,

    /// Highest similarity found; 0.0 for empty history
    pub max_similarity: f32,

    /// Record that produced the maximum, when any
    pub most_similar: Option<RecipeId>,
}

impl SimilarityCheck {
    fn none() -> Self {
        Self {
            is_similar: false,
            max_similarity: 0.0,
            most_similar: None,
        }
    }
}

/// Calculate cosine similarity between two vectors
///
/// Vectors must share dimensionality; a mismatch is an error rather than a
/// silent zero. Zero-length and zero-norm vectors yield 0.0 to avoid
/// division by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RepertoireError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    if a.is_empty() {
        return Ok(0.0);
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Scan the full history for the most similar record
///
/// No early exit: correctness over speed at this scale. A record whose
/// embedding cannot be compared (e.g. stored under a different embedding
/// model) is logged and skipped, not fatal to the scan. Empty history always
/// yields `is_similar: false, max_similarity: 0.0`.
pub fn check_similarity(
    candidate: &[f32],
    history: &[RecipeMemory],
    threshold: f32,
) -> SimilarityCheck {
    if history.is_empty() {
        return SimilarityCheck::none();
    }

    let mut max_similarity = 0.0_f32;
    let mut most_similar = None;

    for record in history {
        match cosine_similarity(candidate, &record.embedding) {
            Ok(similarity) => {
                if similarity > max_similarity {
                    max_similarity = similarity;
                    most_similar = Some(record.id);
                }
            }
            Err(e) => {
                warn!(recipe_id = %record.id, "Skipping record in similarity scan: {}", e);
            }
        }
    }

    debug!(
        max_similarity,
        threshold,
        records = history.len(),
        "Similarity scan complete"
    );

    SimilarityCheck {
        is_similar: max_similarity >= threshold,
        max_similarity,
        most_similar,
    }
}

/// Similarity scan with temporal decay
///
/// Each historical similarity is multiplied by `decay_factor^age_days`
/// before taking the maximum, so recent repetition weighs more than old
/// repetition.
pub fn check_similarity_with_decay(
    candidate: &[f32],
    history: &[RecipeMemory],
    threshold: f32,
    decay_factor: f32,
) -> SimilarityCheck {
    if history.is_empty() {
        return SimilarityCheck::none();
    }

    let now = Utc::now();
    let mut max_similarity = 0.0_f32;
    let mut most_similar = None;

    for record in history {
        let similarity = match cosine_similarity(candidate, &record.embedding) {
            Ok(s) => s,
            Err(e) => {
                warn!(recipe_id = %record.id, "Skipping record in decayed scan: {}", e);
                continue;
            }
        };

        let age_days = (now - record.created_at).num_hours() as f32 / 24.0;
        let decayed = similarity * decay_factor.powf(age_days.max(0.0));

        if decayed > max_similarity {
            max_similarity = decayed;
            most_similar = Some(record.id);
        }
    }

    SimilarityCheck {
        is_similar: max_similarity >= threshold,
        max_similarity,
        most_similar,
    }
}
