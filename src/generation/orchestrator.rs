//! Generation retry loop
//!
//! Drives one generation request through the state machine
//! `Idle -> Attempting(n) -> {Accepted | Attempting(n+1) | Exhausted}`:
//! generate a candidate, embed it, gate it on similarity and diversity, and
//! either persist it or retry with higher sampling temperature. Attempts are
//! strictly sequential and capped to bound external LLM cost. Rejected
//! drafts are never persisted.

use crate::config::{category_thresholds, EngineConfig, DEFAULT_DIVERSITY_THRESHOLD};
use crate::embeddings::EmbeddingService;
use crate::error::{RepertoireError, Result};
use crate::generation::RecipeGenerator;
use crate::scoring::DiversityScorer;
use crate::similarity::check_similarity;
use crate::storage::MemoryStore;
use crate::types::{NewRecipeMemory, RecipeDraft, RecipeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Base sampling temperature; each attempt adds one step
const TEMPERATURE_BASE: f32 = 0.5;
const TEMPERATURE_STEP: f32 = 0.2;

/// Sampling temperature for a 1-based attempt number: 0.7, 0.9, 1.1, ...
///
/// Rising entropy helps a retry escape the "same idea" mode without
/// discarding the constraint hints.
pub fn temperature_for_attempt(attempt: u32) -> f32 {
    TEMPERATURE_BASE + attempt as f32 * TEMPERATURE_STEP
}

/// One generation request
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub meal_type: String,
    pub style_type: String,
    pub user_id: String,
    pub conversation_id: String,

    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    #[serde(default)]
    pub temporal_window_days: Option<i64>,
}

/// Metadata attached to a successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub attempts: u32,
    pub was_retried: bool,
    pub similarity_score: f32,
    pub latency_ms: u64,
    pub recent_recipes_checked: usize,
}

/// An accepted, persisted recipe
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedRecipe {
    pub recipe_id: RecipeId,
    pub recipe: RecipeDraft,
    pub metadata: GenerationMetadata,
}

/// Diagnostics for a request that exhausted its retry budget
///
/// This is a designed rejection path, not a defect: the caller should read
/// it as "couldn't find something different enough" and offer a retry or a
/// different category, never a generic error screen.
#[derive(Debug, Clone, Serialize)]
pub struct ExhaustionReport {
    pub attempts: u32,
    pub final_similarity: f32,
    pub similarity_threshold: f32,
    pub final_diversity: f32,
    pub diversity_threshold: f32,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub recent_recipes_checked: usize,
}

/// Terminal state of one generation request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Accepted(AcceptedRecipe),
    Exhausted(ExhaustionReport),
}

/// Orchestrates the generation retry loop
///
/// All collaborators are explicit dependencies injected at construction, so
/// the loop is unit-testable with mocks and carries no global state.
pub struct GenerationOrchestrator {
    store: Arc<dyn MemoryStore>,
    generator: Arc<dyn RecipeGenerator>,
    embedder: Arc<dyn EmbeddingService>,
    scorer: DiversityScorer,
    config: EngineConfig,
}

impl GenerationOrchestrator {
    /// Create an orchestrator, validating configuration invariants up front
    pub fn new(
        store: Arc<dyn MemoryStore>,
        generator: Arc<dyn RecipeGenerator>,
        embedder: Arc<dyn EmbeddingService>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = DiversityScorer::new(config.weights, config.windows)?;

        Ok(Self {
            store,
            generator,
            embedder,
            scorer,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one generation request to a terminal state
    ///
    /// Generator and embedder failures are fatal for the request (they are
    /// infrastructure outages, not diversity rejections) and surface as
    /// errors. Diversity exhaustion is a structured `Ok` outcome.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        Self::validate_request(&request)?;
        let started = Instant::now();

        // Category overrides win over request defaults; unlisted categories
        // fall back to the request/config thresholds.
        let (similarity_threshold, diversity_threshold) =
            match category_thresholds(&request.meal_type) {
                Some(t) => (t.similarity_threshold, t.diversity_threshold),
                None => (
                    request
                        .similarity_threshold
                        .unwrap_or(self.config.similarity_threshold),
                    DEFAULT_DIVERSITY_THRESHOLD,
                ),
            };

        let max_retries = request.max_retries.unwrap_or(self.config.max_retries).max(1);
        let window_days = request
            .temporal_window_days
            .unwrap_or(self.config.temporal_window_days);

        let history = self
            .store
            .get_recent_recipes(&request.user_id, window_days)
            .await?;

        // Constraints and history are fixed across attempts within one
        // request; only temperature varies.
        let constraints = if history.is_empty() {
            None
        } else {
            Some(
                self.scorer
                    .build_constraints(&history, self.config.constraint_window),
            )
        };

        debug!(
            user_id = %request.user_id,
            meal_type = %request.meal_type,
            history = history.len(),
            similarity_threshold,
            diversity_threshold,
            "Starting generation request"
        );

        let mut last_similarity = 0.0_f32;
        let mut last_diversity = 0.0_f32;
        let mut last_weaknesses = Vec::new();

        for attempt in 1..=max_retries {
            let temperature = temperature_for_attempt(attempt);
            debug!(attempt, temperature, "Generation attempt");

            let draft = self
                .generator
                .generate(
                    &request.meal_type,
                    &request.style_type,
                    constraints.as_ref(),
                    temperature,
                )
                .await?;

            let embedding = self.embedder.embed(&draft.embedding_input()).await?;

            let similarity = check_similarity(&embedding, &history, similarity_threshold);
            let diversity =
                self.scorer
                    .calculate_diversity_score(&draft, &history, similarity.max_similarity);

            if !similarity.is_similar && diversity.overall_score >= diversity_threshold {
                let recipe_id = self
                    .store
                    .save_recipe_memory(NewRecipeMemory {
                        user_id: request.user_id.clone(),
                        conversation_id: request.conversation_id.clone(),
                        draft: draft.clone(),
                        embedding,
                        embedding_model: self.embedder.model_name().to_string(),
                        accepted_attempt: attempt,
                        was_retried: attempt > 1,
                        similarity_score: similarity.max_similarity,
                    })
                    .await?;

                info!(
                    recipe_id = %recipe_id,
                    attempt,
                    similarity = similarity.max_similarity,
                    diversity = diversity.overall_score,
                    "Recipe accepted"
                );

                return Ok(GenerationOutcome::Accepted(AcceptedRecipe {
                    recipe_id,
                    recipe: draft,
                    metadata: GenerationMetadata {
                        attempts: attempt,
                        was_retried: attempt > 1,
                        similarity_score: similarity.max_similarity,
                        latency_ms: started.elapsed().as_millis() as u64,
                        recent_recipes_checked: history.len(),
                    },
                }));
            }

            warn!(
                attempt,
                too_similar = similarity.is_similar,
                similarity = similarity.max_similarity,
                diversity = diversity.overall_score,
                weaknesses = ?diversity.weaknesses,
                "Draft rejected"
            );

            last_similarity = similarity.max_similarity;
            last_diversity = diversity.overall_score;
            last_weaknesses = diversity.weaknesses;
        }

        // Deliberate invariant: the last draft is never persisted, to keep
        // near-duplicate content out of history.
        info!(
            user_id = %request.user_id,
            attempts = max_retries,
            "Generation exhausted without an acceptable draft"
        );

        Ok(GenerationOutcome::Exhausted(ExhaustionReport {
            attempts: max_retries,
            final_similarity: last_similarity,
            similarity_threshold,
            final_diversity: last_diversity,
            diversity_threshold,
            weaknesses: last_weaknesses,
            suggestions: vec![
                "try a different meal category".to_string(),
                "retry in a moment for a fresh draft".to_string(),
            ],
            recent_recipes_checked: history.len(),
        }))
    }

    fn validate_request(request: &GenerationRequest) -> Result<()> {
        let missing = [
            ("meal_type", &request.meal_type),
            ("style_type", &request.style_type),
            ("user_id", &request.user_id),
            ("conversation_id", &request.conversation_id),
        ]
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name);

        if let Some(field) = missing {
            return Err(RepertoireError::Validation(format!(
                "missing required field: {}",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_sequence() {
        assert!((temperature_for_attempt(1) - 0.7).abs() < 1e-6);
        assert!((temperature_for_attempt(2) - 0.9).abs() < 1e-6);
        assert!((temperature_for_attempt(3) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_validate_request_rejects_empty_fields() {
        let request = GenerationRequest {
            meal_type: "dinner".to_string(),
            style_type: "quick".to_string(),
            user_id: "".to_string(),
            conversation_id: "conv".to_string(),
            max_retries: None,
            similarity_threshold: None,
            temporal_window_days: None,
        };

        let err = GenerationOrchestrator::validate_request(&request).unwrap_err();
        assert!(matches!(err, RepertoireError::Validation(_)));
        assert!(err.to_string().contains("user_id"));
    }
}
