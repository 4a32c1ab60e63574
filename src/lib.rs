//! Repertoire - Recipe Diversity Engine
//!
//! A Rust backend core that generates AI recipes while guaranteeing they are
//! not near-duplicates of a user's recent history and stay meaningfully
//! varied across protein, cooking method, and ingredients:
//! - Embedding similarity gate with optional temporal decay
//! - Four-factor diversity scoring with weighted composition
//! - Constraint builder feeding avoid/suggest hints forward
//! - Adaptive-temperature retry loop around the external generator
//! - Rolling-window diversity analytics with cached snapshots
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (RecipeDraft, RecipeMemory, etc.)
//! - **Scoring**: Taxonomy normalization and diversity sub-scores
//! - **Storage**: The MemoryStore trait and its libSQL backend
//! - **Generation**: The generator contract and the retry orchestrator
//! - **API**: HTTP surface for generation, preferences, and analytics
//!
//! # Example
//!
//! ```ignore
//! use repertoire_core::{
//!     AnalyticsAggregator, ConnectionMode, EngineConfig, GenerationOrchestrator,
//!     GenerationRequest, LibsqlStore, LlmRecipeGenerator, RemoteEmbeddingService,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(LibsqlStore::new(ConnectionMode::Local("repertoire.db".into())).await?);
//!     let generator = Arc::new(LlmRecipeGenerator::with_default()?);
//!     let embedder = Arc::new(RemoteEmbeddingService::new(api_key, None, None)?);
//!
//!     let orchestrator =
//!         GenerationOrchestrator::new(store.clone(), generator, embedder, EngineConfig::default())?;
//!
//!     let outcome = orchestrator
//!         .generate(GenerationRequest {
//!             meal_type: "dinner".into(),
//!             style_type: "quick".into(),
//!             user_id: "user-1".into(),
//!             conversation_id: "conv-1".into(),
//!             max_retries: None,
//!             similarity_threshold: None,
//!             temporal_window_days: None,
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod scoring;
pub mod similarity;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use analytics::{AggregationReport, AnalyticsAggregator, DiversitySummary, InsightReport};
pub use config::{CategoryThresholds, DiversityWeights, EngineConfig, ScoringWindows};
pub use embeddings::{EmbeddingService, RemoteEmbeddingService};
pub use error::{RepertoireError, Result};
pub use generation::{
    GenerationMetadata, GenerationOrchestrator, GenerationOutcome, GenerationRequest,
    GeneratorConfig, LlmRecipeGenerator, RecipeGenerator,
};
pub use scoring::DiversityScorer;
pub use similarity::{check_similarity, check_similarity_with_decay, cosine_similarity, SimilarityCheck};
pub use storage::{ConnectionMode, LibsqlStore, MemoryStore};
pub use types::{
    DiversityConstraints, DiversityMetrics, DiversityScore, IngredientEntry, NewRecipeMemory,
    Nutrition, PreferencesUpdate, RecipeDraft, RecipeId, RecipeMemory, RecipeMetadata,
    TrendDirection, UserPreferences,
};
