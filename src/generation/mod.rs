//! Recipe generation: the external generator contract and the retry loop

pub mod generator;
pub mod orchestrator;

pub use generator::{GeneratorConfig, LlmRecipeGenerator, RecipeGenerator};
pub use orchestrator::{
    temperature_for_attempt, AcceptedRecipe, ExhaustionReport, GenerationMetadata,
    GenerationOrchestrator, GenerationOutcome, GenerationRequest,
};
