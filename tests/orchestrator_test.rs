//! Integration tests for the generation retry loop
//!
//! Exercises the orchestrator against scripted collaborator doubles:
//! exhaustion, retry acceptance, the temperature ladder, first-recipe
//! acceptance, and the never-persist-rejected invariant.

mod common;

use common::{draft, memory, InMemoryStore, StubEmbedder, StubGenerator};
use repertoire_core::{
    EngineConfig, GenerationOrchestrator, GenerationOutcome, GenerationRequest, MemoryStore,
    RepertoireError,
};
use std::collections::HashMap;
use std::sync::Arc;

const DIM: usize = 8;

fn unit_vec(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

fn request(user_id: &str) -> GenerationRequest {
    GenerationRequest {
        meal_type: "dinner".to_string(),
        style_type: "quick".to_string(),
        user_id: user_id.to_string(),
        conversation_id: "conv-1".to_string(),
        max_retries: None,
        similarity_threshold: None,
        temporal_window_days: None,
    }
}

fn orchestrator(
    store: Arc<InMemoryStore>,
    generator: Arc<StubGenerator>,
    embedder: Arc<StubEmbedder>,
) -> GenerationOrchestrator {
    GenerationOrchestrator::new(store, generator, embedder, EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn near_duplicate_generator_exhausts_without_persisting() {
    // History holds a recipe whose embedding every new draft will repeat
    let history = vec![memory(
        "user-1",
        draft("Sumac Chicken", Some("turkish"), Some("chicken"), Some("grilling"), &["sumac", "chicken thigh"]),
        unit_vec(0),
        1,
    )];
    let store = Arc::new(InMemoryStore::with_history(history));

    let generator = Arc::new(StubGenerator::new(vec![draft(
        "Sumac Chicken Again",
        Some("turkish"),
        Some("chicken"),
        Some("grilling"),
        &["sumac", "chicken thigh"],
    )]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(Arc::clone(&store), Arc::clone(&generator), embedder);
    let outcome = orch.generate(request("user-1")).await.unwrap();

    let report = match outcome {
        GenerationOutcome::Exhausted(report) => report,
        other => panic!("expected exhaustion, got {:?}", other),
    };

    assert_eq!(report.attempts, 3);
    assert!(report.final_similarity > 0.99);
    assert!(!report.suggestions.is_empty());
    assert!(!report.weaknesses.is_empty());
    assert_eq!(report.recent_recipes_checked, 1);

    // Deliberate invariant: rejected drafts are never persisted
    assert_eq!(store.saved_count(), 0);
}

#[tokio::test]
async fn temperature_rises_across_attempts() {
    let history = vec![memory(
        "user-1",
        draft("Base", Some("turkish"), Some("chicken"), Some("grilling"), &["rice"]),
        unit_vec(0),
        1,
    )];
    let store = Arc::new(InMemoryStore::with_history(history));

    let generator = Arc::new(StubGenerator::new(vec![draft(
        "Clone",
        Some("turkish"),
        Some("chicken"),
        Some("grilling"),
        &["rice"],
    )]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(store, Arc::clone(&generator), embedder);
    let _ = orch.generate(request("user-1")).await.unwrap();

    let temperatures = generator.recorded_temperatures();
    assert_eq!(temperatures.len(), 3);
    assert!((temperatures[0] - 0.7).abs() < 1e-6);
    assert!((temperatures[1] - 0.9).abs() < 1e-6);
    assert!((temperatures[2] - 1.1).abs() < 1e-6);
}

#[tokio::test]
async fn acceptable_second_attempt_is_persisted_once() {
    let history = vec![memory(
        "user-1",
        draft("Sumac Chicken", Some("turkish"), Some("chicken"), Some("grilling"), &["sumac", "chicken thigh"]),
        unit_vec(0),
        1,
    )];
    let store = Arc::new(InMemoryStore::with_history(history));

    // First draft repeats the history embedding; second is orthogonal and
    // differs on every diversity signal
    let generator = Arc::new(StubGenerator::new(vec![
        draft("Sumac Chicken Again", Some("turkish"), Some("chicken"), Some("grilling"), &["sumac", "chicken thigh"]),
        draft("Miso Salmon", Some("japanese"), Some("salmon"), Some("steaming"), &["miso", "salmon fillet"]),
    ]));

    let mut vectors = HashMap::new();
    vectors.insert("Sumac Chicken Again".to_string(), unit_vec(0));
    vectors.insert("Miso Salmon".to_string(), unit_vec(1));
    let embedder = Arc::new(StubEmbedder::new(vectors, unit_vec(0)));

    let orch = orchestrator(Arc::clone(&store), Arc::clone(&generator), embedder);
    let outcome = orch.generate(request("user-1")).await.unwrap();

    let accepted = match outcome {
        GenerationOutcome::Accepted(accepted) => accepted,
        other => panic!("expected acceptance, got {:?}", other),
    };

    assert_eq!(accepted.metadata.attempts, 2);
    assert!(accepted.metadata.was_retried);
    assert!(accepted.metadata.similarity_score < 0.01);
    assert_eq!(accepted.metadata.recent_recipes_checked, 1);
    assert_eq!(accepted.recipe.name, "Miso Salmon");

    // Exactly one save, and the stored record matches the acceptance
    assert_eq!(store.saved_count(), 1);
    let stored = store
        .get_recipe_by_id(accepted.recipe_id)
        .await
        .unwrap()
        .expect("accepted recipe must be stored");
    assert_eq!(stored.accepted_attempt, 2);
    assert!(stored.was_retried);
    assert_eq!(stored.embedding_model, "stub-embedder");
}

#[tokio::test]
async fn first_recipe_with_empty_history_is_accepted_immediately() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(StubGenerator::new(vec![draft(
        "Lemon Chicken",
        Some("mediterranean"),
        Some("chicken"),
        Some("baking"),
        &["lemon", "chicken breast"],
    )]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(Arc::clone(&store), generator, embedder);
    let outcome = orch.generate(request("fresh-user")).await.unwrap();

    let accepted = match outcome {
        GenerationOutcome::Accepted(accepted) => accepted,
        other => panic!("expected acceptance, got {:?}", other),
    };

    assert_eq!(accepted.metadata.attempts, 1);
    assert!(!accepted.metadata.was_retried);
    // Similarity check auto-passes against empty history
    assert_eq!(accepted.metadata.similarity_score, 0.0);
    assert_eq!(accepted.metadata.recent_recipes_checked, 0);
    assert_eq!(store.saved_count(), 1);
}

#[tokio::test]
async fn generator_failure_is_fatal_and_persists_nothing() {
    let store = Arc::new(InMemoryStore::new());
    // Empty script with no last draft: every call errors
    let generator = Arc::new(StubGenerator::new(vec![]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(Arc::clone(&store), generator, embedder);
    let err = orch.generate(request("user-1")).await.unwrap_err();

    assert!(matches!(err, RepertoireError::Generation(_)));
    assert_eq!(store.saved_count(), 0);
}

#[tokio::test]
async fn missing_required_field_is_a_validation_error() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(StubGenerator::new(vec![]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(store, Arc::clone(&generator), embedder);

    let mut bad = request("user-1");
    bad.meal_type = String::new();
    let err = orch.generate(bad).await.unwrap_err();

    assert!(matches!(err, RepertoireError::Validation(_)));
    // Rejected before any external call
    assert_eq!(generator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn constraints_are_built_once_and_reused_across_attempts() {
    // 5 of 10 recent recipes are chicken: the 40% rule flags it
    let mut history = Vec::new();
    for i in 0..5 {
        history.push(memory(
            "user-1",
            draft("Chicken Dish", Some("turkish"), Some("chicken"), Some("grilling"), &["rice"]),
            unit_vec(0),
            i,
        ));
    }
    for i in 5..10 {
        history.push(memory(
            "user-1",
            draft("Fish Dish", Some("italian"), Some("fish"), Some("baking"), &["pasta"]),
            unit_vec(0),
            i as i64,
        ));
    }
    let store = Arc::new(InMemoryStore::with_history(history));

    let generator = Arc::new(StubGenerator::new(vec![draft(
        "Chicken Clone",
        Some("turkish"),
        Some("chicken"),
        Some("grilling"),
        &["rice"],
    )]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(0)));

    let orch = orchestrator(store, Arc::clone(&generator), embedder);
    let _ = orch.generate(request("user-1")).await.unwrap();

    let seen = generator.recorded_constraints();
    assert_eq!(seen.len(), 3);

    let first = seen[0].as_ref().expect("history is non-empty");
    assert!(first.avoid_proteins.contains(&"chicken".to_string()));
    assert!(first.avoid_proteins.contains(&"fish".to_string()));
    assert!(first.suggest_proteins.contains(&"beef".to_string()));
    assert!(first.suggest_cuisines.is_empty());

    // Same constraints on every attempt; only temperature varies
    assert!(seen.iter().all(|c| c.as_ref() == Some(first)));
}

#[tokio::test]
async fn empty_history_passes_no_constraints() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(StubGenerator::new(vec![draft(
        "Anything",
        Some("thai"),
        Some("tofu"),
        Some("stir-fry"),
        &["tofu", "basil"],
    )]));
    let embedder = Arc::new(StubEmbedder::constant(unit_vec(2)));

    let orch = orchestrator(store, Arc::clone(&generator), embedder);
    let _ = orch.generate(request("fresh-user")).await.unwrap();

    assert_eq!(generator.recorded_constraints(), vec![None]);
}
