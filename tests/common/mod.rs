//! Common test utilities and hand-rolled collaborator doubles

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use repertoire_core::{
    DiversityConstraints, DiversityMetrics, EmbeddingService, IngredientEntry, MemoryStore,
    NewRecipeMemory, Nutrition, PreferencesUpdate, RecipeDraft, RecipeGenerator, RecipeId,
    RecipeMemory, RecipeMetadata, RepertoireError, Result, UserPreferences,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Build a draft with the given tags and ingredients
pub fn draft(
    name: &str,
    cuisine: Option<&str>,
    protein: Option<&str>,
    method: Option<&str>,
    ingredients: &[&str],
) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        notes: format!("{} notes", name),
        ingredients: ingredients
            .iter()
            .map(|i| IngredientEntry::Structured {
                item: i.to_string(),
                quantity: "1".to_string(),
            })
            .collect(),
        instructions: vec!["prep".to_string(), "cook".to_string()],
        servings: 2,
        prep_minutes: 10,
        cook_minutes: 20,
        nutrition: Nutrition::default(),
        metadata: RecipeMetadata {
            cuisine: cuisine.map(String::from),
            primary_protein: protein.map(String::from),
            cooking_method: method.map(String::from),
            meal_type: Some("dinner".to_string()),
            ..Default::default()
        },
    }
}

/// Build a persisted memory for the given user with a fixed embedding
pub fn memory(user_id: &str, d: RecipeDraft, embedding: Vec<f32>, age_days: i64) -> RecipeMemory {
    let created = Utc::now() - Duration::days(age_days);
    RecipeMemory {
        id: RecipeId::new(),
        user_id: user_id.to_string(),
        conversation_id: "conv-1".to_string(),
        draft: d,
        embedding,
        embedding_model: "stub-embedder".to_string(),
        created_at: created,
        last_accessed_at: created,
        accepted_attempt: 1,
        was_retried: false,
        similarity_score: 0.5,
    }
}

/// Generator double that replays a scripted sequence of drafts
///
/// The last draft repeats once the script runs out. Temperatures are
/// recorded per call for assertion.
pub struct StubGenerator {
    script: Mutex<VecDeque<RecipeDraft>>,
    last: Mutex<Option<RecipeDraft>>,
    pub temperatures: Mutex<Vec<f32>>,
    pub constraints_seen: Mutex<Vec<Option<DiversityConstraints>>>,
    pub calls: AtomicU32,
}

impl StubGenerator {
    pub fn new(drafts: Vec<RecipeDraft>) -> Self {
        Self {
            script: Mutex::new(drafts.into()),
            last: Mutex::new(None),
            temperatures: Mutex::new(Vec::new()),
            constraints_seen: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn recorded_temperatures(&self) -> Vec<f32> {
        self.temperatures.lock().unwrap().clone()
    }

    pub fn recorded_constraints(&self) -> Vec<Option<DiversityConstraints>> {
        self.constraints_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeGenerator for StubGenerator {
    async fn generate(
        &self,
        _meal_type: &str,
        _style_type: &str,
        constraints: Option<&DiversityConstraints>,
        temperature: f32,
    ) -> Result<RecipeDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.temperatures.lock().unwrap().push(temperature);
        self.constraints_seen
            .lock()
            .unwrap()
            .push(constraints.cloned());

        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();

        if let Some(next) = script.pop_front() {
            *last = Some(next.clone());
            Ok(next)
        } else if let Some(repeat) = last.clone() {
            Ok(repeat)
        } else {
            Err(RepertoireError::Generation("script exhausted".to_string()))
        }
    }
}

/// Embedder double mapping the first input line (the draft name) to a vector
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
}

impl StubEmbedder {
    pub fn new(vectors: HashMap<String, Vec<f32>>, default: Vec<f32>) -> Self {
        Self { vectors, default }
    }

    /// Every input embeds to the same vector
    pub fn constant(vector: Vec<f32>) -> Self {
        Self::new(HashMap::new(), vector)
    }
}

#[async_trait]
impl EmbeddingService for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let name = text.lines().next().unwrap_or_default();
        Ok(self
            .vectors
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }

    fn dimensions(&self) -> usize {
        self.default.len()
    }

    fn model_name(&self) -> &str {
        "stub-embedder"
    }
}

/// In-memory MemoryStore double
///
/// Counts saves so tests can assert the never-persist-rejected invariant,
/// and can be told to fail for specific users to exercise batch-aggregation
/// partial failure.
#[derive(Default)]
pub struct InMemoryStore {
    recipes: Mutex<Vec<RecipeMemory>>,
    preferences: Mutex<HashMap<String, UserPreferences>>,
    metrics: Mutex<HashMap<String, DiversityMetrics>>,
    failing_users: Mutex<HashSet<String>>,
    pub save_calls: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: Vec<RecipeMemory>) -> Self {
        let store = Self::default();
        *store.recipes.lock().unwrap() = history;
        store
    }

    /// All reads and writes for this user will fail
    pub fn fail_user(&self, user_id: &str) {
        self.failing_users.lock().unwrap().insert(user_id.to_string());
    }

    pub fn saved_count(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    fn check_user(&self, user_id: &str) -> Result<()> {
        if self.failing_users.lock().unwrap().contains(user_id) {
            return Err(RepertoireError::Database(format!(
                "injected failure for {}",
                user_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_recent_recipes(
        &self,
        user_id: &str,
        window_days: i64,
    ) -> Result<Vec<RecipeMemory>> {
        self.check_user(user_id)?;
        let cutoff = Utc::now() - Duration::days(window_days);

        let mut matching: Vec<RecipeMemory> = self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= cutoff)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn save_recipe_memory(&self, memory: NewRecipeMemory) -> Result<RecipeId> {
        self.check_user(&memory.user_id)?;
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let id = RecipeId::new();
        let now = Utc::now();
        self.recipes.lock().unwrap().push(RecipeMemory {
            id,
            user_id: memory.user_id,
            conversation_id: memory.conversation_id,
            draft: memory.draft,
            embedding: memory.embedding,
            embedding_model: memory.embedding_model,
            created_at: now,
            last_accessed_at: now,
            accepted_attempt: memory.accepted_attempt,
            was_retried: memory.was_retried,
            similarity_score: memory.similarity_score,
        });
        Ok(id)
    }

    async fn get_recipe_by_id(&self, recipe_id: RecipeId) -> Result<Option<RecipeMemory>> {
        Ok(self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == recipe_id)
            .cloned())
    }

    async fn touch_recipe(&self, recipe_id: RecipeId) -> Result<()> {
        let mut recipes = self.recipes.lock().unwrap();
        match recipes.iter_mut().find(|r| r.id == recipe_id) {
            Some(r) => {
                r.last_accessed_at = Utc::now();
                Ok(())
            }
            None => Err(RepertoireError::RecipeNotFound(recipe_id.to_string())),
        }
    }

    async fn cleanup_old_recipes(&self, user_id: &str, retention_days: i64) -> Result<u64> {
        self.check_user(user_id)?;
        let cutoff = Utc::now() - Duration::days(retention_days);
        let mut recipes = self.recipes.lock().unwrap();

        let before = recipes.len();
        recipes.retain(|r| r.user_id != user_id || r.created_at >= cutoff);
        Ok((before - recipes.len()) as u64)
    }

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        self.check_user(user_id)?;
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences> {
        self.check_user(user_id)?;
        let mut all = self.preferences.lock().unwrap();
        let prefs = all.entry(user_id.to_string()).or_default();
        prefs.merge(update);
        Ok(prefs.clone())
    }

    async fn delete_preferences(&self, user_id: &str) -> Result<()> {
        self.check_user(user_id)?;
        self.preferences.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn save_metrics(&self, metrics: &DiversityMetrics) -> Result<()> {
        self.check_user(&metrics.user_id)?;
        self.metrics
            .lock()
            .unwrap()
            .insert(metrics.user_id.clone(), metrics.clone());
        Ok(())
    }

    async fn get_metrics(&self, user_id: &str) -> Result<Option<DiversityMetrics>> {
        self.check_user(user_id)?;
        Ok(self.metrics.lock().unwrap().get(user_id).cloned())
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut users: Vec<String> = self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        users.sort();
        Ok(users)
    }
}
