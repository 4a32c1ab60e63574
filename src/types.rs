//! Core data types for the repertoire diversity engine
//!
//! This module defines the fundamental data structures used throughout the
//! engine: recipe drafts produced by the generator, persisted recipe
//! memories with their embeddings, diversity scores and constraints, rolling
//! analytics snapshots, and user preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for persisted recipes
///
/// Wraps a UUID to provide type safety and prevent mixing recipe IDs with
/// other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub Uuid);

impl RecipeId {
    /// Create a new random recipe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a recipe ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecipeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sparse categorical metadata attached to a recipe
///
/// Every field is optional. An absent field means "unknown" and must degrade
/// scoring to a neutral value, never count as a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_protein: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_tags: Vec<String>,

    /// Preparation time in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// One ingredient line of a recipe
///
/// Historical records stored ingredients as bare strings; newer records use
/// the structured item/quantity shape. Both deserialize through this union
/// and normalize through a single path in `scoring::taxonomy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngredientEntry {
    /// Structured entry: `{"item": "chicken thigh", "quantity": "500 g"}`
    Structured { item: String, quantity: String },

    /// Legacy bare-string entry: `"500 g chicken thigh"`
    Raw(String),
}

impl IngredientEntry {
    /// The ingredient name portion of the entry
    pub fn item(&self) -> &str {
        match self {
            IngredientEntry::Structured { item, .. } => item,
            IngredientEntry::Raw(s) => s,
        }
    }
}

/// Nutrition estimate for one serving
///
/// All fields may be zero when nutrition has not been computed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f32,
    #[serde(default)]
    pub protein_g: f32,
    #[serde(default)]
    pub carbs_g: f32,
    #[serde(default)]
    pub fat_g: f32,
}

/// Generator output before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: String,

    /// Free-text notes from the generator
    #[serde(default)]
    pub notes: String,

    /// Non-empty for an accepted recipe
    pub ingredients: Vec<IngredientEntry>,

    /// Ordered steps; non-empty for an accepted recipe
    pub instructions: Vec<String>,

    #[serde(default)]
    pub servings: u32,

    #[serde(default)]
    pub prep_minutes: u32,

    #[serde(default)]
    pub cook_minutes: u32,

    #[serde(default)]
    pub nutrition: Nutrition,

    #[serde(default)]
    pub metadata: RecipeMetadata,
}

impl RecipeDraft {
    /// Build the short text fed to the embedder: name plus notes truncated
    /// to 200 characters (on a char boundary).
    pub fn embedding_input(&self) -> String {
        let notes: String = self.notes.chars().take(200).collect();
        if notes.is_empty() {
            self.name.clone()
        } else {
            format!("{}\n{}", self.name, notes)
        }
    }
}

/// Persisted recipe record
///
/// Created only on successful acceptance, never for rejected attempts.
/// Immutable after creation except `last_accessed_at`; removed by the
/// retention cleanup job once past the configured age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMemory {
    pub id: RecipeId,
    pub user_id: String,
    pub conversation_id: String,

    pub draft: RecipeDraft,

    /// Fixed-dimension embedding of the draft's name + notes
    pub embedding: Vec<f32>,

    /// Identifier of the embedding model that produced the vector
    pub embedding_model: String,

    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,

    /// Attempt number (1-based) at which this recipe was accepted
    pub accepted_attempt: u32,

    pub was_retried: bool,

    /// Similarity against the closest historical neighbor at acceptance time
    pub similarity_score: f32,
}

/// Parameters for persisting an accepted recipe
///
/// The store assigns the ID and stamps both timestamps.
#[derive(Debug, Clone)]
pub struct NewRecipeMemory {
    pub user_id: String,
    pub conversation_id: String,
    pub draft: RecipeDraft,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
    pub accepted_attempt: u32,
    pub was_retried: bool,
    pub similarity_score: f32,
}

/// Per-candidate diversity assessment
///
/// All sub-scores and the overall score live in [0, 1]. The strengths and
/// weaknesses lists are surfaced to operators and end users and are never
/// both empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityScore {
    pub cuisine_variety: f32,
    pub protein_diversity: f32,
    pub cooking_method_variety: f32,
    pub ingredient_novelty: f32,
    pub overall_score: f32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Forward-looking generation hints derived from recent history
///
/// Consumed only by the next generation call; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityConstraints {
    pub avoid_cuisines: Vec<String>,
    pub avoid_proteins: Vec<String>,
    pub avoid_methods: Vec<String>,
    pub suggest_cuisines: Vec<String>,
    pub suggest_proteins: Vec<String>,
    pub suggest_methods: Vec<String>,
}

impl DiversityConstraints {
    pub fn is_empty(&self) -> bool {
        self.avoid_cuisines.is_empty()
            && self.avoid_proteins.is_empty()
            && self.avoid_methods.is_empty()
            && self.suggest_cuisines.is_empty()
            && self.suggest_proteins.is_empty()
            && self.suggest_methods.is_empty()
    }
}

/// Direction of the diversity trend across a metrics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Rolling-window diversity snapshot, one per user per calculation
///
/// Overwritten by the analytics aggregator; read-only to consumers.
/// Considered stale after seven days and recalculated lazily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub user_id: String,

    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    pub cuisine_distribution: HashMap<String, u32>,
    pub protein_distribution: HashMap<String, u32>,
    pub method_distribution: HashMap<String, u32>,

    /// Mean of the similarity scores present on historical records
    pub average_diversity_score: f32,

    pub trend: TrendDirection,

    pub underrepresented_cuisines: Vec<String>,
    pub underrepresented_proteins: Vec<String>,
    pub underrepresented_methods: Vec<String>,

    pub total_recipes: u32,
    pub unique_cuisines: u32,
    pub unique_proteins: u32,

    pub calculated_at: DateTime<Utc>,
}

/// Per-user dietary preferences
///
/// Mutated via partial-update merge; defaults to all-empty on first access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub disliked_ingredients: Vec<String>,
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    #[serde(default)]
    pub favorite_proteins: Vec<String>,
    #[serde(default)]
    pub favorite_methods: Vec<String>,
    #[serde(default)]
    pub health_goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie_target: Option<u32>,
}

/// Partial update for user preferences
///
/// `None` fields keep their current value; `Some` fields replace it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreferencesUpdate {
    pub dietary_restrictions: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub disliked_ingredients: Option<Vec<String>>,
    pub favorite_cuisines: Option<Vec<String>>,
    pub favorite_proteins: Option<Vec<String>>,
    pub favorite_methods: Option<Vec<String>>,
    pub health_goals: Option<Vec<String>>,
    pub calorie_target: Option<u32>,
}

impl UserPreferences {
    /// Apply a partial update, replacing only the provided fields
    pub fn merge(&mut self, update: PreferencesUpdate) {
        if let Some(v) = update.dietary_restrictions {
            self.dietary_restrictions = v;
        }
        if let Some(v) = update.allergens {
            self.allergens = v;
        }
        if let Some(v) = update.disliked_ingredients {
            self.disliked_ingredients = v;
        }
        if let Some(v) = update.favorite_cuisines {
            self.favorite_cuisines = v;
        }
        if let Some(v) = update.favorite_proteins {
            self.favorite_proteins = v;
        }
        if let Some(v) = update.favorite_methods {
            self.favorite_methods = v;
        }
        if let Some(v) = update.health_goals {
            self.health_goals = v;
        }
        if let Some(v) = update.calorie_target {
            self.calorie_target = Some(v);
        }
    }
}
