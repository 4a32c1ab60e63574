//! Storage layer for recipe history, preferences, and analytics snapshots
//!
//! Provides the `MemoryStore` abstraction the engine is written against,
//! plus the libSQL implementation. Any document store with a
//! query-by-user-and-time capability can stand behind this trait.

pub mod libsql;

pub use libsql::{ConnectionMode, LibsqlStore};

use crate::error::Result;
use crate::types::{
    DiversityMetrics, NewRecipeMemory, PreferencesUpdate, RecipeId, RecipeMemory, UserPreferences,
};
use async_trait::async_trait;

/// Storage contract for the diversity engine
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// All records for the user created within the last `window_days`,
    /// ordered newest-first. An empty result is not an error.
    async fn get_recent_recipes(&self, user_id: &str, window_days: i64)
        -> Result<Vec<RecipeMemory>>;

    /// Persist an accepted recipe: assigns a new unique id and stamps both
    /// timestamps. Must never be called for rejected generation attempts.
    async fn save_recipe_memory(&self, memory: NewRecipeMemory) -> Result<RecipeId>;

    /// Fetch one recipe by id
    async fn get_recipe_by_id(&self, recipe_id: RecipeId) -> Result<Option<RecipeMemory>>;

    /// Update `last_accessed_at` to now
    async fn touch_recipe(&self, recipe_id: RecipeId) -> Result<()>;

    /// Delete records older than the retention window; returns the number
    /// deleted. Used by scheduled maintenance, not the generation path.
    async fn cleanup_old_recipes(&self, user_id: &str, retention_days: i64) -> Result<u64>;

    /// Preferences for the user, all-empty defaults when absent
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences>;

    /// Merge a partial update into the stored preferences and return the
    /// result
    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences>;

    /// Remove stored preferences for the user
    async fn delete_preferences(&self, user_id: &str) -> Result<()>;

    /// Persist a diversity metrics snapshot, replacing any previous one
    async fn save_metrics(&self, metrics: &DiversityMetrics) -> Result<()>;

    /// Latest metrics snapshot for the user, if any
    async fn get_metrics(&self, user_id: &str) -> Result<Option<DiversityMetrics>>;

    /// Distinct user ids present in the recipe history, for batch jobs
    async fn list_user_ids(&self) -> Result<Vec<String>>;
}
