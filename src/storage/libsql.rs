//! libSQL storage implementation
//!
//! Persists recipe memories, user preferences, and diversity metric
//! snapshots. Timestamps are stored as RFC3339 text; nested structures
//! (draft, embedding, preferences, metrics) are stored as JSON columns.

use crate::error::{RepertoireError, Result};
use crate::storage::MemoryStore;
use crate::types::{
    DiversityMetrics, NewRecipeMemory, PreferencesUpdate, RecipeId, RecipeMemory, UserPreferences,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info};

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

/// libSQL-backed store
///
/// Holds one connection created at construction; `:memory:` databases are
/// per-connection in libSQL, so reusing the connection keeps the in-memory
/// mode coherent.
pub struct LibsqlStore {
    // Kept alive for the lifetime of the connection
    _db: Database,
    conn: Connection,
}

fn db_err(e: impl std::fmt::Display) -> RepertoireError {
    RepertoireError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepertoireError::Database(format!("Invalid timestamp '{}': {}", s, e)))
}

impl LibsqlStore {
    /// Open the database and initialize the schema
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let db = match &mode {
            ConnectionMode::Local(path) => Builder::new_local(path).build().await,
            ConnectionMode::InMemory => Builder::new_local(":memory:").build().await,
        }
        .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;
        let store = Self { _db: db, conn };
        store.init_schema().await?;

        info!("libSQL store ready ({:?})", mode);
        Ok(store)
    }

    /// Create tables and indexes if missing
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing storage schema");

        self.conn
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS recipe_memories (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    conversation_id TEXT NOT NULL,
                    draft TEXT NOT NULL,
                    embedding TEXT NOT NULL,
                    embedding_model TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    last_accessed_at TEXT NOT NULL,
                    accepted_attempt INTEGER NOT NULL,
                    was_retried INTEGER NOT NULL,
                    similarity_score REAL NOT NULL
                )
                "#,
                params![],
            )
            .await
            .map_err(|e| {
                RepertoireError::Database(format!("Failed to create recipe_memories: {}", e))
            })?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_recipes_user_created
                 ON recipe_memories(user_id, created_at)",
                params![],
            )
            .await
            .map_err(|e| RepertoireError::Database(format!("Failed to create index: {}", e)))?;

        self.conn
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS user_preferences (
                    user_id TEXT PRIMARY KEY,
                    preferences TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                params![],
            )
            .await
            .map_err(|e| {
                RepertoireError::Database(format!("Failed to create user_preferences: {}", e))
            })?;

        self.conn
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS diversity_metrics (
                    user_id TEXT PRIMARY KEY,
                    metrics TEXT NOT NULL,
                    calculated_at TEXT NOT NULL
                )
                "#,
                params![],
            )
            .await
            .map_err(|e| {
                RepertoireError::Database(format!("Failed to create diversity_metrics: {}", e))
            })?;

        Ok(())
    }

    /// Convert a libsql row to a RecipeMemory
    fn row_to_memory(row: &libsql::Row) -> Result<RecipeMemory> {
        let id_str: String = row.get(0).map_err(db_err)?;
        let id = RecipeId::from_string(&id_str)
            .map_err(|e| RepertoireError::Database(format!("Invalid recipe id: {}", e)))?;

        let user_id: String = row.get(1).map_err(db_err)?;
        let conversation_id: String = row.get(2).map_err(db_err)?;

        let draft_json: String = row.get(3).map_err(db_err)?;
        let draft = serde_json::from_str(&draft_json)?;

        let embedding_json: String = row.get(4).map_err(db_err)?;
        let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;

        let embedding_model: String = row.get(5).map_err(db_err)?;

        let created_str: String = row.get(6).map_err(db_err)?;
        let created_at = parse_timestamp(&created_str)?;

        let accessed_str: String = row.get(7).map_err(db_err)?;
        let last_accessed_at = parse_timestamp(&accessed_str)?;

        let accepted_attempt: i64 = row.get(8).map_err(db_err)?;
        let was_retried: i64 = row.get(9).map_err(db_err)?;
        let similarity_score: f64 = row.get(10).map_err(db_err)?;

        Ok(RecipeMemory {
            id,
            user_id,
            conversation_id,
            draft,
            embedding,
            embedding_model,
            created_at,
            last_accessed_at,
            accepted_attempt: accepted_attempt as u32,
            was_retried: was_retried != 0,
            similarity_score: similarity_score as f32,
        })
    }
}

#[async_trait]
impl MemoryStore for LibsqlStore {
    async fn get_recent_recipes(
        &self,
        user_id: &str,
        window_days: i64,
    ) -> Result<Vec<RecipeMemory>> {
        let cutoff = (Utc::now() - Duration::days(window_days)).to_rfc3339();

        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, conversation_id, draft, embedding, embedding_model,
                        created_at, last_accessed_at, accepted_attempt, was_retried,
                        similarity_score
                 FROM recipe_memories
                 WHERE user_id = ? AND created_at >= ?
                 ORDER BY created_at DESC",
                params![user_id, cutoff],
            )
            .await
            .map_err(db_err)?;

        let mut memories = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            memories.push(Self::row_to_memory(&row)?);
        }

        debug!(
            user_id,
            window_days,
            count = memories.len(),
            "Fetched recent recipes"
        );
        Ok(memories)
    }

    async fn save_recipe_memory(&self, memory: NewRecipeMemory) -> Result<RecipeId> {
        let id = RecipeId::new();
        let now = Utc::now().to_rfc3339();

        let draft_json = serde_json::to_string(&memory.draft)?;
        let embedding_json = serde_json::to_string(&memory.embedding)?;

        self.conn
            .execute(
                "INSERT INTO recipe_memories (
                    id, user_id, conversation_id, draft, embedding, embedding_model,
                    created_at, last_accessed_at, accepted_attempt, was_retried,
                    similarity_score
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id.to_string(),
                    memory.user_id,
                    memory.conversation_id,
                    draft_json,
                    embedding_json,
                    memory.embedding_model,
                    now.clone(),
                    now,
                    memory.accepted_attempt as i64,
                    memory.was_retried as i64,
                    memory.similarity_score as f64
                ],
            )
            .await
            .map_err(db_err)?;

        debug!(recipe_id = %id, "Saved recipe memory");
        Ok(id)
    }

    async fn get_recipe_by_id(&self, recipe_id: RecipeId) -> Result<Option<RecipeMemory>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, conversation_id, draft, embedding, embedding_model,
                        created_at, last_accessed_at, accepted_attempt, was_retried,
                        similarity_score
                 FROM recipe_memories WHERE id = ?",
                params![recipe_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(Self::row_to_memory(&row)?)),
            None => Ok(None),
        }
    }

    async fn touch_recipe(&self, recipe_id: RecipeId) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE recipe_memories SET last_accessed_at = ? WHERE id = ?",
                params![Utc::now().to_rfc3339(), recipe_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        if updated == 0 {
            return Err(RepertoireError::RecipeNotFound(recipe_id.to_string()));
        }
        Ok(())
    }

    async fn cleanup_old_recipes(&self, user_id: &str, retention_days: i64) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::days(retention_days)).to_rfc3339();

        let deleted = self
            .conn
            .execute(
                "DELETE FROM recipe_memories WHERE user_id = ? AND created_at < ?",
                params![user_id, cutoff],
            )
            .await
            .map_err(db_err)?;

        info!(user_id, retention_days, deleted, "Retention cleanup done");
        Ok(deleted)
    }

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let mut rows = self
            .conn
            .query(
                "SELECT preferences FROM user_preferences WHERE user_id = ?",
                params![user_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => {
                let json: String = row.get(0).map_err(db_err)?;
                Ok(serde_json::from_str(&json)?)
            }
            None => Ok(UserPreferences::default()),
        }
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences> {
        let mut prefs = self.get_preferences(user_id).await?;
        prefs.merge(update);

        let json = serde_json::to_string(&prefs)?;
        self.conn
            .execute(
                "INSERT INTO user_preferences (user_id, preferences, updated_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                    preferences = excluded.preferences,
                    updated_at = excluded.updated_at",
                params![user_id, json, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(db_err)?;

        Ok(prefs)
    }

    async fn delete_preferences(&self, user_id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM user_preferences WHERE user_id = ?",
                params![user_id],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn save_metrics(&self, metrics: &DiversityMetrics) -> Result<()> {
        let json = serde_json::to_string(metrics)?;

        self.conn
            .execute(
                "INSERT INTO diversity_metrics (user_id, metrics, calculated_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                    metrics = excluded.metrics,
                    calculated_at = excluded.calculated_at",
                params![
                    metrics.user_id.clone(),
                    json,
                    metrics.calculated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_metrics(&self, user_id: &str) -> Result<Option<DiversityMetrics>> {
        let mut rows = self
            .conn
            .query(
                "SELECT metrics FROM diversity_metrics WHERE user_id = ?",
                params![user_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => {
                let json: String = row.get(0).map_err(db_err)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT user_id FROM recipe_memories ORDER BY user_id",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            users.push(row.get(0).map_err(db_err)?);
        }
        Ok(users)
    }
}
