//! Rolling-window diversity analytics
//!
//! Computes per-user `DiversityMetrics` snapshots (distributions, trend,
//! underrepresented categories), renders them into human-readable insights,
//! and caches snapshots for seven days. Also exposes the batch aggregation
//! entry point used by scheduled maintenance.

use crate::error::Result;
use crate::scoring::taxonomy;
use crate::storage::MemoryStore;
use crate::types::{DiversityMetrics, RecipeMemory, TrendDirection};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default analytics window
pub const DEFAULT_METRICS_WINDOW_DAYS: i64 = 30;

/// Snapshot age after which metrics are recalculated lazily
const STALE_AFTER_DAYS: i64 = 7;

/// Minimum recipes before underrepresentation is worth reporting
const MIN_RECIPES_FOR_GAPS: u32 = 5;

/// A reference value is underrepresented below this share of total recipes
const UNDERREPRESENTED_SHARE: f32 = 0.10;

/// Trend band: half-to-half mean shifts inside ±0.05 count as stable
const TREND_BAND: f32 = 0.05;

/// Fewer data points than this always reads as a stable trend
const MIN_TREND_POINTS: usize = 4;

/// Reference vocabulary the distributions are compared against
const REFERENCE_CUISINES: &[&str] = &[
    "turkish", "italian", "mexican", "chinese", "japanese", "indian", "thai", "french", "greek",
    "spanish", "korean", "vietnamese", "lebanese", "moroccan", "american",
];

const REFERENCE_PROTEINS: &[&str] = &[
    "chicken", "beef", "fish", "pork", "lamb", "vegetarian", "turkey", "duck", "seafood", "eggs",
];

// Bucketed methods first, then distinct techniques outside the buckets
const REFERENCE_METHODS: &[&str] = &[
    "baking",
    "grilling",
    "stir-fry",
    "boiling",
    "steaming",
    "frying",
    "braising",
    "poaching",
    "slow-cooking",
    "sous-vide",
];

/// Human-readable rendering of a metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub achievements: Vec<String>,
}

/// Metrics snapshot plus its rendered insights
#[derive(Debug, Clone, Serialize)]
pub struct DiversitySummary {
    pub metrics: DiversityMetrics,
    pub insights: InsightReport,
}

/// Outcome of a batch aggregation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    pub processed: u32,
    pub failed: u32,
}

/// Diversity analytics over the recipe history store
pub struct AnalyticsAggregator {
    store: Arc<dyn MemoryStore>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Compute a fresh metrics snapshot for one user
    pub async fn calculate_diversity_metrics(
        &self,
        user_id: &str,
        window_days: i64,
    ) -> Result<DiversityMetrics> {
        let history = self.store.get_recent_recipes(user_id, window_days).await?;
        Ok(Self::metrics_from_history(user_id, &history, window_days))
    }

    /// Pure metrics computation over a newest-first history slice
    pub fn metrics_from_history(
        user_id: &str,
        history: &[RecipeMemory],
        window_days: i64,
    ) -> DiversityMetrics {
        let now = Utc::now();

        let mut cuisine_distribution: HashMap<String, u32> = HashMap::new();
        let mut protein_distribution: HashMap<String, u32> = HashMap::new();
        let mut method_distribution: HashMap<String, u32> = HashMap::new();

        // Only defined values count toward the distributions
        for record in history {
            let meta = &record.draft.metadata;
            if let Some(c) = meta.cuisine.as_deref() {
                *cuisine_distribution
                    .entry(taxonomy::cuisine_key(c))
                    .or_insert(0) += 1;
            }
            if let Some(p) = meta.primary_protein.as_deref() {
                *protein_distribution
                    .entry(taxonomy::protein_key(p))
                    .or_insert(0) += 1;
            }
            if let Some(m) = meta.cooking_method.as_deref() {
                *method_distribution
                    .entry(taxonomy::method_key(m))
                    .or_insert(0) += 1;
            }
        }

        let total_recipes = history.len() as u32;

        let average_diversity_score = if history.is_empty() {
            0.0
        } else {
            history.iter().map(|r| r.similarity_score).sum::<f32>() / history.len() as f32
        };

        // Trend works on the chronological (oldest-first) score sequence
        let chronological: Vec<f32> = history
            .iter()
            .rev()
            .map(|r| r.similarity_score)
            .collect();
        let trend = Self::detect_trend(&chronological);

        let (underrepresented_cuisines, underrepresented_proteins, underrepresented_methods) =
            if total_recipes < MIN_RECIPES_FOR_GAPS {
                (Vec::new(), Vec::new(), Vec::new())
            } else {
                (
                    Self::underrepresented(REFERENCE_CUISINES, &cuisine_distribution, total_recipes),
                    Self::underrepresented(REFERENCE_PROTEINS, &protein_distribution, total_recipes),
                    Self::underrepresented(REFERENCE_METHODS, &method_distribution, total_recipes),
                )
            };

        let unique_cuisines = cuisine_distribution.len() as u32;
        let unique_proteins = protein_distribution.len() as u32;

        debug!(
            user_id,
            total_recipes, unique_cuisines, unique_proteins, "Metrics computed"
        );

        DiversityMetrics {
            user_id: user_id.to_string(),
            window_start: now - Duration::days(window_days),
            window_end: now,
            cuisine_distribution,
            protein_distribution,
            method_distribution,
            average_diversity_score,
            trend,
            underrepresented_cuisines,
            underrepresented_proteins,
            underrepresented_methods,
            total_recipes,
            unique_cuisines,
            unique_proteins,
            calculated_at: now,
        }
    }

    /// Half-split trend detection with a ±0.05 stability band
    ///
    /// Fewer than four points is insufficient signal and always stable.
    fn detect_trend(chronological_scores: &[f32]) -> TrendDirection {
        if chronological_scores.len() < MIN_TREND_POINTS {
            return TrendDirection::Stable;
        }

        let mid = chronological_scores.len() / 2;
        let (first, second) = chronological_scores.split_at(mid);

        let first_mean: f32 = first.iter().sum::<f32>() / first.len() as f32;
        let second_mean: f32 = second.iter().sum::<f32>() / second.len() as f32;

        let delta = second_mean - first_mean;
        if delta > TREND_BAND {
            TrendDirection::Improving
        } else if delta < -TREND_BAND {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    /// Reference values occurring below 10% of total recipes (minimum one)
    fn underrepresented(
        reference: &[&str],
        distribution: &HashMap<String, u32>,
        total: u32,
    ) -> Vec<String> {
        let threshold = ((total as f32 * UNDERREPRESENTED_SHARE).ceil() as u32).max(1);

        reference
            .iter()
            .filter(|value| distribution.get(**value).copied().unwrap_or(0) < threshold)
            .map(|v| v.to_string())
            .collect()
    }

    /// Render a metrics snapshot into a summary, recommendations, and
    /// achievements
    pub fn generate_insights(metrics: &DiversityMetrics) -> InsightReport {
        let summary = if metrics.average_diversity_score >= 0.7 {
            format!(
                "Excellent variety: your last {} recipes span {} cuisines and {} proteins.",
                metrics.total_recipes, metrics.unique_cuisines, metrics.unique_proteins
            )
        } else if metrics.average_diversity_score >= 0.5 {
            format!(
                "Good variety across your last {} recipes, with room to explore.",
                metrics.total_recipes
            )
        } else {
            format!(
                "Moderate variety: your last {} recipes lean on familiar choices.",
                metrics.total_recipes
            )
        };

        let mut achievements = Vec::new();
        if metrics.unique_cuisines >= 10 {
            achievements.push(format!(
                "World tour: {} different cuisines cooked",
                metrics.unique_cuisines
            ));
        }
        if metrics.unique_proteins >= 6 {
            achievements.push(format!(
                "Protein explorer: {} different proteins used",
                metrics.unique_proteins
            ));
        }
        if metrics.trend == TrendDirection::Improving {
            achievements.push("Your recipe variety is trending up".to_string());
        }

        let mut recommendations = Vec::new();
        for cuisine in metrics.underrepresented_cuisines.iter().take(3) {
            recommendations.push(format!("Try a {} recipe for something new", cuisine));
        }
        for protein in metrics.underrepresented_proteins.iter().take(3) {
            recommendations.push(format!("Consider cooking with {} more often", protein));
        }
        if metrics.trend == TrendDirection::Declining {
            recommendations
                .push("Recent recipes are getting repetitive; try a new category".to_string());
        }
        if let Some((cuisine, count)) = metrics
            .cuisine_distribution
            .iter()
            .max_by_key(|(_, &count)| count)
        {
            if metrics.total_recipes > 0
                && *count as f32 / metrics.total_recipes as f32 > 0.4
            {
                recommendations.push(format!(
                    "Over 40% of recent recipes are {}; branch out for balance",
                    cuisine
                ));
            }
        }

        InsightReport {
            summary,
            recommendations,
            achievements,
        }
    }

    /// Cached-or-recomputed summary for one user
    ///
    /// Reuses a stored snapshot while it is younger than seven days; the
    /// only time-bounded staleness in the system.
    pub async fn get_user_diversity_summary(&self, user_id: &str) -> Result<DiversitySummary> {
        if let Some(cached) = self.store.get_metrics(user_id).await? {
            let age = Utc::now() - cached.calculated_at;
            if age < Duration::days(STALE_AFTER_DAYS) {
                debug!(user_id, "Serving cached diversity metrics");
                let insights = Self::generate_insights(&cached);
                return Ok(DiversitySummary {
                    metrics: cached,
                    insights,
                });
            }
        }

        let metrics = self
            .calculate_diversity_metrics(user_id, DEFAULT_METRICS_WINDOW_DAYS)
            .await?;
        self.store.save_metrics(&metrics).await?;

        let insights = Self::generate_insights(&metrics);
        Ok(DiversitySummary { metrics, insights })
    }

    /// Recompute and persist metrics for every known user
    ///
    /// One user's failure does not abort the batch; failures are counted
    /// and reported.
    pub async fn aggregate_all_users(&self) -> Result<AggregationReport> {
        let users = self.store.list_user_ids().await?;
        let mut report = AggregationReport::default();

        for user_id in users {
            let result = async {
                let metrics = self
                    .calculate_diversity_metrics(&user_id, DEFAULT_METRICS_WINDOW_DAYS)
                    .await?;
                self.store.save_metrics(&metrics).await
            }
            .await;

            match result {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(user_id = %user_id, "Failed to aggregate user: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            "Batch aggregation complete"
        );
        Ok(report)
    }
}
