//! Shared application state for the HTTP API

use crate::analytics::AnalyticsAggregator;
use crate::generation::GenerationOrchestrator;
use crate::storage::MemoryStore;
use std::sync::Arc;

/// State handed to every handler
///
/// All collaborators are Arc'd; cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub store: Arc<dyn MemoryStore>,
    pub analytics: Arc<AnalyticsAggregator>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<GenerationOrchestrator>,
        store: Arc<dyn MemoryStore>,
        analytics: Arc<AnalyticsAggregator>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            analytics,
        }
    }
}
