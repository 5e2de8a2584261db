use std::sync::Arc;

use tracing::{debug, info};

use crate::adaptive::AdaptiveEngine;

/// Drops learner curves and MDP states idle longer than `max_age`.
pub async fn evict_idle_learners(engine: Arc<AdaptiveEngine>, max_age: chrono::Duration) -> usize {
    let cleaned = engine.cleanup_stale_users(max_age);
    let (curves, states) = engine.cache_stats();

    if cleaned > 0 {
        info!(cleaned, curves, states, "learner cache cleanup");
    } else {
        debug!(curves, states, "learner cache cleanup found nothing idle");
    }

    cleaned
}
