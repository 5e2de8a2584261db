use std::sync::Arc;

use tokio::io::BufReader;

use adaptive_tutor::adaptive::{AdaptiveConfig, AdaptiveEngine};
use adaptive_tutor::config::Config;
use adaptive_tutor::logging::init_tracing;
use adaptive_tutor::replay;
use adaptive_tutor::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let engine = Arc::new(AdaptiveEngine::new(AdaptiveConfig::from_env()));
    let adaptive_config = engine.config();
    tracing::info!(
        learning_curves = adaptive_config.feature_flags.learning_curves_enabled,
        mdp = adaptive_config.feature_flags.mdp_recommendations_enabled,
        strict_inputs = adaptive_config.feature_flags.strict_inputs,
        capacity = adaptive_config.store.capacity,
        "adaptive engine configured"
    );

    let worker_manager = if config.cleanup_enabled {
        match WorkerManager::new(Arc::clone(&engine), &config).await {
            Ok(manager) => {
                if let Err(e) = manager.start().await {
                    tracing::error!(error = %e, "failed to start workers");
                }
                Some(manager)
            }
            Err(e) => {
                tracing::warn!(error = %e, "worker manager not initialized");
                None
            }
        }
    } else {
        tracing::info!("cache cleanup worker disabled");
        None
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = replay::replay(&engine, stdin, stdout) => {
            match result {
                Ok(stats) => tracing::info!(processed = stats.processed, failed = stats.failed, "input exhausted"),
                Err(e) => tracing::error!(error = %e, "replay stopped"),
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(ref manager) = worker_manager {
        manager.stop().await;
    }

    let (curves, states) = engine.cache_stats();
    tracing::info!(curves, states, "graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
