mod cache_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::adaptive::AdaptiveEngine;
use crate::config::Config;

pub use cache_cleanup::evict_idle_learners;

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    engine: Arc<AdaptiveEngine>,
    cleanup_schedule: String,
    cache_max_age: chrono::Duration,
    running: AtomicBool,
}

impl WorkerManager {
    pub async fn new(engine: Arc<AdaptiveEngine>, config: &Config) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            engine,
            cleanup_schedule: config.cleanup_schedule.clone(),
            cache_max_age: config.cache_max_age(),
            running: AtomicBool::new(false),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        if self.running.swap(true, Ordering::Relaxed) {
            warn!("workers already started");
            return Ok(());
        }

        let scheduler = self.scheduler.lock().await;

        {
            let engine = Arc::clone(&self.engine);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let max_age = self.cache_max_age;
            let job = Job::new_async(&self.cleanup_schedule, move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = evict_idle_learners(engine, max_age) => {}
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(
                schedule = %self.cleanup_schedule,
                max_age_minutes = self.cache_max_age.num_minutes(),
                "learner cache cleanup worker scheduled"
            );
        }

        if let Err(e) = scheduler.start().await {
            self.running.store(false, Ordering::Relaxed);
            error!(error = %e, "failed to start scheduler");
            return Err(e.into());
        }
        info!("workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        info!("stopping workers");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "error shutting down scheduler");
        }

        info!("workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
