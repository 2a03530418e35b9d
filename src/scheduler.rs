use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::SyncEngine;

/// Drives the two periodic jobs: the changed-shows sweep and the
/// configuration refresh. Interval mode by default, cron mode when an
/// expression is configured.
pub struct Scheduler {
    engine: SyncEngine,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, config: SchedulerConfig) -> Self {
        Self {
            engine,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let engine = self.engine.clone();
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let engine = engine.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_refresh_jobs(&engine).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let show_hours = u64::from(self.config.show_refresh_hours);
        let config_hours = u64::from(self.config.configuration_refresh_hours);

        info!(
            "Scheduler running: changed-shows sweep every {}h, configuration refresh every {}h",
            show_hours, config_hours
        );

        // The first tick of each interval fires immediately, which doubles
        // as the refresh-at-startup pass.
        let mut show_interval = interval(Duration::from_secs(show_hours * 3600));
        let mut config_interval = interval(Duration::from_secs(config_hours * 3600));

        loop {
            tokio::select! {
                _ = show_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    match self.engine.refresh_changed_shows().await {
                        Ok(stats) => info!(
                            "Changed-shows sweep complete: {} refreshed, {} failed ({} changed upstream, {} pages lost)",
                            stats.refreshed, stats.failed, stats.changed, stats.failed_pages
                        ),
                        Err(e) => error!("Scheduled show refresh failed: {}", e),
                    }
                }
                _ = config_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    if let Err(e) = self.engine.refresh_configuration().await {
                        // The previously cached configuration stays in place.
                        error!("Scheduled configuration refresh failed: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual refresh...");
        run_refresh_jobs(&self.engine).await;
        Ok(())
    }
}

async fn run_refresh_jobs(engine: &SyncEngine) {
    match engine.refresh_changed_shows().await {
        Ok(stats) => info!(
            "Changed-shows sweep complete: {} refreshed, {} failed ({} changed upstream, {} pages lost)",
            stats.refreshed, stats.failed, stats.changed, stats.failed_pages
        ),
        Err(e) => error!("Show refresh failed: {}", e),
    }

    if let Err(e) = engine.refresh_configuration().await {
        error!("Configuration refresh failed: {}", e);
    }
}
