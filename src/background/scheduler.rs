use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::services::start_notifier::StartNotifier;

/// Every minute, on the minute (UTC).
pub const TICK_SCHEDULE: &str = "0 * * * * *";

pub struct BackgroundScheduler {
    scheduler: JobScheduler,
}

impl BackgroundScheduler {
    pub async fn new(start_notifier: StartNotifier) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;

        scheduler
            .add(Job::new_async(TICK_SCHEDULE, move |_uuid, _l| {
                let start_notifier = start_notifier.clone();
                Box::pin(async move {
                    let report = start_notifier.tick(Utc::now()).await;
                    if !report.notified.is_empty() {
                        info!("Start notices sent for events {:?}", report.notified);
                    }
                })
            })?)
            .await?;

        scheduler.start().await?;
        info!("Background scheduler started");

        Ok(Self { scheduler })
    }

    pub async fn shutdown(&mut self) {
        if let Err(e) = self.scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
        info!("Background scheduler stopped");
    }
}
