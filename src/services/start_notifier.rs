//! Start-time notifications and daily upload cleanup, driven by a once-a-minute tick.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::models::Event;
use crate::notifier::{render, Notifier};
use crate::services::event_store::EventStore;
use crate::services::uploads::UploadDirs;

/// How early before the scheduled instant the notice may go out.
pub const WINDOW_BEFORE_SECS: i64 = 60;
/// How long after the scheduled instant a missed tick can still catch up.
pub const WINDOW_AFTER_SECS: i64 = 120;

/// `-WINDOW_AFTER_SECS < scheduled_at - now <= WINDOW_BEFORE_SECS`
pub fn in_start_window(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let delta = scheduled_at - now;
    delta <= Duration::seconds(WINDOW_BEFORE_SECS) && delta > Duration::seconds(-WINDOW_AFTER_SECS)
}

/// Midnight UTC, at minute granularity.
pub fn is_cleanup_boundary(now: DateTime<Utc>) -> bool {
    now.hour() == 0 && now.minute() == 0
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Files removed from the temporary upload area, when this tick ran the cleanup.
    pub cleaned: Option<usize>,
    /// Ids of events whose start notice went out on this tick.
    pub notified: Vec<String>,
}

#[derive(Clone)]
pub struct StartNotifier {
    store: Arc<EventStore>,
    notifier: Arc<dyn Notifier>,
    uploads: UploadDirs,
}

impl StartNotifier {
    pub fn new(store: Arc<EventStore>, notifier: Arc<dyn Notifier>, uploads: UploadDirs) -> Self {
        Self {
            store,
            notifier,
            uploads,
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let cleaned = if is_cleanup_boundary(now) {
            let removed = self.uploads.cleanup_incoming().await;
            info!("Daily cleanup removed {} staged uploads", removed);
            Some(removed)
        } else {
            None
        };

        let notified = self
            .sweep(now)
            .await
            .iter()
            .map(|e| e.id().to_string())
            .collect();

        TickReport { cleaned, notified }
    }

    /// Claims every accepted event inside its start window, then announces each one.
    ///
    /// The latch is set and persisted before anything is sent, so overlapping or repeated
    /// sweeps can never announce the same event twice.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<Event> {
        let mut claimed = Vec::new();
        {
            let mut guard = self.store.lock().await;
            guard
                .mutate_all(|event| {
                    if in_start_window(event.scheduled_at(), now) && event.claim_start_notification() {
                        claimed.push(event.clone());
                        true
                    } else {
                        false
                    }
                })
                .await;
        }

        if claimed.is_empty() {
            debug!("Start sweep at {}: nothing due", now);
        }
        for event in &claimed {
            self.announce(event).await;
        }
        claimed
    }

    async fn announce(&self, event: &Event) {
        info!(
            "Event {} ({}) is starting, {} subscribers",
            event.id(),
            event.title,
            event.subscribers().len()
        );
        if let Err(e) = self.notifier.post_start_announcement(event).await {
            warn!("Could not post start announcement for event {}: {}", event.id(), e);
        }

        let text = render::start_direct_message(event);
        let deliveries = event.subscribers().iter().map(|user_id| {
            let text = &text;
            async move { (user_id, self.notifier.send_direct_message(user_id, text).await) }
        });
        for (user_id, result) in join_all(deliveries).await {
            if let Err(e) = result {
                warn!("Could not DM {} about event {}: {}", user_id, event.id(), e);
            }
        }
    }
}
