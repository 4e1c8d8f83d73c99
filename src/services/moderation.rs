//! Moderation transitions: accept, reject, interest, and closing coordination channels.
//!
//! The store is the source of truth. Each transition commits to the store first; adapter calls
//! that follow are best-effort and never roll a committed transition back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::EventError;
use crate::models::{ChannelRef, Event, EventId, Interest, InteractionReply, MessageRef};
use crate::notifier::{MessagePatch, Notifier, Participants};
use crate::services::event_store::EventStore;

/// What happened to the coordination channel on accept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coordination {
    NotRequired,
    Created(ChannelRef),
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct AcceptOutcome {
    pub event: Event,
    pub announcement: Option<MessageRef>,
    pub coordination: Coordination,
}

impl AcceptOutcome {
    /// Reply shown to the reviewer.
    pub fn summary(&self) -> String {
        let published = if self.announcement.is_some() {
            "✅ Event published in announcements."
        } else {
            "⚠️ Event accepted, but the announcement could not be posted."
        };
        let ticket = match &self.coordination {
            Coordination::NotRequired => "No ticket required.".to_string(),
            Coordination::Created(channel) => channel.mention(),
            Coordination::Failed(_) => "Error creating ticket.".to_string(),
        };
        format!("{}\n🎫 Ticket: {}", published, ticket)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterestOutcome {
    pub title: String,
    pub interest: Interest,
}

/// Handle to a pending channel deletion.
#[derive(Debug)]
pub struct ScheduledDeletion {
    handle: JoinHandle<()>,
}

impl ScheduledDeletion {
    /// Stops the deletion if it has not run yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the deletion attempt to complete (or be cancelled).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[derive(Clone)]
pub struct Moderation {
    store: Arc<EventStore>,
    notifier: Arc<dyn Notifier>,
    close_delay: Duration,
    /// One lock per event, held from registering a subscriber until its counter edit lands,
    /// so counter edits for an event reach the platform in order.
    interest_locks: Arc<Mutex<HashMap<EventId, Arc<Mutex<()>>>>>,
}

impl Moderation {
    pub fn new(store: Arc<EventStore>, notifier: Arc<dyn Notifier>, close_delay: Duration) -> Self {
        Self {
            store,
            notifier,
            close_delay,
            interest_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn interest_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.interest_locks
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    async fn strip_controls(&self, message: Option<&MessageRef>) {
        let Some(message) = message else { return };
        if let Err(e) = self.notifier.strip_controls(message).await {
            warn!("Could not remove controls from message {}: {}", message.message_id, e);
        }
    }

    /// First step of a rejection: the event must exist and still be pending before the reason
    /// prompt is shown.
    pub async fn begin_reject(&self, id: &str) -> Result<Event, EventError> {
        let event = self
            .store
            .get(id)
            .await
            .ok_or_else(|| EventError::not_found(id))?;
        if *event.status() != crate::models::EventStatus::Pending {
            return Err(EventError::InvalidTransition {
                id: id.to_string(),
                from: event.status().as_str(),
                action: "reject",
            });
        }
        Ok(event)
    }

    /// Second step of a rejection: applies the reason collected by the prompt.
    pub async fn reject(
        &self,
        id: &str,
        reason: Option<String>,
        moderation_message: Option<&MessageRef>,
    ) -> Result<Event, EventError> {
        let event = self
            .store
            .try_mutate(id, |e| e.reject(reason).map(|_| e.clone()))
            .await?;
        info!(
            "Event {} rejected (reason: {})",
            id,
            event.rejection_reason().unwrap_or("none")
        );
        self.strip_controls(moderation_message).await;
        Ok(event)
    }

    /// Applies the accept to the store. No platform calls.
    pub async fn commit_accept(&self, id: &str) -> Result<Event, EventError> {
        let event = self
            .store
            .try_mutate(id, |e| e.accept().map(|_| e.clone()))
            .await?;
        info!("Event {} accepted", id);
        Ok(event)
    }

    /// Platform side of an accept already committed by `commit_accept`.
    pub async fn publish_accepted(
        &self,
        event: Event,
        reviewer: &str,
        moderation_message: Option<&MessageRef>,
    ) -> AcceptOutcome {
        let id = event.id().to_string();

        let announcement = match self.notifier.publish_announcement(&event).await {
            Ok(announcement) => {
                let stored = announcement.clone();
                self.store
                    .mutate(&id, move |e| e.record_announcement(stored))
                    .await;
                Some(announcement)
            }
            Err(e) => {
                error!("Could not publish announcement for event {}: {}", id, e);
                None
            }
        };

        let coordination = if event.requires_support() {
            let participants = Participants {
                requester: event.requester_id.clone(),
                reviewer: reviewer.to_string(),
            };
            match self
                .notifier
                .create_coordination_channel(&event, &participants)
                .await
            {
                Ok(channel) => {
                    info!("Coordination channel {} created for event {}", channel.channel_id, id);
                    Coordination::Created(channel)
                }
                Err(e) => {
                    error!("Error creating coordination channel for event {}: {}", id, e);
                    Coordination::Failed(e.to_string())
                }
            }
        } else {
            Coordination::NotRequired
        };

        self.strip_controls(moderation_message).await;

        let event = self.store.get(&id).await.unwrap_or(event);
        AcceptOutcome {
            event,
            announcement,
            coordination,
        }
    }

    pub async fn accept(
        &self,
        id: &str,
        reviewer: &str,
        moderation_message: Option<&MessageRef>,
    ) -> Result<AcceptOutcome, EventError> {
        let event = self.commit_accept(id).await?;
        Ok(self.publish_accepted(event, reviewer, moderation_message).await)
    }

    /// Runs `publish_accepted` detached and writes the summary into the deferred reply.
    pub fn publish_in_background(
        &self,
        event: Event,
        reviewer: String,
        moderation_message: Option<MessageRef>,
        reply: Option<InteractionReply>,
    ) -> JoinHandle<AcceptOutcome> {
        let moderation = self.clone();
        tokio::spawn(async move {
            let outcome = moderation
                .publish_accepted(event, &reviewer, moderation_message.as_ref())
                .await;
            match reply {
                Some(reply) => {
                    if let Err(e) = moderation
                        .notifier
                        .edit_original_reply(&reply, &outcome.summary())
                        .await
                    {
                        warn!("Could not report accept of event {}: {}", outcome.event.id(), e);
                    }
                }
                None => warn!("No reply token for accept of event {}", outcome.event.id()),
            }
            outcome
        })
    }

    /// Adds `user_id` to the subscribers and re-renders the announcement counter.
    /// A repeat click reports `AlreadyRegistered` without touching the store.
    pub async fn register_interest(&self, id: &str, user_id: &str) -> Result<InterestOutcome, EventError> {
        let lock = self.interest_lock(id).await;
        let _ordered = lock.lock().await;

        let mut guard = self.store.lock().await;
        let current = guard.get(id).ok_or_else(|| EventError::not_found(id))?;
        if current.is_accepted() && current.subscribers().contains(user_id) {
            return Ok(InterestOutcome {
                title: current.title.clone(),
                interest: Interest::AlreadyRegistered,
            });
        }
        let (interest, event) = guard
            .try_mutate(id, |e| e.add_subscriber(user_id).map(|i| (i, e.clone())))
            .await?;
        drop(guard);

        if let (Interest::Registered { count }, Some(announcement)) = (&interest, event.announcement_ref()) {
            if let Err(e) = self
                .notifier
                .edit_message(announcement, MessagePatch::SetInterestedCount(*count))
                .await
            {
                warn!("Could not update interested count for event {}: {}", id, e);
            }
        }

        Ok(InterestOutcome {
            title: event.title,
            interest,
        })
    }

    /// Deletes `channel` after the grace period. Runs detached; the returned handle can cancel it.
    pub fn close_coordination_channel(&self, channel: ChannelRef) -> ScheduledDeletion {
        let notifier = self.notifier.clone();
        let delay = self.close_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match notifier.delete_channel(&channel).await {
                Ok(()) => info!("Coordination channel {} deleted", channel.channel_id),
                Err(e) => error!("Error deleting channel {}: {}", channel.channel_id, e),
            }
        });
        ScheduledDeletion { handle }
    }
}
