//! The event record and its lifecycle.
//!
//! `status`, `subscribers` and `startNotified` are private: the transition methods below are
//! the only way to change them, so the lifecycle invariants hold wherever an `Event` travels.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::models::ids::{EventId, MessageRef, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Accepted,
    Rejected {
        #[serde(
            rename = "rejectionReason",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reason: Option<String>,
    },
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Accepted => "accepted",
            EventStatus::Rejected { .. } => "rejected",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mapping support owns the reference images uploaded with the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSupport {
    pub detail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Support requested from the events team. `None` means "not needed".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportNeeds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingSupport>,
}

impl SupportNeeds {
    pub fn any(&self) -> bool {
        self.vehicles.is_some() || self.radio.is_some() || self.mapping.is_some()
    }

    pub fn mapping_images(&self) -> &[String] {
        self.mapping.as_ref().map(|m| m.images.as_slice()).unwrap_or_default()
    }
}

/// Everything the requester supplies. Becomes an `Event` once intake assigns an id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub requester_id: UserId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub flyer_asset: Option<String>,
    pub support_needs: SupportNeeds,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: EventId,
    pub requester_id: UserId,
    pub title: String,
    pub description: String,
    scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub flyer_asset: Option<String>,
    #[serde(default)]
    pub support_needs: SupportNeeds,
    #[serde(flatten)]
    status: EventStatus,
    #[serde(default)]
    subscribers: BTreeSet<UserId>,
    #[serde(default)]
    announcement_ref: Option<MessageRef>,
    #[serde(default)]
    start_notified: bool,
}

/// Result of an interest click.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interest {
    Registered { count: usize },
    AlreadyRegistered,
}

impl Event {
    pub fn new(id: EventId, draft: EventDraft) -> Self {
        Self {
            id,
            requester_id: draft.requester_id,
            title: draft.title,
            description: draft.description,
            scheduled_at: draft.scheduled_at,
            flyer_asset: draft.flyer_asset,
            support_needs: draft.support_needs,
            status: EventStatus::Pending,
            subscribers: BTreeSet::new(),
            announcement_ref: None,
            start_notified: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn status(&self) -> &EventStatus {
        &self.status
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.status {
            EventStatus::Rejected { reason } => reason.as_deref(),
            _ => None,
        }
    }

    pub fn subscribers(&self) -> &BTreeSet<UserId> {
        &self.subscribers
    }

    pub fn announcement_ref(&self) -> Option<&MessageRef> {
        self.announcement_ref.as_ref()
    }

    pub fn start_notified(&self) -> bool {
        self.start_notified
    }

    pub fn is_accepted(&self) -> bool {
        self.status == EventStatus::Accepted
    }

    /// Holds a slot: anything that is not rejected.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self.status, EventStatus::Rejected { .. })
    }

    pub fn requires_support(&self) -> bool {
        self.support_needs.any()
    }

    fn invalid(&self, action: &'static str) -> EventError {
        EventError::InvalidTransition {
            id: self.id.clone(),
            from: self.status.as_str(),
            action,
        }
    }

    pub fn accept(&mut self) -> Result<(), EventError> {
        if self.status != EventStatus::Pending {
            return Err(self.invalid("accept"));
        }
        self.status = EventStatus::Accepted;
        Ok(())
    }

    /// Blank reasons are stored as absent.
    pub fn reject(&mut self, reason: Option<String>) -> Result<(), EventError> {
        if self.status != EventStatus::Pending {
            return Err(self.invalid("reject"));
        }
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.status = EventStatus::Rejected { reason };
        Ok(())
    }

    pub fn add_subscriber(&mut self, user_id: &str) -> Result<Interest, EventError> {
        if !self.is_accepted() {
            return Err(self.invalid("register interest"));
        }
        if !self.subscribers.insert(user_id.to_string()) {
            return Ok(Interest::AlreadyRegistered);
        }
        Ok(Interest::Registered {
            count: self.subscribers.len(),
        })
    }

    /// Records the public announcement. The first reference wins.
    pub fn record_announcement(&mut self, announcement: MessageRef) -> bool {
        if self.announcement_ref.is_some() {
            return false;
        }
        self.announcement_ref = Some(announcement);
        true
    }

    /// Flips the start latch. Returns `false` if it was already set or the event is not accepted.
    pub fn claim_start_notification(&mut self) -> bool {
        if !self.is_accepted() || self.start_notified {
            return false;
        }
        self.start_notified = true;
        true
    }
}
