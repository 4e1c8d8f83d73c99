// Error types for intake, moderation and the notification adapter

use thiserror::Error;

/// Result type alias for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors raised by the event lifecycle
#[derive(Debug, Error)]
pub enum EventError {
    /// Slot is not on a :00 or :30 boundary
    #[error("The time must be on the hour (:00) or half past (:30).")]
    InvalidSlot,

    /// Another pending or accepted event already holds the slot
    #[error("That time slot is already taken.")]
    SlotConflict,

    /// Malformed submission (missing field, unparsable date)
    #[error("{0}")]
    Validation(String),

    /// Asset relocation or persistence failed
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Interaction referenced an id the store does not know
    #[error("Event not found or expired: {0}")]
    EventNotFound(String),

    /// Transition not legal from the event's current state
    #[error("Event {id} is {from}; cannot {action}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        action: &'static str,
    },

    /// Downstream chat platform call failed
    #[error("Notification adapter unavailable: {0}")]
    AdapterUnavailable(#[from] AdapterError),
}

impl EventError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EventError::Validation(msg.into())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        EventError::Storage(msg.to_string())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        EventError::EventNotFound(id.into())
    }

    /// Errors caused by the submitter's input, reported back as HTTP 400
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EventError::InvalidSlot | EventError::SlotConflict | EventError::Validation(_)
        )
    }
}

/// Errors at the chat platform boundary
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Rejected(String),
}
