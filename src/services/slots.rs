//! Slot rules: events start on :00 or :30 and no two live events share an instant.

use chrono::{DateTime, Timelike, Utc};

use crate::error::EventError;
use crate::models::Event;

/// True iff `at` sits exactly on a half-hour boundary.
pub fn is_quantized(at: DateTime<Utc>) -> bool {
    at.timestamp().rem_euclid(30 * 60) == 0 && at.nanosecond() == 0
}

/// True iff a pending or accepted event starts at exactly `at`.
pub fn is_slot_taken(events: &[Event], at: DateTime<Utc>) -> bool {
    events
        .iter()
        .any(|e| e.occupies_slot() && e.scheduled_at() == at)
}

/// Both checks, quantization first.
pub fn validate(events: &[Event], at: DateTime<Utc>) -> Result<(), EventError> {
    if !is_quantized(at) {
        return Err(EventError::InvalidSlot);
    }
    if is_slot_taken(events, at) {
        return Err(EventError::SlotConflict);
    }
    Ok(())
}

/// Slot invariants broken by a stored collection (e.g. a hand-edited data file).
pub fn audit(events: &[Event]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen: std::collections::HashMap<DateTime<Utc>, &str> = std::collections::HashMap::new();
    for event in events.iter().filter(|e| e.occupies_slot()) {
        if !is_quantized(event.scheduled_at()) {
            problems.push(format!(
                "event {} starts at {}, not on a half-hour boundary",
                event.id(),
                event.scheduled_at()
            ));
        }
        if let Some(other) = seen.insert(event.scheduled_at(), event.id()) {
            problems.push(format!(
                "events {} and {} share the slot {}",
                other,
                event.id(),
                event.scheduled_at()
            ));
        }
    }
    problems
}
