//! Identifier types. Event ids are decimal millisecond timestamps; user, channel and
//! message ids are opaque strings handed to us by the chat platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EventId = String;
pub type UserId = String;
pub type ChannelId = String;

/// A message posted by the adapter, addressable for later edits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: String,
}

impl MessageRef {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// A channel created by the adapter (coordination channels).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub channel_id: ChannelId,
}

impl ChannelRef {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
        }
    }

    /// Platform mention markup, e.g. `<#123>`.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.channel_id)
    }
}

/// Addresses the original reply of an interaction, so a deferred reply can be filled in later.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InteractionReply {
    pub application_id: String,
    pub token: String,
}

impl InteractionReply {
    pub fn new(application_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            token: token.into(),
        }
    }
}

/// Next event id: the current millisecond, bumped past `last` so ids stay unique and increasing.
pub fn next_event_id<'a>(now: DateTime<Utc>, existing: impl IntoIterator<Item = &'a str>) -> EventId {
    let last = existing
        .into_iter()
        .filter_map(|id| id.parse::<i64>().ok())
        .max();
    let millis = now.timestamp_millis();
    match last {
        Some(last) if last >= millis => (last + 1).to_string(),
        _ => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_is_millisecond_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(next_event_id(now, []), now.timestamp_millis().to_string());
    }

    #[test]
    fn id_is_bumped_past_collisions() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let taken = now.timestamp_millis().to_string();
        let next = next_event_id(now, [taken.as_str()]);
        assert_eq!(next, (now.timestamp_millis() + 1).to_string());
    }

    #[test]
    fn non_numeric_ids_are_ignored() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(next_event_id(now, ["legacy"]), now.timestamp_millis().to_string());
    }
}
