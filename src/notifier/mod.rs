// Notification adapter boundary
//
// Everything the lifecycle needs from the chat platform goes through `Notifier`:
// - `DiscordNotifier` talks to the platform REST API
// - `LogNotifier` only logs, for running without credentials
// - tests plug in recording or mock implementations

pub mod custom_id;
pub mod discord;
pub mod render;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AdapterError;
use crate::models::{ChannelRef, Event, InteractionReply, MessageRef, UserId};

pub use discord::DiscordNotifier;

/// Edits applied to an already-posted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessagePatch {
    /// Remove every button row.
    StripControls,
    /// Re-render the interested counter, keeping the rest of the message.
    SetInterestedCount(usize),
}

/// Who gets access to a coordination channel besides the bot itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participants {
    pub requester: UserId,
    pub reviewer: UserId,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts the review request with Accept/Reject controls.
    async fn post_moderation_request(&self, event: &Event) -> Result<MessageRef, AdapterError>;

    async fn edit_message(&self, message: &MessageRef, patch: MessagePatch) -> Result<(), AdapterError>;

    async fn strip_controls(&self, message: &MessageRef) -> Result<(), AdapterError> {
        self.edit_message(message, MessagePatch::StripControls).await
    }

    /// Posts the public announcement and returns its reference for later re-rendering.
    async fn publish_announcement(&self, event: &Event) -> Result<MessageRef, AdapterError>;

    /// Creates a private channel for the participants and posts the welcome message in it.
    async fn create_coordination_channel(
        &self,
        event: &Event,
        participants: &Participants,
    ) -> Result<ChannelRef, AdapterError>;

    async fn delete_channel(&self, channel: &ChannelRef) -> Result<(), AdapterError>;

    /// Posts the public "starting now" notice.
    async fn post_start_announcement(&self, event: &Event) -> Result<(), AdapterError>;

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), AdapterError>;

    /// Fills in a deferred interaction reply.
    async fn edit_original_reply(&self, reply: &InteractionReply, text: &str) -> Result<(), AdapterError>;
}

/// Logs every call and succeeds with synthetic references.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

fn local_ref(channel: &str) -> MessageRef {
    MessageRef::new(channel, format!("local-{}", Uuid::new_v4().simple()))
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn post_moderation_request(&self, event: &Event) -> Result<MessageRef, AdapterError> {
        info!(
            "[notifier] moderation request for event {} ({}), support={}",
            event.id(),
            event.title,
            event.requires_support()
        );
        Ok(local_ref("requests"))
    }

    async fn edit_message(&self, message: &MessageRef, patch: MessagePatch) -> Result<(), AdapterError> {
        info!("[notifier] edit {}/{}: {:?}", message.channel_id, message.message_id, patch);
        Ok(())
    }

    async fn publish_announcement(&self, event: &Event) -> Result<MessageRef, AdapterError> {
        info!("[notifier] announcement for event {} ({})", event.id(), event.title);
        Ok(local_ref("announcements"))
    }

    async fn create_coordination_channel(
        &self,
        event: &Event,
        participants: &Participants,
    ) -> Result<ChannelRef, AdapterError> {
        info!(
            "[notifier] coordination channel for event {} (requester={}, reviewer={})",
            event.id(),
            participants.requester,
            participants.reviewer
        );
        Ok(ChannelRef::new(render::coordination_channel_name(event)))
    }

    async fn delete_channel(&self, channel: &ChannelRef) -> Result<(), AdapterError> {
        info!("[notifier] delete channel {}", channel.channel_id);
        Ok(())
    }

    async fn post_start_announcement(&self, event: &Event) -> Result<(), AdapterError> {
        let payload = render::start_announcement(event, Utc::now());
        info!(
            "[notifier] start announcement for event {}: {}",
            event.id(),
            payload.content.unwrap_or_default()
        );
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), AdapterError> {
        info!("[notifier] DM to {}: {}", user_id, text);
        Ok(())
    }

    async fn edit_original_reply(&self, reply: &InteractionReply, text: &str) -> Result<(), AdapterError> {
        info!("[notifier] reply for application {}: {}", reply.application_id, text);
        Ok(())
    }
}
