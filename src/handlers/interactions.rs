// Chat platform interaction ingress: button presses and modal submissions, dispatched to the
// moderation state machine. Replies use the platform's interaction response shape.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EventError;
use crate::models::{ChannelRef, Interest, InteractionReply, MessageRef};
use crate::notifier::custom_id::{self, ComponentAction, REJECT_REASON_INPUT};
use crate::AppState;

const PING: u8 = 1;
const COMPONENT: u8 = 3;
const MODAL_SUBMIT: u8 = 5;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED_MESSAGE: u8 = 5;
const RESPONSE_MODAL: u8 = 9;
const EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Default, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub components: Vec<ModalRow>,
}

#[derive(Debug, Deserialize)]
pub struct ModalRow {
    #[serde(default)]
    pub components: Vec<TextInputValue>,
}

#[derive(Debug, Deserialize)]
pub struct TextInputValue {
    pub custom_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionMessage {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl Interaction {
    /// Acting user: guild interactions carry `member.user`, DMs carry `user`.
    pub fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .map(|m| m.user.id.as_str())
            .or_else(|| self.user.as_ref().map(|u| u.id.as_str()))
    }

    fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }

    /// The message the control was attached to.
    pub fn message_ref(&self) -> Option<MessageRef> {
        let message = self.message.as_ref()?;
        let channel = message.channel_id.as_ref().or(self.channel_id.as_ref())?;
        Some(MessageRef::new(channel.clone(), message.id.clone()))
    }

    /// Handle for editing this interaction's reply after a deferred response.
    pub fn reply_ref(&self) -> Option<InteractionReply> {
        Some(InteractionReply::new(
            self.application_id.clone()?,
            self.token.clone()?,
        ))
    }

    pub fn text_input(&self, id: &str) -> Option<String> {
        self.data
            .as_ref()?
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .find(|input| input.custom_id == id)
            .and_then(|input| input.value.clone())
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_MESSAGE,
            data: Some(json!({ "content": content.into(), "flags": EPHEMERAL })),
        }
    }

    /// "Thinking..." placeholder; the real text arrives through `edit_original_reply`.
    pub fn deferred_ephemeral() -> Self {
        Self {
            kind: RESPONSE_DEFERRED_MESSAGE,
            data: Some(json!({ "flags": EPHEMERAL })),
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_MESSAGE,
            data: Some(json!({ "content": content.into() })),
        }
    }

    /// Secondary text prompt collecting the rejection reason.
    pub fn reject_reason_prompt(event_id: &str) -> Self {
        Self {
            kind: RESPONSE_MODAL,
            data: Some(json!({
                "custom_id": custom_id::reject_modal_id(event_id),
                "title": "Rejection reason",
                "components": [{
                    "type": 1,
                    "components": [{
                        "type": 4,
                        "custom_id": REJECT_REASON_INPUT,
                        "label": "Reason",
                        "style": 2,
                    }]
                }]
            })),
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.data.as_ref()?.get("content")?.as_str()
    }
}

/// Notice shown to the actor when a transition cannot be applied.
fn notice(e: &EventError) -> InteractionResponse {
    match e {
        EventError::EventNotFound(_) => InteractionResponse::ephemeral("❌ Event not found or expired."),
        EventError::InvalidTransition {
            action: "register interest",
            from,
            ..
        } => {
            if *from == "pending" {
                InteractionResponse::ephemeral("⚠️ This event is not open for interest yet.")
            } else {
                InteractionResponse::ephemeral("⚠️ This event is no longer open for interest.")
            }
        }
        EventError::InvalidTransition { from, .. } => {
            InteractionResponse::ephemeral(format!("⚠️ This event is already {}.", from))
        }
        other => {
            tracing::error!("Interaction failed: {}", other);
            InteractionResponse::ephemeral("❌ Something went wrong, please try again.")
        }
    }
}

async fn on_component(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let Some(action) = interaction.custom_id().and_then(ComponentAction::parse) else {
        return InteractionResponse::ephemeral("Unknown action.");
    };
    let message = interaction.message_ref();

    match action {
        ComponentAction::CloseTicket => {
            let Some(channel_id) = interaction.channel_id.clone() else {
                return InteractionResponse::ephemeral("Unknown channel.");
            };
            // detached; the channel goes away with this interaction's reply
            let _deletion = state
                .moderation
                .close_coordination_channel(ChannelRef::new(channel_id));
            InteractionResponse::public(format!(
                "🗑️ Closing ticket and deleting this channel in {} seconds...",
                state.config.close_channel_delay.as_secs()
            ))
        }
        ComponentAction::Accept(id) => {
            let Some(reviewer) = interaction.user_id() else {
                return InteractionResponse::ephemeral("Unknown user.");
            };
            let event = match state.moderation.commit_accept(&id).await {
                Ok(event) => event,
                Err(e) => return notice(&e),
            };
            // publishing may outlive the platform's reply window
            let _publishing = state.moderation.publish_in_background(
                event,
                reviewer.to_string(),
                message,
                interaction.reply_ref(),
            );
            InteractionResponse::deferred_ephemeral()
        }
        ComponentAction::Reject(id) => match state.moderation.begin_reject(&id).await {
            Ok(event) => InteractionResponse::reject_reason_prompt(event.id()),
            Err(e) => notice(&e),
        },
        ComponentAction::Interested(id) => {
            let Some(user_id) = interaction.user_id() else {
                return InteractionResponse::ephemeral("Unknown user.");
            };
            match state.moderation.register_interest(&id, user_id).await {
                Ok(outcome) => match outcome.interest {
                    Interest::Registered { .. } => {
                        InteractionResponse::ephemeral(format!("✅ You're in for **{}**.", outcome.title))
                    }
                    Interest::AlreadyRegistered => {
                        InteractionResponse::ephemeral("You were already registered.")
                    }
                },
                Err(e) => notice(&e),
            }
        }
    }
}

async fn on_modal_submit(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let Some(id) = interaction.custom_id().and_then(custom_id::parse_reject_modal) else {
        return InteractionResponse::ephemeral("Unknown form.");
    };
    let reason = interaction.text_input(REJECT_REASON_INPUT);
    match state
        .moderation
        .reject(&id, reason, interaction.message_ref().as_ref())
        .await
    {
        Ok(_) => InteractionResponse::ephemeral("❌ Rejected."),
        Err(e) => notice(&e),
    }
}

pub async fn handle_interaction(
    State(state): State<AppState>,
    Json(interaction): Json<Interaction>,
) -> Result<Json<InteractionResponse>, (StatusCode, Json<Value>)> {
    let response = match interaction.kind {
        PING => InteractionResponse::pong(),
        COMPONENT => on_component(&state, &interaction).await,
        MODAL_SUBMIT => on_modal_submit(&state, &interaction).await,
        other => {
            tracing::warn!("Unsupported interaction type {}", other);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Unsupported interaction type {}", other) })),
            ));
        }
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_component_press() {
        let interaction: Interaction = serde_json::from_value(json!({
            "type": 3,
            "channel_id": "c1",
            "member": { "user": { "id": "u1" } },
            "message": { "id": "m1" },
            "data": { "custom_id": "accept_17", "component_type": 2 }
        }))
        .unwrap();

        assert_eq!(interaction.user_id(), Some("u1"));
        assert_eq!(interaction.reply_ref(), None);
        assert_eq!(interaction.message_ref(), Some(MessageRef::new("c1", "m1")));
        assert_eq!(
            interaction.custom_id().and_then(ComponentAction::parse),
            Some(ComponentAction::Accept("17".into()))
        );
    }

    #[test]
    fn reads_modal_text_input() {
        let interaction: Interaction = serde_json::from_value(json!({
            "type": 5,
            "user": { "id": "u2" },
            "data": {
                "custom_id": "modalReject_17",
                "components": [{ "type": 1, "components": [
                    { "type": 4, "custom_id": "reason", "value": "double booked" }
                ]}]
            }
        }))
        .unwrap();

        assert_eq!(interaction.user_id(), Some("u2"));
        assert_eq!(interaction.text_input("reason").as_deref(), Some("double booked"));
        assert_eq!(interaction.text_input("other"), None);
    }

    #[test]
    fn interest_notice_depends_on_the_event_state() {
        let not_yet = notice(&EventError::InvalidTransition {
            id: "1".into(),
            from: "pending",
            action: "register interest",
        });
        let closed = notice(&EventError::InvalidTransition {
            id: "1".into(),
            from: "rejected",
            action: "register interest",
        });
        let decided = notice(&EventError::InvalidTransition {
            id: "1".into(),
            from: "accepted",
            action: "accept",
        });

        assert_eq!(not_yet.content(), Some("⚠️ This event is not open for interest yet."));
        assert_eq!(closed.content(), Some("⚠️ This event is no longer open for interest."));
        assert_eq!(decided.content(), Some("⚠️ This event is already accepted."));
    }

    #[test]
    fn deferred_reply_carries_no_content() {
        let response = InteractionResponse::deferred_ephemeral();
        assert_eq!(response.kind, RESPONSE_DEFERRED_MESSAGE);
        assert_eq!(response.content(), None);
        assert_eq!(response.data.unwrap()["flags"], EPHEMERAL);
    }

    #[test]
    fn reject_prompt_is_a_modal_bound_to_the_event() {
        let response = InteractionResponse::reject_reason_prompt("17");
        assert_eq!(response.kind, RESPONSE_MODAL);
        assert_eq!(response.data.unwrap()["custom_id"], "modalReject_17");
    }
}
