use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::DiscordConfig;
use crate::error::AdapterError;
use crate::models::{ChannelRef, Event, InteractionReply, MessageRef};
use crate::notifier::render::{self, Embed, MessagePayload};
use crate::notifier::{MessagePatch, Notifier, Participants};

const VIEW_CHANNEL: u64 = 1 << 10;
const SEND_MESSAGES: u64 = 1 << 11;
const ATTACH_FILES: u64 = 1 << 15;
const MANAGE_CHANNELS: u64 = 1 << 4;

const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;
const GUILD_TEXT: u8 = 0;

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FetchedMessage {
    #[serde(default)]
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PermissionOverwrite {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    allow: String,
    deny: String,
}

impl PermissionOverwrite {
    fn new(id: &str, kind: u8, allow: u64, deny: u64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            allow: allow.to_string(),
            deny: deny.to_string(),
        }
    }
}

/// REST client for the chat platform, authenticated as the bot.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
    public_base_url: String,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig, public_base_url: String) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config,
            public_base_url,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.config.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, AdapterError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AdapterError::Status { status, body })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AdapterError> {
        Ok(self.send(request).await?.json::<T>().await?)
    }

    fn channel<'a>(id: &'a str, name: &'static str) -> Result<&'a str, AdapterError> {
        if id.is_empty() {
            Err(AdapterError::NotConfigured(name))
        } else {
            Ok(id)
        }
    }

    async fn post_message(&self, channel_id: &str, payload: &MessagePayload) -> Result<MessageRef, AdapterError> {
        let created: CreatedMessage = self
            .send_json(
                self.request(Method::POST, &format!("/channels/{}/messages", channel_id))
                    .json(payload),
            )
            .await?;
        debug!("Posted message {} in channel {}", created.id, created.channel_id);
        Ok(MessageRef::new(created.channel_id, created.id))
    }

    fn message_path(message: &MessageRef) -> String {
        format!("/channels/{}/messages/{}", message.channel_id, message.message_id)
    }

    fn coordination_overwrites(&self, participants: &Participants) -> Vec<PermissionOverwrite> {
        let mut overwrites = vec![
            // the guild id doubles as the @everyone role id
            PermissionOverwrite::new(&self.config.guild_id, OVERWRITE_ROLE, 0, VIEW_CHANNEL),
            PermissionOverwrite::new(
                &participants.requester,
                OVERWRITE_MEMBER,
                VIEW_CHANNEL | SEND_MESSAGES | ATTACH_FILES,
                0,
            ),
            PermissionOverwrite::new(
                &participants.reviewer,
                OVERWRITE_MEMBER,
                VIEW_CHANNEL | SEND_MESSAGES,
                0,
            ),
        ];
        if !self.config.bot_user_id.is_empty() {
            overwrites.push(PermissionOverwrite::new(
                &self.config.bot_user_id,
                OVERWRITE_MEMBER,
                VIEW_CHANNEL | SEND_MESSAGES | MANAGE_CHANNELS,
                0,
            ));
        }
        overwrites
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn post_moderation_request(&self, event: &Event) -> Result<MessageRef, AdapterError> {
        let channel = Self::channel(&self.config.requests_channel_id, "CHANNEL_ID_REQUESTS")?;
        let payload = render::moderation_request(event, &self.public_base_url);
        self.post_message(channel, &payload).await
    }

    async fn edit_message(&self, message: &MessageRef, patch: MessagePatch) -> Result<(), AdapterError> {
        let body = match patch {
            MessagePatch::StripControls => json!({ "components": [] }),
            MessagePatch::SetInterestedCount(count) => {
                let current: FetchedMessage = self
                    .send_json(self.request(Method::GET, &Self::message_path(message)))
                    .await?;
                let mut embeds = current.embeds;
                let updated = embeds
                    .first_mut()
                    .map(|embed| render::set_interested_count(embed, count))
                    .unwrap_or(false);
                if !updated {
                    return Err(AdapterError::Rejected(format!(
                        "message {} has no interested field",
                        message.message_id
                    )));
                }
                json!({ "embeds": embeds })
            }
        };
        self.send(
            self.request(Method::PATCH, &Self::message_path(message))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn publish_announcement(&self, event: &Event) -> Result<MessageRef, AdapterError> {
        let channel = Self::channel(&self.config.announcements_channel_id, "CHANNEL_ID_ANNOUNCEMENTS")?;
        let payload = render::announcement(event, &self.public_base_url);
        self.post_message(channel, &payload).await
    }

    async fn create_coordination_channel(
        &self,
        event: &Event,
        participants: &Participants,
    ) -> Result<ChannelRef, AdapterError> {
        let guild = Self::channel(&self.config.guild_id, "GUILD_ID")?;
        let mut body = json!({
            "name": render::coordination_channel_name(event),
            "type": GUILD_TEXT,
            "permission_overwrites": self.coordination_overwrites(participants),
        });
        if !self.config.tickets_category_id.is_empty() {
            body["parent_id"] = json!(self.config.tickets_category_id);
        }
        let created: CreatedChannel = self
            .send_json(
                self.request(Method::POST, &format!("/guilds/{}/channels", guild))
                    .json(&body),
            )
            .await?;
        let channel = ChannelRef::new(created.id);
        self.post_message(&channel.channel_id, &render::coordination_welcome(event))
            .await?;
        Ok(channel)
    }

    async fn delete_channel(&self, channel: &ChannelRef) -> Result<(), AdapterError> {
        self.send(self.request(Method::DELETE, &format!("/channels/{}", channel.channel_id)))
            .await?;
        Ok(())
    }

    async fn post_start_announcement(&self, event: &Event) -> Result<(), AdapterError> {
        let channel = Self::channel(&self.config.announcements_channel_id, "CHANNEL_ID_ANNOUNCEMENTS")?;
        let payload = render::start_announcement(event, Utc::now());
        self.post_message(channel, &payload).await?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), AdapterError> {
        let dm: CreatedChannel = self
            .send_json(
                self.request(Method::POST, "/users/@me/channels")
                    .json(&json!({ "recipient_id": user_id })),
            )
            .await?;
        let payload = MessagePayload {
            content: Some(text.to_string()),
            ..Default::default()
        };
        self.post_message(&dm.id, &payload).await?;
        Ok(())
    }

    async fn edit_original_reply(&self, reply: &InteractionReply, text: &str) -> Result<(), AdapterError> {
        let path = format!(
            "/webhooks/{}/{}/messages/@original",
            reply.application_id, reply.token
        );
        self.send(
            self.request(Method::PATCH, &path)
                .json(&json!({ "content": text })),
        )
        .await?;
        Ok(())
    }
}
