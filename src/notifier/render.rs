//! Message rendering. Pure functions from an `Event` to the chat platform's message shape.

use serde::{Deserialize, Serialize};

use crate::models::Event;
use crate::notifier::custom_id::ComponentAction;

pub const COLOR_SUPPORT: u32 = 0xFF0000;
pub const COLOR_STANDARD: u32 = 0xFFA500;
pub const COLOR_ANNOUNCEMENT: u32 = 0x5865F2;
pub const COLOR_STARTING: u32 = 0xFF0000;

/// Name of the announcement field holding the subscriber count.
pub const INTERESTED_FIELD: &str = "👥 Interested";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Success = 3,
    Danger = 4,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Emoji>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        Self { kind: 1, components }
    }
}

/// A message body: text content, embeds and button rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub components: Vec<ActionRow>,
}

fn button(action: ComponentAction, label: &str, style: ButtonStyle, emoji: Option<&str>) -> Button {
    Button {
        kind: 2,
        style: style as u8,
        label: label.to_string(),
        custom_id: action.custom_id(),
        emoji: emoji.map(|name| Emoji {
            name: name.to_string(),
        }),
    }
}

fn field(name: &str, value: impl Into<String>, inline: bool) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.into(),
        inline,
    }
}

/// Field values may not be empty; blank text renders as a dash.
fn or_placeholder(text: &str) -> String {
    if text.trim().is_empty() {
        "-".to_string()
    } else {
        text.to_string()
    }
}

/// Absolute URL for an asset path relative to the uploads root.
pub fn asset_url(base_url: &str, asset: &str) -> String {
    format!("{}/uploads/{}", base_url.trim_end_matches('/'), asset)
}

pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// `"1 person"`, `"2 people"`.
pub fn interested_count(count: usize) -> String {
    if count == 1 {
        "1 person".to_string()
    } else {
        format!("{} people", count)
    }
}

/// Rewrites the interested field in place, leaving every other field alone.
/// Returns `false` when the embed has no such field.
pub fn set_interested_count(embed: &mut Embed, count: usize) -> bool {
    match embed
        .fields
        .iter_mut()
        .find(|f| f.name.contains("Interested"))
    {
        Some(f) => {
            f.value = interested_count(count);
            true
        }
        None => false,
    }
}

/// Review request posted to the moderators, with Accept/Reject controls.
pub fn moderation_request(event: &Event, base_url: &str) -> MessagePayload {
    let support = event.requires_support();
    let needs = &event.support_needs;
    let mut embed = Embed {
        title: Some(if support {
            "🚨 Request with technical support".to_string()
        } else {
            "📢 New standard request".to_string()
        }),
        color: Some(if support { COLOR_SUPPORT } else { COLOR_STANDARD }),
        fields: vec![
            field("👤 Requester", mention(&event.requester_id), true),
            field(
                "📅 Date (UTC)",
                event.scheduled_at().format("%d/%m/%Y %H:%M").to_string(),
                true,
            ),
            field("📝 Title", or_placeholder(&event.title), false),
            field("📄 Description", or_placeholder(&event.description), false),
        ],
        ..Default::default()
    };

    if support {
        embed.fields.push(field(
            "---------------------------------",
            "**🛠️ Requested support**",
            false,
        ));
        if let Some(vehicles) = &needs.vehicles {
            embed.fields.push(field("🚗 Vehicles", format!("```{}```", vehicles), false));
        }
        if let Some(mapping) = &needs.mapping {
            embed.fields.push(field("🏗️ Mapping", format!("```{}```", mapping.detail), false));
        }
        if needs.radio.is_some() {
            embed.fields.push(field("📻 Radio", "✅ Radio setup required.", false));
        }
    } else {
        embed
            .fields
            .push(field("✅ Support", "No technical support required.", false));
    }

    let images = needs.mapping_images();
    if !images.is_empty() {
        let links: Vec<String> = images
            .iter()
            .enumerate()
            .map(|(i, p)| format!("[map {}]({})", i + 1, asset_url(base_url, p)))
            .collect();
        embed.fields.push(field(
            "📂 Mapping files",
            format!("{} reference images: {}", images.len(), links.join(" ")),
            false,
        ));
    }

    if let Some(flyer) = &event.flyer_asset {
        embed.image = Some(EmbedImage {
            url: asset_url(base_url, flyer),
        });
    }

    MessagePayload {
        content: None,
        embeds: vec![embed],
        components: vec![ActionRow::new(vec![
            button(
                ComponentAction::Accept(event.id().to_string()),
                "Accept",
                ButtonStyle::Success,
                None,
            ),
            button(
                ComponentAction::Reject(event.id().to_string()),
                "Reject",
                ButtonStyle::Danger,
                None,
            ),
        ])],
    }
}

/// Public announcement with the interested counter and the "I'm interested" control.
pub fn announcement(event: &Event, base_url: &str) -> MessagePayload {
    let ts = event.scheduled_at().timestamp();
    let embed = Embed {
        title: Some(format!("📅 New event: {}", event.title)),
        description: Some(event.description.clone()).filter(|d| !d.trim().is_empty()),
        color: Some(COLOR_ANNOUNCEMENT),
        fields: vec![
            field("🕒 Date and time", format!("<t:{ts}:F>\n(<t:{ts}:R>)"), false),
            field(INTERESTED_FIELD, interested_count(event.subscribers().len()), false),
        ],
        image: event.flyer_asset.as_ref().map(|flyer| EmbedImage {
            url: asset_url(base_url, flyer),
        }),
        footer: Some(EmbedFooter {
            text: "Event requested from the events team.".to_string(),
        }),
        timestamp: None,
    };
    MessagePayload {
        content: None,
        embeds: vec![embed],
        components: vec![ActionRow::new(vec![button(
            ComponentAction::Interested(event.id().to_string()),
            "I'm interested",
            ButtonStyle::Primary,
            Some("⭐"),
        )])],
    }
}

pub fn coordination_channel_name(event: &Event) -> String {
    format!("event-ticket-{}", event.id())
}

/// First message in a coordination channel, carrying the close control.
pub fn coordination_welcome(event: &Event) -> MessagePayload {
    let needs = &event.support_needs;
    let mut lines = Vec::new();
    if needs.vehicles.is_some() {
        lines.push("• Vehicles");
    }
    if needs.mapping.is_some() {
        lines.push("• Mapping");
    }
    if needs.radio.is_some() {
        lines.push("• Radio");
    }
    MessagePayload {
        content: Some(format!(
            "👋 Hi {},\n\nThis is your private support channel. An admin will be with you shortly.\nWhen support is finished, press the button to delete this chat.",
            mention(&event.requester_id)
        )),
        embeds: vec![Embed {
            title: Some(format!("Support for: {}", event.title)),
            description: Some(format!("Channel created to coordinate:\n{}", lines.join("\n"))),
            color: Some(COLOR_STANDARD),
            ..Default::default()
        }],
        components: vec![ActionRow::new(vec![button(
            ComponentAction::CloseTicket,
            "Close ticket",
            ButtonStyle::Danger,
            Some("🗑️"),
        )])],
    }
}

/// Public "starting now" notice.
pub fn start_announcement(event: &Event, now: chrono::DateTime<chrono::Utc>) -> MessagePayload {
    MessagePayload {
        content: Some(format!(
            "📢 Heads up! The event by {} starts now.",
            mention(&event.requester_id)
        )),
        embeds: vec![Embed {
            title: Some(format!("🔔 Starting now: {}", event.title)),
            description: Some(format!(
                "The event is starting right now.\n\n**Interested:** {}.",
                interested_count(event.subscribers().len())
            )),
            color: Some(COLOR_STARTING),
            timestamp: Some(now.to_rfc3339()),
            ..Default::default()
        }],
        components: Vec::new(),
    }
}

pub fn start_direct_message(event: &Event) -> String {
    format!("🚀 **Hurry!** The event **{}** is starting now.", event.title)
}
