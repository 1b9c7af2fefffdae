// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event normalization: raw vendor webhook JSON to canonical events.
//!
//! A single raw "change" may yield any number of canonical events (a
//! payload with both `messages` and `statuses` arrays yields one event per
//! element of each). Dispatch is driven by the change's `field` tag when
//! present, falling back to inspection of which payload keys exist, since
//! the platform does not set the tag consistently. Unknown message types
//! normalize to a generic fallback; a malformed sub-event is dropped with a
//! warning and never aborts its siblings.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use waflow_core::WaflowError;
use waflow_core::event::{
    AccountAlert, CanonicalEvent, CapabilityChange, EchoMessage, InboundMessage, PreferenceChange,
    ProfileUpdate, ReactionEvent, StatusUpdate, TemplateQualityChange, TemplateStatusChange,
    TrackingEvent,
};
use waflow_core::types::{
    ContactProfile, DeliveryStatus, Media, MessageContent, ReplyRef, SharedContact,
};

/// Expected top-level `object` value; anything else is logged and ignored.
pub const WEBHOOK_OBJECT: &str = "whatsapp_business_account";

// --- Raw vendor payload shapes ---

/// Root webhook payload.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One entry: a business account with a batch of changes.
#[derive(Debug, Deserialize)]
pub struct Entry {
    /// Business account id.
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// One change: an event kind tag plus its payload.
#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

/// The union of payload shapes the platform delivers under `value`.
/// Unknown keys are captured in `extra` for opaque passthrough.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Option<Vec<RawContact>>,
    #[serde(default)]
    pub messages: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub statuses: Option<Vec<RawStatus>>,
    #[serde(default)]
    pub message_echoes: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub user_preferences: Option<Vec<RawUserPreference>>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub message_template_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub previous_quality_score: Option<String>,
    #[serde(default)]
    pub new_quality_score: Option<String>,
    #[serde(default)]
    pub alert_severity: Option<String>,
    #[serde(default)]
    pub alert_description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Phone-number metadata used for tenant resolution.
#[derive(Debug, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    pub phone_number_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawContact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<RawProfile>,
}

#[derive(Debug, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub from: Option<String>,
    /// Recipient, present on echoed outgoing messages.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Epoch seconds as a string.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub msg_type: Option<String>,
    #[serde(default)]
    pub text: Option<RawText>,
    #[serde(default)]
    pub image: Option<RawMedia>,
    #[serde(default)]
    pub video: Option<RawMedia>,
    #[serde(default)]
    pub audio: Option<RawMedia>,
    #[serde(default)]
    pub document: Option<RawMedia>,
    #[serde(default)]
    pub sticker: Option<RawMedia>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub contacts: Option<Vec<RawSharedContact>>,
    #[serde(default)]
    pub interactive: Option<RawInteractive>,
    #[serde(default)]
    pub button: Option<RawButton>,
    #[serde(default)]
    pub reaction: Option<RawReaction>,
    #[serde(default)]
    pub context: Option<RawContext>,
}

#[derive(Debug, Deserialize)]
pub struct RawText {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMedia {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSharedContact {
    #[serde(default)]
    pub name: Option<RawContactName>,
    #[serde(default)]
    pub phones: Option<Vec<RawPhone>>,
}

#[derive(Debug, Deserialize)]
pub struct RawContactName {
    #[serde(default)]
    pub formatted_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawPhone {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawInteractive {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub button_reply: Option<RawIdTitle>,
    #[serde(default)]
    pub list_reply: Option<RawListReply>,
    #[serde(default)]
    pub nfm_reply: Option<RawNfmReply>,
}

#[derive(Debug, Deserialize)]
pub struct RawIdTitle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RawListReply {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Flow ("native flow message") response; the payload arrives as a JSON
/// string and is ingested opaquely.
#[derive(Debug, Deserialize)]
pub struct RawNfmReply {
    #[serde(default)]
    pub response_json: Option<String>,
}

/// Legacy quick-reply button payload.
#[derive(Debug, Deserialize)]
pub struct RawButton {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawReaction {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawContext {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawUserPreference {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// --- Parsing and normalization ---

/// Parse the raw request bytes into the vendor payload shape.
pub fn parse_payload(raw: &[u8]) -> Result<WebhookPayload, WaflowError> {
    serde_json::from_slice(raw).map_err(|e| WaflowError::MalformedPayload(e.to_string()))
}

/// Normalize one raw change into canonical events.
///
/// Within a change, inbound messages are emitted before profile updates so
/// the conversation exists by the time a profile diff runs; status updates
/// come last.
pub fn normalize_change(change: &Change) -> Vec<CanonicalEvent> {
    let value = &change.value;
    match change.field.as_deref() {
        None => untagged_events(value),
        Some("messages") => message_events(value),
        Some("smb_message_echoes") => echo_events(value),
        Some("message_template_status_update") => template_status_events(value),
        Some("message_template_quality_update") => template_quality_events(value),
        Some("account_alerts") => account_alert_events(value),
        Some("phone_number_quality_update") | Some("capability_update") => {
            capability_events(change.field.as_deref().unwrap_or_default(), value)
        }
        Some("user_preferences") => preference_events(value),
        Some(other) => {
            // Unrecognized change kinds pass through opaquely so downstream
            // subscribers still see them.
            tracing::debug!(field = other, "passing through unrecognized change kind");
            vec![CanonicalEvent::TrackingEvent(TrackingEvent {
                event_name: other.to_string(),
                payload: serde_json::Value::Object(value.extra.clone()),
                at: Utc::now(),
            })]
        }
    }
}

/// Dispatch for changes with no `field` tag: pick the handler by which
/// payload keys are present.
fn untagged_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    if value.message_echoes.is_some() {
        return echo_events(value);
    }
    if value.user_preferences.is_some() {
        return preference_events(value);
    }
    message_events(value)
}

fn message_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    let mut events = Vec::new();

    if let Some(messages) = &value.messages {
        for (index, raw) in messages.iter().enumerate() {
            match normalize_message(raw) {
                Ok(event) => events.push(event),
                Err(reason) => {
                    tracing::warn!(index, reason, "dropping malformed message");
                }
            }
        }
    }

    if let Some(contacts) = &value.contacts {
        for contact in contacts {
            if let (Some(wa_id), Some(profile)) = (&contact.wa_id, &contact.profile) {
                let normalized = ContactProfile {
                    name: profile.name.clone(),
                    photo: profile.photo.clone(),
                    about: profile.about.clone(),
                };
                if normalized != ContactProfile::default() {
                    events.push(CanonicalEvent::ProfileUpdate(ProfileUpdate {
                        contact: wa_id.clone(),
                        profile: normalized,
                        at: Utc::now(),
                    }));
                }
            }
        }
    }

    if let Some(statuses) = &value.statuses {
        for (index, raw) in statuses.iter().enumerate() {
            match normalize_status(raw) {
                Ok(event) => events.push(event),
                Err(reason) => {
                    tracing::warn!(index, reason, "dropping malformed status");
                }
            }
        }
    }

    events
}

fn normalize_message(raw: &RawMessage) -> Result<CanonicalEvent, &'static str> {
    let external_id = raw.id.clone().ok_or("missing `id`")?;
    let from = raw.from.clone().ok_or("missing `from`")?;
    let sent_at = epoch_ts(raw.timestamp.as_deref());

    if raw.msg_type.as_deref() == Some("reaction") || raw.reaction.is_some() {
        let reaction = raw.reaction.as_ref().ok_or("reaction without payload")?;
        let target_id = reaction
            .message_id
            .clone()
            .ok_or("reaction missing `message_id`")?;
        return Ok(CanonicalEvent::Reaction(ReactionEvent {
            external_id,
            target_id,
            from,
            emoji: reaction.emoji.clone().unwrap_or_default(),
            at: sent_at,
        }));
    }

    Ok(CanonicalEvent::InboundMessage(InboundMessage {
        external_id,
        from,
        sent_at,
        content: content_from(raw),
        reply_to: reply_ref_from(raw),
    }))
}

fn normalize_status(raw: &RawStatus) -> Result<CanonicalEvent, &'static str> {
    let external_id = raw.id.clone().ok_or("missing `id`")?;
    let status_str = raw.status.as_deref().ok_or("missing `status`")?;
    let status: DeliveryStatus = status_str.parse().map_err(|_| "unknown status value")?;
    Ok(CanonicalEvent::StatusUpdate(StatusUpdate {
        external_id,
        status,
        at: epoch_ts(raw.timestamp.as_deref()),
        recipient: raw.recipient_id.clone(),
    }))
}

fn echo_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    let Some(echoes) = &value.message_echoes else {
        return Vec::new();
    };
    let mut events = Vec::new();
    for (index, raw) in echoes.iter().enumerate() {
        let (Some(external_id), Some(to)) = (raw.id.clone(), raw.to.clone()) else {
            tracing::warn!(index, "dropping echo without `id`/`to`");
            continue;
        };
        events.push(CanonicalEvent::Echo(EchoMessage {
            external_id,
            to,
            sent_at: epoch_ts(raw.timestamp.as_deref()),
            content: content_from(raw),
        }));
    }
    events
}

fn template_status_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    let (Some(template_name), Some(status)) =
        (value.message_template_name.clone(), value.event.clone())
    else {
        tracing::warn!("dropping template status change without name/event");
        return Vec::new();
    };
    vec![CanonicalEvent::TemplateStatusChange(TemplateStatusChange {
        template_name,
        status,
        reason: value.reason.clone().filter(|r| r != "NONE"),
        at: Utc::now(),
    })]
}

fn template_quality_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    let (Some(template_name), Some(previous), Some(new)) = (
        value.message_template_name.clone(),
        value.previous_quality_score.clone(),
        value.new_quality_score.clone(),
    ) else {
        tracing::warn!("dropping template quality change without scores");
        return Vec::new();
    };
    vec![CanonicalEvent::TemplateQualityChange(
        TemplateQualityChange {
            template_name,
            previous_quality: previous,
            new_quality: new,
            at: Utc::now(),
        },
    )]
}

fn account_alert_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    vec![CanonicalEvent::AccountAlert(AccountAlert {
        severity: value
            .alert_severity
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        description: value.alert_description.clone().unwrap_or_default(),
        at: Utc::now(),
    })]
}

fn capability_events(field: &str, value: &ChangeValue) -> Vec<CanonicalEvent> {
    let detail = match value.event.clone() {
        Some(event) => event,
        None => serde_json::Value::Object(value.extra.clone()).to_string(),
    };
    vec![CanonicalEvent::CapabilityChange(CapabilityChange {
        capability: field.to_string(),
        value: detail,
        at: Utc::now(),
    })]
}

fn preference_events(value: &ChangeValue) -> Vec<CanonicalEvent> {
    let Some(preferences) = &value.user_preferences else {
        return Vec::new();
    };
    preferences
        .iter()
        .filter_map(|p| {
            let (Some(contact), Some(preference)) = (p.wa_id.clone(), p.value.clone()) else {
                tracing::warn!("dropping user preference without wa_id/value");
                return None;
            };
            Some(CanonicalEvent::PreferenceChange(PreferenceChange {
                contact,
                preference,
                at: epoch_ts(p.timestamp.as_deref()),
            }))
        })
        .collect()
}

/// Map a raw message body to the canonical content union. Unknown or
/// incomplete types fall back to [`MessageContent::Unknown`].
fn content_from(raw: &RawMessage) -> MessageContent {
    let raw_type = raw.msg_type.as_deref().unwrap_or("unknown");
    typed_content(raw, raw_type).unwrap_or_else(|| MessageContent::Unknown {
        raw_type: raw_type.to_string(),
    })
}

fn typed_content(raw: &RawMessage, raw_type: &str) -> Option<MessageContent> {
    match raw_type {
        "text" => Some(MessageContent::Text {
            body: raw.text.as_ref()?.body.clone(),
        }),
        "image" => Some(MessageContent::Image(media_from(raw.image.as_ref()?)?)),
        "video" => Some(MessageContent::Video(media_from(raw.video.as_ref()?)?)),
        "audio" => Some(MessageContent::Audio(media_from(raw.audio.as_ref()?)?)),
        "document" => Some(MessageContent::Document(media_from(
            raw.document.as_ref()?,
        )?)),
        "sticker" => Some(MessageContent::Sticker(media_from(raw.sticker.as_ref()?)?)),
        "location" => {
            let location = raw.location.as_ref()?;
            Some(MessageContent::Location {
                latitude: location.latitude,
                longitude: location.longitude,
                name: location.name.clone(),
                address: location.address.clone(),
            })
        }
        "contacts" => {
            let cards = raw.contacts.as_ref()?;
            Some(MessageContent::Contacts {
                contacts: cards
                    .iter()
                    .map(|c| SharedContact {
                        name: c
                            .name
                            .as_ref()
                            .and_then(|n| n.formatted_name.clone())
                            .unwrap_or_default(),
                        phones: c
                            .phones
                            .iter()
                            .flatten()
                            .filter_map(|p| p.phone.clone())
                            .collect(),
                    })
                    .collect(),
            })
        }
        "interactive" => interactive_content(raw.interactive.as_ref()?),
        "button" => {
            let button = raw.button.as_ref()?;
            Some(MessageContent::ButtonReply {
                id: button.payload.clone().unwrap_or_default(),
                title: button.text.clone()?,
            })
        }
        _ => None,
    }
}

fn media_from(raw: &RawMedia) -> Option<Media> {
    Some(Media {
        media_id: raw.id.clone()?,
        mime_type: raw.mime_type.clone(),
        caption: raw.caption.clone(),
    })
}

fn interactive_content(interactive: &RawInteractive) -> Option<MessageContent> {
    match interactive.kind.as_deref() {
        Some("button_reply") => {
            let reply = interactive.button_reply.as_ref()?;
            Some(MessageContent::ButtonReply {
                id: reply.id.clone(),
                title: reply.title.clone(),
            })
        }
        Some("list_reply") => {
            let reply = interactive.list_reply.as_ref()?;
            Some(MessageContent::ListReply {
                id: reply.id.clone(),
                title: reply.title.clone(),
                description: reply.description.clone(),
            })
        }
        Some("nfm_reply") => {
            let reply = interactive.nfm_reply.as_ref()?;
            let raw_json = reply.response_json.as_deref()?;
            let payload = serde_json::from_str(raw_json)
                .unwrap_or_else(|_| serde_json::Value::String(raw_json.to_string()));
            Some(MessageContent::FlowReply { payload })
        }
        _ => None,
    }
}

fn reply_ref_from(raw: &RawMessage) -> Option<ReplyRef> {
    let context = raw.context.as_ref()?;
    match (&context.id, &context.from) {
        (Some(id), Some(from)) => Some(ReplyRef {
            external_id: id.clone(),
            sender: from.clone(),
        }),
        _ => None,
    }
}

/// Parse the vendor's epoch-seconds-as-string timestamp, falling back to
/// the current time when absent or unparseable.
fn epoch_ts(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now)
}
