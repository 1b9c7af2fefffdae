// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the Waflow workspace.
//!
//! Everything downstream of the normalizer operates on these types only,
//! never on raw vendor JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One business account whose traffic shares the single webhook endpoint.
///
/// Immutable for the duration of an ingestion; mutated only through the
/// external administration path. Resolvable by any of its three identifiers
/// (phone-number id, account id, verify token), all of which must point to
/// the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Internal tenant identifier.
    pub id: String,
    /// Human-readable business name.
    pub display_name: String,
    /// WhatsApp phone-number id (carried in `metadata.phone_number_id`).
    pub phone_number_id: String,
    /// WhatsApp business account id (carried in `entry.id`).
    pub account_id: String,
    /// Token echoed during the webhook verification handshake.
    pub verify_token: String,
    /// Shared secret for HMAC signature verification. `None` means
    /// verification is skipped for this tenant (best-effort operation).
    pub app_secret: Option<String>,
    /// Lifecycle status. Only `Active` tenants resolve.
    pub status: TenantStatus,
}

/// Tenant lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

/// Direction of a stored message relative to the business.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Per-platform delivery status of a message.
///
/// Ordered: `sent < delivered < read`; `failed` is terminal and overrides
/// any non-failed status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// Monotonic rank used by the status-regression guard.
    pub fn rank(self) -> u8 {
        match self {
            DeliveryStatus::Sent => 0,
            DeliveryStatus::Delivered => 1,
            DeliveryStatus::Read => 2,
            DeliveryStatus::Failed => 3,
        }
    }
}

/// Conversation aggregate lifecycle status.
///
/// An archived or closed conversation is implicitly reactivated by a new
/// inbound message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Archived,
    Closed,
}

/// A media attachment reference (image, video, audio, document, sticker).
///
/// The engine treats media retrieval as an external fetch; only the vendor
/// media id and descriptive fields are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    /// Vendor-assigned media id.
    pub media_id: String,
    /// MIME type, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Caption, for media types that carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A contact card shared inside a `contacts` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedContact {
    /// Formatted display name.
    pub name: String,
    /// Phone numbers attached to the card.
    #[serde(default)]
    pub phones: Vec<String>,
}

/// Normalized message content: a closed union over all supported message
/// types. Unknown vendor types degrade to [`MessageContent::Unknown`]
/// rather than failing normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        body: String,
    },
    Image(Media),
    Video(Media),
    Audio(Media),
    Document(Media),
    Sticker(Media),
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
    Contacts {
        contacts: Vec<SharedContact>,
    },
    ButtonReply {
        id: String,
        title: String,
    },
    ListReply {
        id: String,
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Flow responses are ingested as opaque key/value payloads.
    FlowReply {
        payload: serde_json::Value,
    },
    Reaction {
        target_id: String,
        emoji: String,
    },
    Unknown {
        raw_type: String,
    },
}

impl MessageContent {
    /// Human-readable one-line summary used for conversation previews.
    pub fn preview(&self) -> String {
        match self {
            MessageContent::Text { body } => body.clone(),
            MessageContent::Image(m) => m.caption.clone().unwrap_or_else(|| "[image]".into()),
            MessageContent::Video(m) => m.caption.clone().unwrap_or_else(|| "[video]".into()),
            MessageContent::Audio(_) => "[audio]".into(),
            MessageContent::Document(m) => {
                m.caption.clone().unwrap_or_else(|| "[document]".into())
            }
            MessageContent::Sticker(_) => "[sticker]".into(),
            MessageContent::Location { name, .. } => match name {
                Some(n) => format!("[location: {n}]"),
                None => "[location]".into(),
            },
            MessageContent::Contacts { contacts } => format!("[{} contact(s)]", contacts.len()),
            MessageContent::ButtonReply { title, .. } => title.clone(),
            MessageContent::ListReply { title, .. } => title.clone(),
            MessageContent::FlowReply { .. } => "[flow response]".into(),
            MessageContent::Reaction { emoji, .. } => {
                if emoji.is_empty() {
                    "[reaction removed]".into()
                } else {
                    emoji.clone()
                }
            }
            MessageContent::Unknown { raw_type } => format!("[{raw_type}]"),
        }
    }
}

/// Back-reference carried by a reply message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    /// Quoted external message id.
    pub external_id: String,
    /// Address of the quoted message's sender.
    pub sender: String,
}

/// A single reaction on a message: at most one per reacting address,
/// last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Address of the reactor.
    pub reactor: String,
    /// Reaction emoji. Never empty in stored form; an empty emoji in an
    /// event removes the entry instead.
    pub emoji: String,
    /// Timestamp of the most recent reaction from this reactor.
    pub at: DateTime<Utc>,
}

/// Incoming contact profile fields carried alongside messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

/// Contact profile fields that can change, reported by
/// `apply_profile_update` diffs and recorded in the bounded history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Photo,
    About,
}

/// One recorded profile change, kept in a bounded per-conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChange {
    pub field: ProfileField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    pub at: DateTime<Utc>,
}
