// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical event union produced by the normalizer.
//!
//! One raw webhook "change" may yield any number of canonical events.
//! The ingestion engine dispatches on this union only; raw vendor JSON
//! never crosses the normalization boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContactProfile, DeliveryStatus, MessageContent, ReplyRef};

/// The normalized, type-tagged internal representation of one vendor
/// webhook sub-event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalEvent {
    /// A message sent by a contact to the business.
    InboundMessage(InboundMessage),
    /// Delivery status transition for a previously stored message.
    StatusUpdate(StatusUpdate),
    /// An emoji reaction to (or removal from) an existing message.
    Reaction(ReactionEvent),
    /// Contact display name / photo / about revision.
    ProfileUpdate(ProfileUpdate),
    /// A message template was approved, rejected, paused, or disabled.
    TemplateStatusChange(TemplateStatusChange),
    /// A message template's quality rating changed.
    TemplateQualityChange(TemplateQualityChange),
    /// Account-level alert from the platform.
    AccountAlert(AccountAlert),
    /// Messaging capability change (throughput tier, quality rating).
    CapabilityChange(CapabilityChange),
    /// An outgoing message echoed back by the platform (sent from the
    /// business phone outside this system).
    Echo(EchoMessage),
    /// Opaque tracking event forwarded to downstream subscribers.
    TrackingEvent(TrackingEvent),
    /// A contact changed their marketing-message preferences.
    PreferenceChange(PreferenceChange),
}

impl CanonicalEvent {
    /// Short kind label used in logs and notifications.
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalEvent::InboundMessage(_) => "inbound_message",
            CanonicalEvent::StatusUpdate(_) => "status_update",
            CanonicalEvent::Reaction(_) => "reaction",
            CanonicalEvent::ProfileUpdate(_) => "profile_update",
            CanonicalEvent::TemplateStatusChange(_) => "template_status_change",
            CanonicalEvent::TemplateQualityChange(_) => "template_quality_change",
            CanonicalEvent::AccountAlert(_) => "account_alert",
            CanonicalEvent::CapabilityChange(_) => "capability_change",
            CanonicalEvent::Echo(_) => "echo",
            CanonicalEvent::TrackingEvent(_) => "tracking_event",
            CanonicalEvent::PreferenceChange(_) => "preference_change",
        }
    }
}

/// A normalized inbound message from a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Vendor-assigned message id, unique within a conversation.
    pub external_id: String,
    /// Normalized sender address (the contact).
    pub from: String,
    /// When the contact sent the message.
    pub sent_at: DateTime<Utc>,
    /// Normalized content union.
    pub content: MessageContent,
    /// Back-reference when this message is a reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
}

/// A delivery status transition reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// External id of the message the status refers to.
    pub external_id: String,
    pub status: DeliveryStatus,
    pub at: DateTime<Utc>,
    /// Recipient address, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

/// An emoji reaction event. An empty emoji removes the reactor's entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// The reaction message's own external id (used when recording an
    /// orphan reaction as a standalone message).
    pub external_id: String,
    /// External id of the message being reacted to.
    pub target_id: String,
    /// Address of the reactor.
    pub from: String,
    /// Reaction emoji; empty string means removal.
    pub emoji: String,
    pub at: DateTime<Utc>,
}

/// A contact profile revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Normalized contact address.
    pub contact: String,
    pub profile: ContactProfile,
    pub at: DateTime<Utc>,
}

/// Template lifecycle status change (tenant-level, no aggregate mutation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStatusChange {
    pub template_name: String,
    /// New lifecycle status as reported (approved, rejected, paused, ...).
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Template quality rating change (tenant-level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateQualityChange {
    pub template_name: String,
    pub previous_quality: String,
    pub new_quality: String,
    pub at: DateTime<Utc>,
}

/// Account-level alert (tenant-level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAlert {
    pub severity: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Phone-number capability or quality change (tenant-level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityChange {
    /// What changed (e.g. `messaging_limit`, `quality_rating`).
    pub capability: String,
    pub value: String,
    pub at: DateTime<Utc>,
}

/// An outgoing message echoed by the platform, appended to the
/// conversation with outgoing direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoMessage {
    pub external_id: String,
    /// Recipient contact address.
    pub to: String,
    pub sent_at: DateTime<Utc>,
    pub content: MessageContent,
}

/// Opaque tracking event, fanned out to subscribers without mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_name: String,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// A contact's marketing-message preference change (tenant-level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceChange {
    pub contact: String,
    /// New preference value as reported (`stop`, `resume`).
    pub preference: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_event_kind_labels() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let event = CanonicalEvent::StatusUpdate(StatusUpdate {
            external_id: "wamid.1".into(),
            status: DeliveryStatus::Delivered,
            at,
            recipient: None,
        });
        assert_eq!(event.kind(), "status_update");
    }

    #[test]
    fn canonical_event_serializes_with_kind_tag() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let event = CanonicalEvent::Reaction(ReactionEvent {
            external_id: "wamid.2".into(),
            target_id: "wamid.1".into(),
            from: "+15551230000".into(),
            emoji: "👍".into(),
            at,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "reaction");
        let back: CanonicalEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
