// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-facing models for the conversation aggregate and the outcome
//! enums reported by the idempotent mutation operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waflow_core::types::{
    ContactProfile, ConversationStatus, DeliveryStatus, Direction, MessageContent, ProfileChange,
    Reaction, ReplyRef,
};

/// The per-(tenant, contact) conversation aggregate root.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub tenant_id: String,
    /// Normalized contact address (the conversation key within a tenant).
    pub contact_address: String,
    pub contact: ContactProfile,
    /// Bounded history of profile changes, newest last.
    pub profile_history: Vec<ProfileChange>,
    pub status: ConversationStatus,
    pub window: MessagingWindow,
    pub metrics: ConversationMetrics,
    /// Denormalized projection of the newest message.
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer-service messaging window state. Opens on every inbound message
/// and expires 24 hours after the most recent one. Tracked, not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagingWindow {
    pub is_open: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

/// Monotonic per-conversation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationMetrics {
    pub total_messages: i64,
    pub incoming_messages: i64,
    pub outgoing_messages: i64,
    pub windows_opened: i64,
}

/// A message stored in the conversation's append-only log.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    /// Vendor-assigned id, unique within the conversation.
    pub external_id: String,
    pub direction: Direction,
    pub content: MessageContent,
    /// Human-readable one-line summary.
    pub preview: String,
    pub delivery_status: Option<DeliveryStatus>,
    pub status_updated_at: Option<DateTime<Utc>>,
    /// At most one entry per reacting address.
    pub reactions: Vec<Reaction>,
    pub reply_to: Option<ReplyRef>,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for the append operations.
///
/// Carries no contact profile fields: the contact sub-document is owned
/// entirely by `apply_profile_update`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub external_id: String,
    pub direction: Direction,
    pub content: MessageContent,
    pub reply_to: Option<ReplyRef>,
    pub sent_at: DateTime<Utc>,
}

/// Outcome of `append_inbound_message` / `append_echo_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was stored and the aggregate updated.
    Appended,
    /// A message with the same external id already exists; nothing changed.
    Duplicate,
}

/// Outcome of `apply_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The status advanced past the previously stored one.
    Advanced,
    /// The update would regress an already-more-advanced status; no-op.
    Stale,
    /// No message with this external id exists (status may have raced ahead
    /// of message replication -- benign).
    NotFound,
}

/// Outcome of `apply_reaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The reactor's single reaction entry was inserted or replaced.
    Applied,
    /// The reactor's entry was removed (empty emoji).
    Removed,
    /// The target message is not in this conversation; the caller records
    /// the reaction as a standalone orphan message instead.
    TargetNotFound,
}
