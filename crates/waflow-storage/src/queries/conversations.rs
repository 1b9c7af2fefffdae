// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent mutation operations against the conversation aggregate.
//!
//! Every operation runs its read-check-write inside a single closure on the
//! database's writer thread, so the duplicate check, the status-regression
//! guard, and the reaction upsert are atomic. All operations are safe to
//! retry and tolerate arbitrary event reordering.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params};
use waflow_core::WaflowError;
use waflow_core::types::{
    ContactProfile, ConversationStatus, DeliveryStatus, Direction, ProfileChange, ProfileField,
    Reaction,
};

use crate::database::Database;
use crate::models::{
    AppendOutcome, Conversation, ConversationMetrics, MessagingWindow, NewMessage,
    ReactionOutcome, StatusOutcome, StoredMessage,
};
use crate::queries::{enum_col, json_col, opt_ts_col, ts_col};

/// Number of profile changes retained per conversation.
const PROFILE_HISTORY_LIMIT: usize = 10;

/// Window category recorded for customer-initiated conversations.
const WINDOW_CATEGORY_SERVICE: &str = "service";

/// Append an inbound message to the (tenant, contact) conversation.
///
/// Creates the conversation on first contact. On duplicate external id the
/// call returns [`AppendOutcome::Duplicate`] and performs no mutation at
/// all: no counter increment, no projection refresh, no window change.
///
/// On append, atomically: stores the message, refreshes the last-message
/// projection, opens or refreshes the 24-hour messaging window (opened_at =
/// the message's own timestamp), reactivates an archived/closed
/// conversation, and bumps the counters.
pub async fn append_inbound_message(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    mut msg: NewMessage,
) -> Result<AppendOutcome, WaflowError> {
    msg.direction = Direction::Incoming;
    append_message(db, tenant_id, contact_address, msg).await
}

/// Append an outgoing message echoed back by the platform.
///
/// Same dedup and projection semantics as the inbound path, but never
/// touches the messaging window or the conversation status, and bumps the
/// outgoing counter instead.
pub async fn append_echo_message(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    mut msg: NewMessage,
) -> Result<AppendOutcome, WaflowError> {
    msg.direction = Direction::Outgoing;
    append_message(db, tenant_id, contact_address, msg).await
}

async fn append_message(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    msg: NewMessage,
) -> Result<AppendOutcome, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact_address.to_string();
    let content_json =
        serde_json::to_string(&msg.content).map_err(|e| WaflowError::Internal(e.to_string()))?;
    let preview = msg.content.preview();

    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO conversations
                     (tenant_id, contact_address, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (tenant_id, contact_address) DO NOTHING",
                params![tenant_id, contact, now.to_rfc3339()],
            )?;
            let conversation_id: i64 = tx.query_row(
                "SELECT id FROM conversations WHERE tenant_id = ?1 AND contact_address = ?2",
                params![tenant_id, contact],
                |row| row.get(0),
            )?;

            let inserted = tx.execute(
                "INSERT INTO messages
                     (conversation_id, external_id, direction, content, preview,
                      reply_to_id, reply_to_sender, sent_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (conversation_id, external_id) DO NOTHING",
                params![
                    conversation_id,
                    msg.external_id,
                    msg.direction.to_string(),
                    content_json,
                    preview,
                    msg.reply_to.as_ref().map(|r| r.external_id.clone()),
                    msg.reply_to.as_ref().map(|r| r.sender.clone()),
                    msg.sent_at.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;
            if inserted == 0 {
                tx.rollback()?;
                return Ok(AppendOutcome::Duplicate);
            }

            match msg.direction {
                Direction::Incoming => {
                    // The window refreshes on every inbound message; the
                    // windows_opened counter only moves on a closed-to-open
                    // transition.
                    let (window_open, expires_at): (i64, Option<String>) = tx.query_row(
                        "SELECT window_open, window_expires_at FROM conversations WHERE id = ?1",
                        params![conversation_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )?;
                    let still_open = window_open != 0
                        && expires_at
                            .as_deref()
                            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                            .map(|e| e.with_timezone(&Utc) > msg.sent_at)
                            .unwrap_or(false);
                    let windows_opened_inc: i64 = if still_open { 0 } else { 1 };
                    let expires = msg.sent_at + Duration::hours(24);

                    tx.execute(
                        "UPDATE conversations SET
                             status = 'active',
                             window_open = 1,
                             window_opened_at = ?2,
                             window_expires_at = ?3,
                             window_category = ?4,
                             total_messages = total_messages + 1,
                             incoming_messages = incoming_messages + 1,
                             windows_opened = windows_opened + ?5,
                             last_message_preview = ?6,
                             last_message_at = ?2,
                             updated_at = ?7
                         WHERE id = ?1",
                        params![
                            conversation_id,
                            msg.sent_at.to_rfc3339(),
                            expires.to_rfc3339(),
                            WINDOW_CATEGORY_SERVICE,
                            windows_opened_inc,
                            preview,
                            now.to_rfc3339(),
                        ],
                    )?;
                }
                Direction::Outgoing => {
                    tx.execute(
                        "UPDATE conversations SET
                             total_messages = total_messages + 1,
                             outgoing_messages = outgoing_messages + 1,
                             last_message_preview = ?2,
                             last_message_at = ?3,
                             updated_at = ?4
                         WHERE id = ?1",
                        params![
                            conversation_id,
                            preview,
                            msg.sent_at.to_rfc3339(),
                            now.to_rfc3339(),
                        ],
                    )?;
                }
            }

            tx.commit()?;
            Ok(AppendOutcome::Appended)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a delivery status to a message, located globally by external id.
///
/// A single guarded UPDATE enforces monotonicity: `sent < delivered < read`,
/// with `failed` terminal. A stale transition is a no-op reported as
/// [`StatusOutcome::Stale`]; an unknown external id is
/// [`StatusOutcome::NotFound`] (status events may race ahead of message
/// replication, so callers treat this as benign).
pub async fn apply_status(
    db: &Database,
    external_id: &str,
    status: DeliveryStatus,
    at: DateTime<Utc>,
) -> Result<StatusOutcome, WaflowError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET delivery_status = ?2, status_updated_at = ?3
                 WHERE external_id = ?1
                   AND (delivery_status IS NULL OR
                        CASE delivery_status
                            WHEN 'sent' THEN 0
                            WHEN 'delivered' THEN 1
                            WHEN 'read' THEN 2
                            WHEN 'failed' THEN 3
                        END < ?4)",
                params![
                    external_id,
                    status.to_string(),
                    at.to_rfc3339(),
                    i64::from(status.rank()),
                ],
            )?;
            if changed > 0 {
                return Ok(StatusOutcome::Advanced);
            }
            let exists = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE external_id = ?1 LIMIT 1",
                    params![external_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(if exists.is_some() {
                StatusOutcome::Stale
            } else {
                StatusOutcome::NotFound
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert, replace, or remove a reaction on a message in the (tenant,
/// contact) conversation.
///
/// At most one reaction per reacting address: a non-empty emoji
/// inserts-or-replaces that reactor's entry (last timestamp wins, so an
/// out-of-order older reaction never overwrites a newer one); an empty
/// emoji removes the entry. A missing target message yields
/// [`ReactionOutcome::TargetNotFound`] and the caller falls back to
/// recording the reaction as a standalone orphan message.
pub async fn apply_reaction(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    target_external_id: &str,
    reactor: &str,
    emoji: &str,
    at: DateTime<Utc>,
) -> Result<ReactionOutcome, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact_address.to_string();
    let target = target_external_id.to_string();
    let reactor = reactor.to_string();
    let emoji = emoji.to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let row: Option<(i64, String)> = tx
                .query_row(
                    "SELECT m.id, m.reactions
                     FROM messages m
                     JOIN conversations c ON c.id = m.conversation_id
                     WHERE c.tenant_id = ?1 AND c.contact_address = ?2
                       AND m.external_id = ?3",
                    params![tenant_id, contact, target],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((message_id, reactions_json)) = row else {
                return Ok(ReactionOutcome::TargetNotFound);
            };

            let mut reactions: Vec<Reaction> = serde_json::from_str(&reactions_json)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

            let outcome = if emoji.is_empty() {
                reactions.retain(|r| r.reactor != reactor);
                ReactionOutcome::Removed
            } else {
                match reactions.iter_mut().find(|r| r.reactor == reactor) {
                    Some(existing) => {
                        if existing.at <= at {
                            existing.emoji = emoji;
                            existing.at = at;
                        }
                    }
                    None => reactions.push(Reaction {
                        reactor,
                        emoji,
                        at,
                    }),
                }
                ReactionOutcome::Applied
            };

            let updated = serde_json::to_string(&reactions)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            tx.execute(
                "UPDATE messages SET reactions = ?2 WHERE id = ?1",
                params![message_id, updated],
            )?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_boxed_err)
}

/// Diff incoming profile fields against the stored contact sub-document.
///
/// Only fields present in `profile` participate in the diff (a `None`
/// means "not reported", not "cleared"). Changed fields are written,
/// appended to the bounded profile history, and returned. An empty set --
/// including the case where no conversation exists yet for this contact --
/// is a valid, non-error outcome.
pub async fn apply_profile_update(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    profile: ContactProfile,
    at: DateTime<Utc>,
) -> Result<Vec<ProfileField>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact_address.to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let row: Option<(i64, Option<String>, Option<String>, Option<String>, String)> = tx
                .query_row(
                    "SELECT id, contact_name, contact_photo, contact_about, profile_history
                     FROM conversations
                     WHERE tenant_id = ?1 AND contact_address = ?2",
                    params![tenant_id, contact],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )
                .optional()?;

            let Some((conversation_id, mut name, mut photo, mut about, history_json)) = row else {
                return Ok(Vec::new());
            };

            let mut history: Vec<ProfileChange> = serde_json::from_str(&history_json)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            let mut changed = Vec::new();

            let mut diff_field =
                |field: ProfileField, stored: &mut Option<String>, incoming: &Option<String>| {
                    if let Some(new_value) = incoming
                        && stored.as_deref() != Some(new_value.as_str())
                    {
                        history.push(ProfileChange {
                            field,
                            previous: stored.clone(),
                            current: Some(new_value.clone()),
                            at,
                        });
                        *stored = Some(new_value.clone());
                        changed.push(field);
                    }
                };

            diff_field(ProfileField::Name, &mut name, &profile.name);
            diff_field(ProfileField::Photo, &mut photo, &profile.photo);
            diff_field(ProfileField::About, &mut about, &profile.about);

            if changed.is_empty() {
                return Ok(changed);
            }

            if history.len() > PROFILE_HISTORY_LIMIT {
                let excess = history.len() - PROFILE_HISTORY_LIMIT;
                history.drain(..excess);
            }
            let history_json = serde_json::to_string(&history)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

            tx.execute(
                "UPDATE conversations SET
                     contact_name = ?2, contact_photo = ?3, contact_about = ?4,
                     profile_history = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![
                    conversation_id,
                    name,
                    photo,
                    about,
                    history_json,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_boxed_err)
}

/// Fetch a conversation aggregate by its (tenant, contact) key.
pub async fn get_conversation(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
) -> Result<Option<Conversation>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact_address.to_string();
    db.connection()
        .call(move |conn| {
            let conversation = conn
                .query_row(
                    "SELECT id, tenant_id, contact_address, contact_name, contact_photo,
                            contact_about, profile_history, status, window_open,
                            window_opened_at, window_expires_at, window_category,
                            total_messages, incoming_messages, outgoing_messages,
                            windows_opened, last_message_preview, last_message_at,
                            created_at, updated_at
                     FROM conversations
                     WHERE tenant_id = ?1 AND contact_address = ?2",
                    params![tenant_id, contact],
                    row_to_conversation,
                )
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a conversation's message log in append order.
pub async fn get_messages(
    db: &Database,
    conversation_id: i64,
) -> Result<Vec<StoredMessage>, WaflowError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, external_id, direction, content, preview,
                        delivery_status, status_updated_at, reactions, reply_to_id,
                        reply_to_sender, sent_at, created_at
                 FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Locate a single message by external id within a (tenant, contact)
/// conversation.
pub async fn find_message(
    db: &Database,
    tenant_id: &str,
    contact_address: &str,
    external_id: &str,
) -> Result<Option<StoredMessage>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact_address.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    "SELECT m.id, m.conversation_id, m.external_id, m.direction, m.content,
                            m.preview, m.delivery_status, m.status_updated_at, m.reactions,
                            m.reply_to_id, m.reply_to_sender, m.sent_at, m.created_at
                     FROM messages m
                     JOIN conversations c ON c.id = m.conversation_id
                     WHERE c.tenant_id = ?1 AND c.contact_address = ?2
                       AND m.external_id = ?3",
                    params![tenant_id, contact, external_id],
                    row_to_message,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact_address: row.get(2)?,
        contact: ContactProfile {
            name: row.get(3)?,
            photo: row.get(4)?,
            about: row.get(5)?,
        },
        profile_history: json_col(6, row.get(6)?)?,
        status: enum_col::<ConversationStatus>(7, row.get(7)?)?,
        window: MessagingWindow {
            is_open: row.get::<_, i64>(8)? != 0,
            opened_at: opt_ts_col(9, row.get(9)?)?,
            expires_at: opt_ts_col(10, row.get(10)?)?,
            category: row.get(11)?,
        },
        metrics: ConversationMetrics {
            total_messages: row.get(12)?,
            incoming_messages: row.get(13)?,
            outgoing_messages: row.get(14)?,
            windows_opened: row.get(15)?,
        },
        last_message_preview: row.get(16)?,
        last_message_at: opt_ts_col(17, row.get(17)?)?,
        created_at: ts_col(18, row.get(18)?)?,
        updated_at: ts_col(19, row.get(19)?)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let reply_to_id: Option<String> = row.get(9)?;
    let reply_to_sender: Option<String> = row.get(10)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        external_id: row.get(2)?,
        direction: enum_col::<Direction>(3, row.get(3)?)?,
        content: json_col(4, row.get(4)?)?,
        preview: row.get(5)?,
        delivery_status: row
            .get::<_, Option<String>>(6)?
            .map(|s| enum_col::<DeliveryStatus>(6, s))
            .transpose()?,
        status_updated_at: opt_ts_col(7, row.get(7)?)?,
        reactions: json_col(8, row.get(8)?)?,
        reply_to: match (reply_to_id, reply_to_sender) {
            (Some(external_id), Some(sender)) => Some(waflow_core::types::ReplyRef {
                external_id,
                sender,
            }),
            _ => None,
        },
        sent_at: ts_col(11, row.get(11)?)?,
        created_at: ts_col(12, row.get(12)?)?,
    })
}
