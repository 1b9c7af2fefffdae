// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for realistic raw webhook bodies.

use serde_json::json;

/// A single-change payload wrapper for the given tenant identifiers.
pub fn change_payload(
    account_id: &str,
    field: &str,
    value: serde_json::Value,
) -> Vec<u8> {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": account_id,
            "changes": [{"field": field, "value": value}]
        }]
    })
    .to_string()
    .into_bytes()
}

/// A text message from `contact` with the given external id.
pub fn text_message(
    account_id: &str,
    phone_number_id: &str,
    contact: &str,
    external_id: &str,
    body: &str,
    timestamp: i64,
) -> Vec<u8> {
    change_payload(
        account_id,
        "messages",
        json!({
            "messaging_product": "whatsapp",
            "metadata": {"phone_number_id": phone_number_id},
            "contacts": [{"profile": {"name": "Test Contact"}, "wa_id": contact}],
            "messages": [{
                "from": contact,
                "id": external_id,
                "timestamp": timestamp.to_string(),
                "type": "text",
                "text": {"body": body}
            }]
        }),
    )
}

/// A delivery status update for a previously sent message.
pub fn status_update(
    account_id: &str,
    phone_number_id: &str,
    external_id: &str,
    status: &str,
    timestamp: i64,
) -> Vec<u8> {
    change_payload(
        account_id,
        "messages",
        json!({
            "metadata": {"phone_number_id": phone_number_id},
            "statuses": [{
                "id": external_id,
                "status": status,
                "timestamp": timestamp.to_string()
            }]
        }),
    )
}

/// A reaction from `contact` to `target_id`; empty emoji removes it.
pub fn reaction(
    account_id: &str,
    phone_number_id: &str,
    contact: &str,
    external_id: &str,
    target_id: &str,
    emoji: &str,
    timestamp: i64,
) -> Vec<u8> {
    let mut payload = json!({"message_id": target_id});
    if !emoji.is_empty() {
        payload["emoji"] = json!(emoji);
    }
    change_payload(
        account_id,
        "messages",
        json!({
            "metadata": {"phone_number_id": phone_number_id},
            "messages": [{
                "from": contact,
                "id": external_id,
                "timestamp": timestamp.to_string(),
                "type": "reaction",
                "reaction": payload
            }]
        }),
    )
}
