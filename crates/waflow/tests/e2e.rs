// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ingestion scenarios through the full pipeline: raw signed
//! webhook bodies in, conversation aggregate state and notifications out.

use waflow_config::MissingSignaturePolicy;
use waflow_core::types::{ConversationStatus, DeliveryStatus};
use waflow_storage::queries::conversations;
use waflow_test_utils::{SeedTenant, TestHarness, payloads};

const SECRET: &str = "e2e-s3cret";

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_tenant(SeedTenant::new("t1", Some(SECRET)))
        .with_policy(MissingSignaturePolicy::Reject)
        .build()
        .await
        .expect("harness build")
}

#[tokio::test]
async fn message_lifecycle_from_wire_to_aggregate() {
    let h = harness().await;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    let report = h.ingest_signed(&body, SECRET).await.unwrap();
    assert_eq!(report.events_failed, 0);
    assert!(!report.rejected);

    let body = payloads::status_update("acct-t1", "phone-t1", "wamid.m1", "delivered", 1_767_225_601);
    h.ingest_signed(&body, SECRET).await.unwrap();
    let body = payloads::status_update("acct-t1", "phone-t1", "wamid.m1", "read", 1_767_225_700);
    h.ingest_signed(&body, SECRET).await.unwrap();

    let conversation = conversations::get_conversation(&h.db, "t1", "15551230000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Active);
    assert!(conversation.window.is_open);
    assert_eq!(conversation.metrics.total_messages, 1);
    assert_eq!(conversation.metrics.windows_opened, 1);
    assert_eq!(conversation.last_message_preview.as_deref(), Some("Hi"));
    assert_eq!(conversation.contact.name.as_deref(), Some("Test Contact"));

    let message = conversations::find_message(&h.db, "t1", "15551230000", "wamid.m1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.delivery_status, Some(DeliveryStatus::Read));
}

#[tokio::test]
async fn duplicate_delivery_leaves_aggregate_unchanged() {
    let h = harness().await;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    h.ingest_signed(&body, SECRET).await.unwrap();
    let first = conversations::get_conversation(&h.db, "t1", "15551230000")
        .await
        .unwrap()
        .unwrap();
    let notified_once = h.notifier.kinds().len();

    // The platform redelivers the identical payload.
    h.ingest_signed(&body, SECRET).await.unwrap();
    let second = conversations::get_conversation(&h.db, "t1", "15551230000")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.window, second.window);
    assert_eq!(h.notifier.kinds().len(), notified_once);
}

#[tokio::test]
async fn late_status_regression_is_ignored_and_failed_is_terminal() {
    let h = harness().await;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    h.ingest_signed(&body, SECRET).await.unwrap();

    for (status, ts) in [("read", 1_767_225_700), ("delivered", 1_767_225_650)] {
        let body = payloads::status_update("acct-t1", "phone-t1", "wamid.m1", status, ts);
        h.ingest_signed(&body, SECRET).await.unwrap();
    }
    let message = conversations::find_message(&h.db, "t1", "15551230000", "wamid.m1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.delivery_status, Some(DeliveryStatus::Read));

    // failed overrides, then nothing moves it back.
    for (status, ts) in [("failed", 1_767_225_800), ("read", 1_767_225_900)] {
        let body = payloads::status_update("acct-t1", "phone-t1", "wamid.m1", status, ts);
        h.ingest_signed(&body, SECRET).await.unwrap();
    }
    let message = conversations::find_message(&h.db, "t1", "15551230000", "wamid.m1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.delivery_status, Some(DeliveryStatus::Failed));
}

#[tokio::test]
async fn reaction_add_replace_remove_lifecycle() {
    let h = harness().await;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    h.ingest_signed(&body, SECRET).await.unwrap();

    let body = payloads::reaction(
        "acct-t1", "phone-t1", "15551230000", "wamid.r1", "wamid.m1", "👍", 1_767_225_601,
    );
    h.ingest_signed(&body, SECRET).await.unwrap();
    let body = payloads::reaction(
        "acct-t1", "phone-t1", "15551230000", "wamid.r2", "wamid.m1", "🔥", 1_767_225_602,
    );
    h.ingest_signed(&body, SECRET).await.unwrap();

    let message = conversations::find_message(&h.db, "t1", "15551230000", "wamid.m1")
        .await
        .unwrap()
        .unwrap();
    // One reactor, so the replacement keeps a single entry.
    assert_eq!(message.reactions.len(), 1);
    assert_eq!(message.reactions[0].emoji, "🔥");

    let body = payloads::reaction(
        "acct-t1", "phone-t1", "15551230000", "wamid.r3", "wamid.m1", "", 1_767_225_603,
    );
    h.ingest_signed(&body, SECRET).await.unwrap();
    let message = conversations::find_message(&h.db, "t1", "15551230000", "wamid.m1")
        .await
        .unwrap()
        .unwrap();
    assert!(message.reactions.is_empty());
}

#[tokio::test]
async fn tampered_request_stores_nothing() {
    let h = harness().await;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    let report = h.ingest_signed(&body, "wrong-secret").await.unwrap();
    assert!(report.rejected);
    assert_eq!(report.events_processed, 0);

    assert!(
        conversations::get_conversation(&h.db, "t1", "15551230000")
            .await
            .unwrap()
            .is_none()
    );
    assert!(h.notifier.kinds().is_empty());
}

#[tokio::test]
async fn missing_signature_rejected_under_reject_policy() {
    let h = harness().await;
    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    let report = h.ingest_unsigned(&body).await.unwrap();
    assert!(report.rejected);
}

#[tokio::test]
async fn second_window_opens_after_first_lapses() {
    let h = harness().await;
    let day = 86_400;

    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "Hi", 1_767_225_600);
    h.ingest_signed(&body, SECRET).await.unwrap();
    // 25 hours later: the first window has lapsed.
    let body = payloads::text_message(
        "acct-t1", "phone-t1", "15551230000", "wamid.m2", "Again", 1_767_225_600 + day + 3_600,
    );
    h.ingest_signed(&body, SECRET).await.unwrap();

    let conversation = conversations::get_conversation(&h.db, "t1", "15551230000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.metrics.windows_opened, 2);
    assert!(conversation.window.is_open);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let h = TestHarness::builder()
        .with_tenant(SeedTenant::new("t1", None))
        .with_tenant(SeedTenant::new("t2", None))
        .build()
        .await
        .unwrap();

    // Same contact talks to two different businesses.
    let body = payloads::text_message("acct-t1", "phone-t1", "15551230000", "wamid.m1", "To t1", 1_767_225_600);
    h.ingest_unsigned(&body).await.unwrap();
    let body = payloads::text_message("acct-t2", "phone-t2", "15551230000", "wamid.m2", "To t2", 1_767_225_601);
    h.ingest_unsigned(&body).await.unwrap();

    let c1 = conversations::get_conversation(&h.db, "t1", "15551230000")
        .await
        .unwrap()
        .unwrap();
    let c2 = conversations::get_conversation(&h.db, "t2", "15551230000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c1.metrics.total_messages, 1);
    assert_eq!(c2.metrics.total_messages, 1);
    assert_eq!(c1.last_message_preview.as_deref(), Some("To t1"));
    assert_eq!(c2.last_message_preview.as_deref(), Some("To t2"));
}

#[tokio::test]
async fn unknown_tenant_traffic_is_dropped_quietly() {
    let h = harness().await;
    let body = payloads::text_message(
        "acct-nobody", "phone-nobody", "15551230000", "wamid.m1", "Hi", 1_767_225_600,
    );
    let report = h.ingest_signed(&body, SECRET).await.unwrap();
    assert_eq!(report.changes_ignored, 1);
    assert_eq!(report.events_processed, 0);
}
