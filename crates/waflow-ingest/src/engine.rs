// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion engine: the single pipeline every webhook request runs.
//!
//! parse, then per change: resolve tenant, verify authenticity, normalize,
//! and dispatch each canonical event to its aggregate mutation. Events are
//! processed strictly in payload order. One failing event is logged and
//! skipped without aborting its siblings; a rejected signature drops the
//! whole remaining request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use waflow_config::MissingSignaturePolicy;
use waflow_core::event::{CanonicalEvent, ReactionEvent};
use waflow_core::types::{Direction, MessageContent, Tenant};
use waflow_core::WaflowError;
use waflow_storage::queries::conversations;
use waflow_storage::{AppendOutcome, Database, NewMessage, ReactionOutcome, StatusOutcome};

use crate::directory::{TenantDirectory, TenantKey};
use crate::normalize::{self, Change, Entry, WEBHOOK_OBJECT};
use crate::notify::{EventNotifier, Notification};
use crate::verify::{verify_signature, VerifyOutcome};

/// Per-request summary returned to the caller (and logged).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Events dispatched, whether or not they mutated state.
    pub events_processed: usize,
    /// Events that failed with an error (logged, siblings unaffected).
    pub events_failed: usize,
    /// Changes dropped because no active tenant resolved.
    pub changes_ignored: usize,
    /// A signature check failed and the rest of the request was dropped.
    pub rejected: bool,
}

/// The webhook ingestion pipeline. Cheap to clone via `Arc` fields; one
/// instance is shared across all request handlers.
pub struct IngestionEngine {
    db: Database,
    directory: Arc<TenantDirectory>,
    notifier: Arc<dyn EventNotifier>,
    policy: MissingSignaturePolicy,
    op_timeout: Duration,
}

impl IngestionEngine {
    pub fn new(
        db: Database,
        directory: Arc<TenantDirectory>,
        notifier: Arc<dyn EventNotifier>,
        policy: MissingSignaturePolicy,
        op_timeout: Duration,
    ) -> Self {
        Self {
            db,
            directory,
            notifier,
            policy,
            op_timeout,
        }
    }

    /// Ingest one raw webhook request.
    ///
    /// `raw_body` must be the exact bytes received on the wire; signature
    /// verification is computed over them unmodified. Returns an error only
    /// for a body that is not parseable JSON at all; everything past
    /// parsing degrades per event.
    pub async fn ingest(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<IngestReport, WaflowError> {
        let payload = normalize::parse_payload(raw_body)?;
        let mut report = IngestReport::default();

        if payload.object != WEBHOOK_OBJECT {
            tracing::warn!(object = %payload.object, "ignoring payload for unexpected object");
            return Ok(report);
        }

        // Verification outcome per tenant id, computed once per request.
        let mut verified: HashMap<String, VerifyOutcome> = HashMap::new();

        'entries: for entry in &payload.entry {
            for change in &entry.changes {
                let Some(tenant) = self.resolve_tenant(entry, change).await? else {
                    tracing::warn!(account_id = %entry.id, "no active tenant for change, ignoring");
                    report.changes_ignored += 1;
                    continue;
                };

                let outcome = *verified.entry(tenant.id.clone()).or_insert_with(|| {
                    verify_signature(&tenant, raw_body, signature_header, self.policy)
                });
                if outcome == VerifyOutcome::Rejected {
                    tracing::warn!(
                        tenant_id = %tenant.id,
                        "signature verification failed, dropping request"
                    );
                    report.rejected = true;
                    break 'entries;
                }

                for event in normalize::normalize_change(change) {
                    report.events_processed += 1;
                    match self.dispatch_with_timeout(&tenant, event).await {
                        Ok(()) => {}
                        Err(error) => {
                            report.events_failed += 1;
                            tracing::error!(
                                tenant_id = %tenant.id,
                                %error,
                                "event dispatch failed, continuing with siblings"
                            );
                        }
                    }
                }
            }
        }

        tracing::debug!(
            processed = report.events_processed,
            failed = report.events_failed,
            ignored = report.changes_ignored,
            rejected = report.rejected,
            "ingest complete"
        );
        Ok(report)
    }

    /// Resolve the tenant for one change: the change's phone-number id
    /// first, the entry's business account id as fallback.
    async fn resolve_tenant(
        &self,
        entry: &Entry,
        change: &Change,
    ) -> Result<Option<Tenant>, WaflowError> {
        if let Some(metadata) = &change.value.metadata {
            if let Some(tenant) = self
                .directory
                .resolve(TenantKey::PhoneNumberId(&metadata.phone_number_id))
                .await?
            {
                return Ok(Some(tenant));
            }
        }
        self.directory
            .resolve(TenantKey::AccountId(&entry.id))
            .await
    }

    async fn dispatch_with_timeout(
        &self,
        tenant: &Tenant,
        event: CanonicalEvent,
    ) -> Result<(), WaflowError> {
        tokio::time::timeout(self.op_timeout, self.dispatch(tenant, event))
            .await
            .map_err(|_| WaflowError::Timeout {
                duration: self.op_timeout,
            })?
    }

    /// Route one canonical event to its aggregate mutation and emit a
    /// notification when state actually changed. Benign no-op outcomes
    /// (duplicates, stale statuses, empty diffs) notify nothing.
    async fn dispatch(&self, tenant: &Tenant, event: CanonicalEvent) -> Result<(), WaflowError> {
        match event {
            CanonicalEvent::InboundMessage(ref msg) => {
                let outcome = conversations::append_inbound_message(
                    &self.db,
                    &tenant.id,
                    &msg.from,
                    NewMessage {
                        external_id: msg.external_id.clone(),
                        direction: Direction::Incoming,
                        content: msg.content.clone(),
                        reply_to: msg.reply_to.clone(),
                        sent_at: msg.sent_at,
                    },
                )
                .await?;
                match outcome {
                    AppendOutcome::Appended => self.emit(tenant, event),
                    AppendOutcome::Duplicate => {
                        tracing::debug!(external_id = %msg.external_id, "duplicate message, no-op");
                    }
                }
            }
            CanonicalEvent::StatusUpdate(ref status) => {
                let outcome = conversations::apply_status(
                    &self.db,
                    &status.external_id,
                    status.status,
                    status.at,
                )
                .await?;
                match outcome {
                    StatusOutcome::Advanced => self.emit(tenant, event),
                    StatusOutcome::Stale => {
                        tracing::debug!(
                            external_id = %status.external_id,
                            "stale status update, no-op"
                        );
                    }
                    StatusOutcome::NotFound => {
                        tracing::debug!(
                            external_id = %status.external_id,
                            "status for unknown message, no-op"
                        );
                    }
                }
            }
            CanonicalEvent::Reaction(ref reaction) => {
                let outcome = conversations::apply_reaction(
                    &self.db,
                    &tenant.id,
                    &reaction.from,
                    &reaction.target_id,
                    &reaction.from,
                    &reaction.emoji,
                    reaction.at,
                )
                .await?;
                match outcome {
                    ReactionOutcome::Applied | ReactionOutcome::Removed => self.emit(tenant, event),
                    ReactionOutcome::TargetNotFound => {
                        self.record_orphan_reaction(tenant, reaction).await?;
                    }
                }
            }
            CanonicalEvent::ProfileUpdate(ref update) => {
                let changed = conversations::apply_profile_update(
                    &self.db,
                    &tenant.id,
                    &update.contact,
                    update.profile.clone(),
                    update.at,
                )
                .await?;
                if !changed.is_empty() {
                    self.emit(tenant, event);
                }
            }
            CanonicalEvent::Echo(ref echo) => {
                let outcome = conversations::append_echo_message(
                    &self.db,
                    &tenant.id,
                    &echo.to,
                    NewMessage {
                        external_id: echo.external_id.clone(),
                        direction: Direction::Outgoing,
                        content: echo.content.clone(),
                        reply_to: None,
                        sent_at: echo.sent_at,
                    },
                )
                .await?;
                match outcome {
                    AppendOutcome::Appended => self.emit(tenant, event),
                    AppendOutcome::Duplicate => {
                        tracing::debug!(external_id = %echo.external_id, "duplicate echo, no-op");
                    }
                }
            }
            // Tenant-level events carry no aggregate mutation; they fan out
            // directly.
            CanonicalEvent::TemplateStatusChange(_)
            | CanonicalEvent::TemplateQualityChange(_)
            | CanonicalEvent::AccountAlert(_)
            | CanonicalEvent::CapabilityChange(_)
            | CanonicalEvent::TrackingEvent(_)
            | CanonicalEvent::PreferenceChange(_) => self.emit(tenant, event),
        }
        Ok(())
    }

    /// A reaction whose target is missing (deleted, or never replicated) is
    /// preserved as a standalone message so it is not lost. Removals of
    /// missing targets have nothing to preserve.
    async fn record_orphan_reaction(
        &self,
        tenant: &Tenant,
        reaction: &ReactionEvent,
    ) -> Result<(), WaflowError> {
        if reaction.emoji.is_empty() {
            tracing::debug!(
                target_id = %reaction.target_id,
                "reaction removal for unknown target, no-op"
            );
            return Ok(());
        }
        let outcome = conversations::append_inbound_message(
            &self.db,
            &tenant.id,
            &reaction.from,
            NewMessage {
                external_id: reaction.external_id.clone(),
                direction: Direction::Incoming,
                content: MessageContent::Reaction {
                    target_id: reaction.target_id.clone(),
                    emoji: reaction.emoji.clone(),
                },
                reply_to: None,
                sent_at: reaction.at,
            },
        )
        .await?;
        if outcome == AppendOutcome::Appended {
            self.emit(tenant, CanonicalEvent::Reaction(reaction.clone()));
        }
        Ok(())
    }

    fn emit(&self, tenant: &Tenant, event: CanonicalEvent) {
        self.notifier.notify(Notification {
            tenant_id: tenant.id.clone(),
            kind: event.kind(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::sync::Mutex;
    use waflow_core::types::{DeliveryStatus, TenantStatus};
    use waflow_storage::queries::tenants::upsert_tenant;

    struct CaptureNotifier {
        notifications: Mutex<Vec<Notification>>,
    }

    impl CaptureNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                notifications: Mutex::new(Vec::new()),
            })
        }

        fn kinds(&self) -> Vec<&'static str> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.kind)
                .collect()
        }
    }

    impl EventNotifier for CaptureNotifier {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    async fn engine_with_tenant(
        policy: MissingSignaturePolicy,
    ) -> (IngestionEngine, Database, Arc<CaptureNotifier>) {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(
            &db,
            &waflow_core::Tenant {
                id: "t1".into(),
                display_name: "Acme".into(),
                phone_number_id: "phone-1".into(),
                account_id: "acct-1".into(),
                verify_token: "tok-1".into(),
                app_secret: Some("s3cret".into()),
                status: TenantStatus::Active,
            },
        )
        .await
        .unwrap();

        let directory = Arc::new(TenantDirectory::new(db.clone(), Duration::from_secs(300)));
        let notifier = CaptureNotifier::new();
        let engine = IngestionEngine::new(
            db.clone(),
            directory,
            notifier.clone(),
            policy,
            Duration::from_secs(5),
        );
        (engine, db, notifier)
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn message_body(external_id: &str, text: &str) -> Vec<u8> {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"phone_number_id": "phone-1"},
                        "contacts": [{"profile": {"name": "Ada"}, "wa_id": "15551230000"}],
                        "messages": [{
                            "from": "15551230000",
                            "id": external_id,
                            "timestamp": "1767225600",
                            "type": "text",
                            "text": {"body": text}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn signed_message_is_stored_and_notified() {
        let (engine, db, notifier) = engine_with_tenant(MissingSignaturePolicy::Reject).await;
        let body = message_body("wamid.m1", "Hello");
        let sig = sign("s3cret", &body);

        let report = engine.ingest(&body, Some(&sig)).await.unwrap();
        assert_eq!(report.events_failed, 0);
        assert!(!report.rejected);
        // One inbound message, one profile update (name set on a fresh
        // conversation).
        assert_eq!(report.events_processed, 2);
        assert_eq!(notifier.kinds(), vec!["inbound_message", "profile_update"]);

        let conversation = conversations::get_conversation(&db, "t1", "15551230000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.metrics.incoming_messages, 1);
        assert!(conversation.window.is_open);
        assert_eq!(conversation.contact.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn duplicate_resubmission_mutates_and_notifies_once() {
        let (engine, db, notifier) = engine_with_tenant(MissingSignaturePolicy::Reject).await;
        let body = message_body("wamid.m1", "Hello");
        let sig = sign("s3cret", &body);

        engine.ingest(&body, Some(&sig)).await.unwrap();
        let report = engine.ingest(&body, Some(&sig)).await.unwrap();
        assert_eq!(report.events_failed, 0);

        let conversation = conversations::get_conversation(&db, "t1", "15551230000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.metrics.total_messages, 1);
        // Second pass: duplicate append and no-change profile diff.
        assert_eq!(notifier.kinds(), vec!["inbound_message", "profile_update"]);
    }

    #[tokio::test]
    async fn tampered_signature_drops_everything() {
        let (engine, db, notifier) = engine_with_tenant(MissingSignaturePolicy::Reject).await;
        let body = message_body("wamid.m1", "Hello");
        let sig = sign("wrong-secret", &body);

        let report = engine.ingest(&body, Some(&sig)).await.unwrap();
        assert!(report.rejected);
        assert_eq!(report.events_processed, 0);
        assert!(notifier.kinds().is_empty());
        assert!(
            conversations::get_conversation(&db, "t1", "15551230000")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn missing_signature_follows_policy() {
        let (engine, _db, _notifier) = engine_with_tenant(MissingSignaturePolicy::Reject).await;
        let body = message_body("wamid.m1", "Hello");
        let report = engine.ingest(&body, None).await.unwrap();
        assert!(report.rejected);

        let (engine, _db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let report = engine.ingest(&body, None).await.unwrap();
        assert!(!report.rejected);
        assert!(notifier.kinds().contains(&"inbound_message"));
    }

    #[tokio::test]
    async fn unexpected_object_is_ignored() {
        let (engine, _db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let body = br#"{"object": "page", "entry": [{"id": "acct-1", "changes": []}]}"#;
        let report = engine.ingest(body, None).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_tenant_is_counted_and_skipped() {
        let (engine, _db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-unknown",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "phone-unknown"},
                        "messages": [{
                            "from": "1", "id": "wamid.x", "timestamp": "1",
                            "type": "text", "text": {"body": "hi"}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();

        let report = engine.ingest(&body, None).await.unwrap();
        assert_eq!(report.changes_ignored, 1);
        assert_eq!(report.events_processed, 0);
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn status_updates_advance_and_ignore_regressions() {
        let (engine, _db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        engine
            .ingest(&message_body("wamid.m1", "Hello"), None)
            .await
            .unwrap();

        let status_body = |status: &str, ts: &str| {
            serde_json::json!({
                "object": "whatsapp_business_account",
                "entry": [{
                    "id": "acct-1",
                    "changes": [{
                        "field": "messages",
                        "value": {
                            "metadata": {"phone_number_id": "phone-1"},
                            "statuses": [{
                                "id": "wamid.m1", "status": status, "timestamp": ts,
                                "recipient_id": "15551230000"
                            }]
                        }
                    }]
                }]
            })
            .to_string()
            .into_bytes()
        };

        engine
            .ingest(&status_body("read", "1767225700"), None)
            .await
            .unwrap();
        // Late-arriving regression to delivered must not notify.
        engine
            .ingest(&status_body("delivered", "1767225650"), None)
            .await
            .unwrap();

        let status_kinds: Vec<_> = notifier
            .kinds()
            .into_iter()
            .filter(|k| *k == "status_update")
            .collect();
        assert_eq!(status_kinds.len(), 1);
    }

    #[tokio::test]
    async fn orphan_reaction_is_preserved_as_message() {
        let (engine, db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "phone-1"},
                        "messages": [{
                            "from": "15551230000", "id": "wamid.r1", "timestamp": "1767225600",
                            "type": "reaction",
                            "reaction": {"message_id": "wamid.never-seen", "emoji": "🔥"}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();

        engine.ingest(&body, None).await.unwrap();
        assert_eq!(notifier.kinds(), vec!["reaction"]);

        let stored = conversations::find_message(&db, "t1", "15551230000", "wamid.r1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.content,
            MessageContent::Reaction {
                target_id: "wamid.never-seen".into(),
                emoji: "🔥".into(),
            }
        );
    }

    #[tokio::test]
    async fn reaction_on_stored_message_applies() {
        let (engine, db, _notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        engine
            .ingest(&message_body("wamid.m1", "Hello"), None)
            .await
            .unwrap();

        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "phone-1"},
                        "messages": [{
                            "from": "15551230000", "id": "wamid.r1", "timestamp": "1767225700",
                            "type": "reaction",
                            "reaction": {"message_id": "wamid.m1", "emoji": "👍"}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();
        engine.ingest(&body, None).await.unwrap();

        let stored = conversations::find_message(&db, "t1", "15551230000", "wamid.m1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reactions.len(), 1);
        assert_eq!(stored.reactions[0].emoji, "👍");
    }

    #[tokio::test]
    async fn echo_appends_outgoing_without_opening_window() {
        let (engine, db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "smb_message_echoes",
                    "value": {
                        "metadata": {"phone_number_id": "phone-1"},
                        "message_echoes": [{
                            "from": "15550001111", "to": "15551230000",
                            "id": "wamid.e1", "timestamp": "1767225600",
                            "type": "text", "text": {"body": "From the phone"}
                        }]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();

        engine.ingest(&body, None).await.unwrap();
        assert_eq!(notifier.kinds(), vec!["echo"]);

        let conversation = conversations::get_conversation(&db, "t1", "15551230000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.metrics.outgoing_messages, 1);
        assert!(!conversation.window.is_open);
    }

    #[tokio::test]
    async fn tenant_level_events_notify_without_mutation() {
        let (engine, _db, notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "message_template_status_update",
                    "value": {
                        "event": "REJECTED",
                        "message_template_name": "promo",
                        "reason": "INVALID_FORMAT"
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();

        let report = engine.ingest(&body, None).await.unwrap();
        assert_eq!(report.events_processed, 1);
        assert_eq!(notifier.kinds(), vec!["template_status_change"]);
    }

    #[tokio::test]
    async fn timed_out_event_fails_without_aborting_siblings() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(
            &db,
            &waflow_core::Tenant {
                id: "t1".into(),
                display_name: "Acme".into(),
                phone_number_id: "phone-1".into(),
                account_id: "acct-1".into(),
                verify_token: "tok-1".into(),
                app_secret: None,
                status: TenantStatus::Active,
            },
        )
        .await
        .unwrap();

        let directory = Arc::new(TenantDirectory::new(db.clone(), Duration::from_secs(300)));
        // Prime the cache so tenant resolution does not queue behind the
        // writer blocker below.
        directory
            .resolve(TenantKey::PhoneNumberId("phone-1"))
            .await
            .unwrap();

        let notifier = CaptureNotifier::new();
        let engine = IngestionEngine::new(
            db.clone(),
            directory,
            notifier.clone(),
            MissingSignaturePolicy::Allow,
            Duration::from_millis(500),
        );

        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "phone-1"},
                        "messages": [
                            {"from": "15551230000", "id": "wamid.m1", "timestamp": "1767225600",
                             "type": "text", "text": {"body": "first"}},
                            {"from": "15551230000", "id": "wamid.m2", "timestamp": "1767225601",
                             "type": "text", "text": {"body": "second"}}
                        ]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();

        // Occupy the single writer thread past the first event's timeout
        // but not past the second's: the first append cannot complete in
        // time, the second runs once the thread frees up.
        let blocker = db.connection().call(|_conn| {
            std::thread::sleep(Duration::from_millis(700));
            Ok::<_, rusqlite::Error>(())
        });
        let (blocked, report) = tokio::join!(blocker, engine.ingest(&body, None));
        blocked.unwrap();
        let report = report.unwrap();

        assert_eq!(report.events_processed, 2);
        assert_eq!(report.events_failed, 1);
        assert!(!report.rejected);

        // Only the completed append fans out.
        assert_eq!(notifier.kinds(), vec!["inbound_message"]);
        assert!(
            conversations::find_message(&db, "t1", "15551230000", "wamid.m2")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn garbage_body_is_an_error() {
        let (engine, _db, _notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        assert!(matches!(
            engine.ingest(b"not json", None).await,
            Err(WaflowError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn status_advance_checks_delivery_state() {
        let (engine, db, _notifier) = engine_with_tenant(MissingSignaturePolicy::Allow).await;
        engine
            .ingest(&message_body("wamid.m1", "Hello"), None)
            .await
            .unwrap();
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "acct-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "phone-1"},
                        "statuses": [{"id": "wamid.m1", "status": "delivered",
                                      "timestamp": "1767225700"}]
                    }
                }]
            }]
        })
        .to_string()
        .into_bytes();
        engine.ingest(&body, None).await.unwrap();

        let stored = conversations::find_message(&db, "t1", "15551230000", "wamid.m1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.delivery_status, Some(DeliveryStatus::Delivered));
    }
}
