// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget notification fan-out.
//!
//! The engine emits one notification per applied mutation (and per
//! tenant-level event). Delivery is best-effort: a slow or absent consumer
//! must never block or fail ingestion, so the production notifier pushes
//! onto an unbounded channel and swallows send errors.

use tokio::sync::mpsc;
use waflow_core::event::CanonicalEvent;

/// One downstream notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub tenant_id: String,
    /// Event kind label, mirrors [`CanonicalEvent::kind`].
    pub kind: &'static str,
    pub event: CanonicalEvent,
}

/// Sink for notifications. Implementations must be non-blocking.
pub trait EventNotifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Production notifier backed by an unbounded channel; the receiving half
/// is consumed by the server's fan-out task.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventNotifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification consumer gone, dropping notification");
        }
    }
}
