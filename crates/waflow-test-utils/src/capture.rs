// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing notifier for asserting on the engine's fan-out.

use std::sync::Mutex;

use waflow_ingest::{EventNotifier, Notification};

/// Notifier that records every notification for later inspection.
#[derive(Default)]
pub struct CaptureNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl CaptureNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured notifications, in emission order.
    pub fn captured(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Just the kind labels, in emission order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.kind)
            .collect()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl EventNotifier for CaptureNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
