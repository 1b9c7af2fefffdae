// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The webhook HTTP surface: the platform verification handshake, the
//! event receiver, and a health endpoint.

pub mod handlers;
pub mod server;

pub use server::{HealthState, WebhookState, build_router, start_server};
