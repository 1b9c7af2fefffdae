// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion: tenant resolution, authenticity verification, event
//! normalization, and dispatch to the conversation aggregate.
//!
//! The [`engine::IngestionEngine`] is the single entry point; everything
//! else in this crate is a stage of its pipeline.

pub mod directory;
pub mod engine;
pub mod normalize;
pub mod notify;
pub mod verify;

pub use directory::{Clock, SystemClock, TenantDirectory, TenantKey};
pub use engine::{IngestReport, IngestionEngine};
pub use notify::{ChannelNotifier, EventNotifier, Notification};
pub use verify::{SIGNATURE_HEADER, VerifyOutcome, verify_signature};
