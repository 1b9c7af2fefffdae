// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waflow webhook ingestion engine.
//!
//! This crate provides the error type, the canonical event union, and the
//! common domain types used throughout the Waflow workspace. All other
//! crates depend on the definitions here.

pub mod error;
pub mod event;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WaflowError;
pub use event::CanonicalEvent;
pub use types::{
    ContactProfile, ConversationStatus, DeliveryStatus, Direction, MessageContent, Tenant,
    TenantStatus,
};
