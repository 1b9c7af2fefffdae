// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Waflow integration tests.
//!
//! Provides a full-stack test harness and raw payload builders for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - Temp-database ingestion stack with seeded tenants
//! - [`CaptureNotifier`] - Notifier that records the engine's fan-out
//! - [`payloads`] - Builders for realistic raw webhook bodies

pub mod capture;
pub mod harness;
pub mod payloads;

pub use capture::CaptureNotifier;
pub use harness::{SeedTenant, TestHarness, TestHarnessBuilder, sign_body};
