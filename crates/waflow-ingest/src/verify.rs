// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload authenticity verification.
//!
//! Computes an HMAC-SHA-256 over the exact raw request bytes using the
//! tenant's shared secret and compares it to the `x-hub-signature-256`
//! header in constant time. A `Rejected` outcome must short-circuit all
//! further processing for the request.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use waflow_config::MissingSignaturePolicy;
use waflow_core::Tenant;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the platform's payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Result of verifying one request body against one tenant's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Signature present and valid.
    Verified,
    /// Signature present but wrong, or malformed, or required-but-missing.
    Rejected,
    /// Verification not possible: the tenant has no configured secret, or
    /// the header is absent and policy allows that.
    Skipped,
}

/// Verify `raw_body` against `signature_header` using the tenant's secret.
///
/// A tenant without a configured secret always yields `Skipped`
/// (best-effort operation). A missing header yields `Skipped` or
/// `Rejected` depending on the configured policy.
pub fn verify_signature(
    tenant: &Tenant,
    raw_body: &[u8],
    signature_header: Option<&str>,
    policy: MissingSignaturePolicy,
) -> VerifyOutcome {
    let Some(secret) = tenant.app_secret.as_deref() else {
        return VerifyOutcome::Skipped;
    };

    let Some(header) = signature_header else {
        return match policy {
            MissingSignaturePolicy::Allow => VerifyOutcome::Skipped,
            MissingSignaturePolicy::Reject => VerifyOutcome::Rejected,
        };
    };

    let Some(hex_signature) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return VerifyOutcome::Rejected;
    };
    let Ok(signature) = hex::decode(hex_signature) else {
        return VerifyOutcome::Rejected;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(raw_body);

    // verify_slice is a constant-time comparison.
    if mac.verify_slice(&signature).is_ok() {
        VerifyOutcome::Verified
    } else {
        VerifyOutcome::Rejected
    }
}
