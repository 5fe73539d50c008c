// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Decisions taken around a verified statement: whether a request may be
//! issued at all ([`RateLimiter`]) and whether a decoded statement can be
//! trusted ([`PolicyVerifier`]).

pub use self::errors::{Error, RateLimitError};
pub use self::ratelimit::*;
pub use self::verifier::{PolicyOutcome, PolicyVerifier, PolicyWarning};

mod errors;
mod ratelimit;
mod verifier;

/// Milliseconds since the Unix epoch
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
