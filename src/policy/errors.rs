// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

/// Reasons for not trusting a statement whose envelope did verify
#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Nonce mismatch: {0}")]
    NonceMismatch(String),
    #[error("Expired: {0}")]
    Expired(String),
    #[error("Untrusted signing certificate: {0}")]
    UntrustedSigningCertificate(String),
    #[error("Package mismatch: {0}")]
    PackageMismatch(String),
    #[error("Missing evidence: {0}")]
    MissingEvidence(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NonceMismatch(e)
            | Error::Expired(e)
            | Error::UntrustedSigningCertificate(e)
            | Error::PackageMismatch(e)
            | Error::MissingEvidence(e) => {
                write!(f, "{}", e)
            }
        }
    }
}

fn secs(ms: &u64) -> u64 {
    ms.div_ceil(1000)
}

/// A request refused before anything was sent to the attestation provider
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum RateLimitError {
    #[error("requests are too frequent, retry in {} seconds", secs(.retry_after_ms))]
    TooSoon { retry_after_ms: u64 },

    #[error(
        "at most {max_requests} requests per {} seconds, retry in {} seconds",
        secs(.window_ms),
        secs(.retry_after_ms)
    )]
    WindowExhausted {
        retry_after_ms: u64,
        max_requests: usize,
        window_ms: u64,
    },

    #[error("request history unavailable: {0}")]
    StorageUnavailable(String),
}

impl RateLimitError {
    /// How long the caller should wait before trying again
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            RateLimitError::TooSoon { retry_after_ms }
            | RateLimitError::WindowExhausted { retry_after_ms, .. } => Some(*retry_after_ms),
            RateLimitError::StorageUnavailable(_) => None,
        }
    }
}
