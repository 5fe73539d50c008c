// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::attest::ProviderError;
use crate::policy::{self, RateLimitError};
use crate::remote;
use crate::token;
use serde::Serialize;

/// The stage an attestation request failed at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Configuration,
    RateLimit,
    Nonce,
    Provider,
    Decode,
    Parse,
    Policy,
    Upstream,
    Internal,
}

/// Terminal failures of an attestation request
#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error("Nonce generation failed: {0}")]
    Nonce(#[source] remote::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Envelope-level failure.  The cause stays available through
    /// `source()` but is never rendered.
    #[error("cannot verify attestation token")]
    Decode(#[source] token::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] token::Error),
    #[error("Policy error: {0}")]
    Policy(#[from] policy::Error),
    #[error("{0}")]
    Upstream(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::UnsupportedOption(_) => ErrorKind::Configuration,
            Error::RateLimit(_) => ErrorKind::RateLimit,
            Error::Nonce(_) => ErrorKind::Nonce,
            Error::Provider(_) => ErrorKind::Provider,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Policy(_) => ErrorKind::Policy,
            Error::Upstream(_) | Error::MalformedResponse(_) => ErrorKind::Upstream,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Classify an error raised while turning a token into a statement
    pub(crate) fn from_token(e: token::Error) -> Self {
        if e.is_claims_error() {
            Error::Parse(e)
        } else {
            Error::Decode(e)
        }
    }
}

impl From<remote::Error> for Error {
    fn from(e: remote::Error) -> Self {
        match e {
            remote::Error::Configuration(m) => Error::Configuration(m),
            remote::Error::MalformedResponse(m) => Error::MalformedResponse(m),
            remote::Error::Transport(_) | remote::Error::Upstream(_) => {
                Error::Upstream(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Decode(e) => write!(f, "cannot verify attestation token: {:?}", e),
            _ => write!(f, "{}", self),
        }
    }
}
