// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::{Error, ErrorKind};
use crate::policy::PolicyWarning;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// Where one attestation request stands.  A request moves from `Pending`
/// to `Loading` and then to exactly one terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum AttestationState<S> {
    Pending,
    Loading,
    RateLimited {
        reason: String,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
    Success {
        value: S,
        warnings: Vec<PolicyWarning>,
    },
}

impl<S> AttestationState<S> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttestationState::Pending | AttestationState::Loading)
    }

    pub fn success(value: S, warnings: Vec<PolicyWarning>) -> Self {
        AttestationState::Success { value, warnings }
    }

    /// The terminal state reporting `e`
    pub fn from_error(e: &Error) -> Self {
        match e {
            Error::RateLimit(r) => AttestationState::RateLimited {
                reason: r.to_string(),
            },
            _ => AttestationState::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AttestationState::Pending => "pending",
            AttestationState::Loading => "loading",
            AttestationState::RateLimited { .. } => "rate-limited",
            AttestationState::Failure { .. } => "failure",
            AttestationState::Success { .. } => "success",
        }
    }
}

impl<S> From<Result<(S, Vec<PolicyWarning>), Error>> for AttestationState<S> {
    fn from(r: Result<(S, Vec<PolicyWarning>), Error>) -> Self {
        match r {
            Ok((value, warnings)) => AttestationState::success(value, warnings),
            Err(e) => AttestationState::from_error(&e),
        }
    }
}

/// Owner of the state of one scheme's requests.  Presentation code only
/// ever gets a read-only [`watch::Receiver`].
#[derive(Debug)]
pub struct StateHolder<S> {
    tx: watch::Sender<AttestationState<S>>,
}

impl<S> Default for StateHolder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateHolder<S> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AttestationState::Pending);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<AttestationState<S>> {
        self.tx.subscribe()
    }

    /// Start a new request, whatever state the previous one ended in
    pub fn begin(&self) {
        let previous = self.tx.send_replace(AttestationState::Loading);
        info!(previous = previous.name(), "attestation request started");
    }

    /// Move a loading request to its terminal state.  Returns false, leaving
    /// the state untouched, if no request is loading.
    pub fn finish(&self, terminal: AttestationState<S>) -> bool {
        let name = terminal.name();
        let mut terminal = Some(terminal);

        let applied = self.tx.send_if_modified(|current| {
            if !matches!(current, AttestationState::Loading) {
                return false;
            }
            match terminal.take() {
                Some(t) if t.is_terminal() => {
                    *current = t;
                    true
                }
                _ => false,
            }
        });

        if applied {
            info!(state = name, "attestation request finished");
        }

        applied
    }
}

impl<S: Clone> StateHolder<S> {
    pub fn current(&self) -> AttestationState<S> {
        self.tx.borrow().clone()
    }
}
