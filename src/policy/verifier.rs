// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::nonce::Nonce;
use crate::store::RefValues;
use crate::token::base64;
use crate::token::Statement;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something the caller must know about a statement that was nonetheless
/// accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "kebab-case")]
pub enum PolicyWarning {
    /// The statement does not claim device integrity, so its signing
    /// certificate was not checked against the allow-list
    IntegrityCheckSkipped,
    /// The statement is timestamped ahead of the local clock, within tolerance
    TimestampInFuture { ahead_ms: u64 },
    /// Appraisal was explicitly turned off: the statement is authentic but
    /// neither its nonce nor its freshness was checked
    PolicyNotApplied,
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyWarning::IntegrityCheckSkipped => write!(
                f,
                "device integrity not claimed, signing certificate not checked"
            ),
            PolicyWarning::TimestampInFuture { ahead_ms } => {
                write!(f, "statement timestamp is {ahead_ms} ms in the future")
            }
            PolicyWarning::PolicyNotApplied => {
                write!(f, "statement not appraised against reference values")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyOutcome {
    pub warnings: Vec<PolicyWarning>,
}

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Semantic checks applied to a locally verified statement before it is
/// trusted
#[derive(Clone)]
pub struct PolicyVerifier {
    refvals: RefValues,
    clock: Clock,
}

impl fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyVerifier")
            .field("refvals", &self.refvals)
            .finish()
    }
}

impl PolicyVerifier {
    pub fn new(refvals: RefValues) -> Self {
        Self {
            refvals,
            clock: Arc::new(super::now_ms),
        }
    }

    /// Replace the wall clock, e.g. to replay recorded statements
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn refvals(&self) -> &RefValues {
        &self.refvals
    }

    pub fn verify(&self, statement: &Statement, expected: &Nonce) -> Result<PolicyOutcome, Error> {
        self.verify_at(statement, expected, (self.clock)())
    }

    /// Run every check against a statement, as of `now_ms`.  The first
    /// failing check wins.
    pub fn verify_at(
        &self,
        statement: &Statement,
        expected: &Nonce,
        now_ms: i64,
    ) -> Result<PolicyOutcome, Error> {
        let mut outcome = PolicyOutcome::default();

        self.check_nonce(statement, expected)?;
        self.check_freshness(statement, now_ms, &mut outcome)?;
        self.check_integrity(statement, &mut outcome)?;
        self.check_package(statement)?;

        debug!(scheme = %statement.scheme(), warnings = outcome.warnings.len(), "policy passed");

        Ok(outcome)
    }

    fn check_nonce(&self, statement: &Statement, expected: &Nonce) -> Result<(), Error> {
        let actual = statement
            .nonce()
            .ok_or_else(|| Error::MissingEvidence("requestDetails.nonce".to_string()))?;

        if nonce_matches(actual, expected) {
            return Ok(());
        }

        Err(Error::NonceMismatch(format!(
            "statement carries {actual:?}, expected {:?}",
            expected.as_str()
        )))
    }

    fn check_freshness(
        &self,
        statement: &Statement,
        now_ms: i64,
        outcome: &mut PolicyOutcome,
    ) -> Result<(), Error> {
        let ts = statement
            .timestamp_ms()
            .ok_or_else(|| Error::MissingEvidence("requestDetails.timestampMillis".to_string()))?;

        let age = now_ms.saturating_sub(ts);

        if age >= 0 {
            let age = age.unsigned_abs();

            if age > self.refvals.max_skew_ms {
                return Err(Error::Expired(format!(
                    "statement is {age} ms old, at most {} ms allowed",
                    self.refvals.max_skew_ms
                )));
            }

            return Ok(());
        }

        let ahead_ms = age.unsigned_abs();

        if ahead_ms > self.refvals.future_tolerance_ms {
            return Err(Error::Expired(format!(
                "statement is {ahead_ms} ms in the future, at most {} ms tolerated",
                self.refvals.future_tolerance_ms
            )));
        }

        // devices with a skewed clock produce these routinely
        warn!(ahead_ms, "statement timestamp is in the future");
        outcome
            .warnings
            .push(PolicyWarning::TimestampInFuture { ahead_ms });

        Ok(())
    }

    fn check_integrity(&self, statement: &Statement, outcome: &mut PolicyOutcome) -> Result<(), Error> {
        if !statement.claims_device_integrity() {
            warn!(scheme = %statement.scheme(), "device integrity not claimed, skipping certificate check");
            outcome.warnings.push(PolicyWarning::IntegrityCheckSkipped);
            return Ok(());
        }

        let digests = statement.certificate_digests();

        let trusted = digests.iter().any(|d| {
            self.refvals
                .certificate_digests
                .iter()
                .any(|a| digest_matches(d, a))
        });

        if trusted {
            return Ok(());
        }

        Err(Error::UntrustedSigningCertificate(format!(
            "none of {digests:?} is a known signing certificate"
        )))
    }

    fn check_package(&self, statement: &Statement) -> Result<(), Error> {
        let names = statement.package_names();

        if names.is_empty() {
            return Err(Error::MissingEvidence("package name".to_string()));
        }

        let expected = &self.refvals.package_name;

        match names.into_iter().find(|n| *n != expected.as_str()) {
            Some(n) => Err(Error::PackageMismatch(format!(
                "statement is about {n}, expected {expected}"
            ))),
            None => Ok(()),
        }
    }
}

// compared modulo base64 padding, or by value when the statement echoes the
// nonce base64 encoded
fn nonce_matches(actual: &str, expected: &Nonce) -> bool {
    if actual.trim_end_matches('=') == expected.as_str().trim_end_matches('=') {
        return true;
    }

    base64::decode_any(actual).is_some_and(|d| d == expected.as_bytes())
}

// digests may be encoded with either base64 alphabet, with or without padding
fn digest_matches(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    match (base64::decode_any(a), base64::decode_any(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
