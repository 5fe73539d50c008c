// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::Scheme;
use super::errors::Error;
use super::playintegrity::PlayIntegrityStatement;
use super::safetynet::SafetyNetStatement;
use serde::Serialize;
use serde_json::Value;

/// The trusted outcome of verification, one variant per scheme
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Statement {
    PlayIntegrity(PlayIntegrityStatement),
    SafetyNet(SafetyNetStatement),
}

impl Statement {
    /// Map a verified payload into the statement type of `scheme`
    pub fn parse(scheme: Scheme, v: &Value) -> Result<Self, Error> {
        match scheme {
            Scheme::PlayIntegrity => Ok(Statement::PlayIntegrity(
                PlayIntegrityStatement::decode(v)?,
            )),
            Scheme::SafetyNet => Ok(Statement::SafetyNet(SafetyNetStatement::decode(v)?)),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Statement::PlayIntegrity(_) => Scheme::PlayIntegrity,
            Statement::SafetyNet(_) => Scheme::SafetyNet,
        }
    }

    pub fn nonce(&self) -> Option<&str> {
        match self {
            Statement::PlayIntegrity(s) => s.nonce(),
            Statement::SafetyNet(s) => Some(&s.nonce),
        }
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        match self {
            Statement::PlayIntegrity(s) => s.timestamp_ms(),
            Statement::SafetyNet(s) => Some(s.timestamp_ms),
        }
    }

    /// Every package name the statement vouches for
    pub fn package_names(&self) -> Vec<&str> {
        match self {
            Statement::PlayIntegrity(s) => {
                let mut names = vec![];
                if let Some(n) = s
                    .request_details
                    .as_ref()
                    .and_then(|r| r.request_package_name.as_deref())
                {
                    names.push(n);
                }
                if let Some(n) = s
                    .app_integrity
                    .as_ref()
                    .and_then(|a| a.package_name.as_deref())
                {
                    names.push(n);
                }
                names
            }
            Statement::SafetyNet(s) => vec![s.apk_package_name.as_str()],
        }
    }

    pub fn certificate_digests(&self) -> &[String] {
        match self {
            Statement::PlayIntegrity(s) => s
                .app_integrity
                .as_ref()
                .map(|a| a.certificate_sha256_digest.as_slice())
                .unwrap_or_default(),
            Statement::SafetyNet(s) => &s.apk_certificate_digest_sha256,
        }
    }

    /// Whether the statement asserts a genuine, compatible device profile
    pub fn claims_device_integrity(&self) -> bool {
        match self {
            Statement::PlayIntegrity(s) => s.meets_device_integrity(),
            Statement::SafetyNet(s) => s.cts_profile_match,
        }
    }
}
