// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PACKAGE_NAME: &str = "com.henrikherzig.playintegritychecker";
pub const DEFAULT_HOSTNAME: &str = "attest.android.com";
pub const DEFAULT_MAX_SKEW_MS: u64 = 10_000;
pub const DEFAULT_FUTURE_TOLERANCE_MS: u64 = 60_000;

/// Base64 SHA-256 digests of the known-good app signing certificates
pub const DEFAULT_CERTIFICATE_DIGESTS: [&str; 3] = [
    "rnv+gyOF6I07XyGZzNfPXz5K9zqX5aEzChFdowrzLm0=",
    "a+yXX21Qt/feRZckl6bm1awqvzBPGOV9OUZ4HMDOUog=",
    "rJfDDAnNl4/Kq2MkpwESX519oXToUgpUnpPmDTQIq2M=",
];

/// JSON format for the reference values a statement is appraised against.
/// Every field is optional in the JSON and falls back to the defaults above.
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RefValues {
    /// Application identifier the statement must be about
    #[serde(rename = "package-name")]
    pub package_name: String,

    /// Allow-list of app signing certificate digests.  Entries match the
    /// digests reported in the statement by decoded value, so either base64
    /// alphabet, padded or not, is accepted on both sides.
    #[serde(rename = "certificate-digests")]
    pub certificate_digests: Vec<String>,

    /// Maximum age of a statement, in milliseconds (inclusive)
    #[serde(rename = "max-skew-ms")]
    pub max_skew_ms: u64,

    /// How far in the future a statement timestamp may be before it is
    /// rejected rather than just logged
    #[serde(rename = "future-tolerance-ms")]
    pub future_tolerance_ms: u64,

    /// Host the leaf of an embedded certificate chain must be issued to
    pub hostname: String,
}

impl Default for RefValues {
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            certificate_digests: DEFAULT_CERTIFICATE_DIGESTS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            max_skew_ms: DEFAULT_MAX_SKEW_MS,
            future_tolerance_ms: DEFAULT_FUTURE_TOLERANCE_MS,
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }
}

impl RefValues {
    /// Parse reference values from JSON
    pub fn parse(j: &str) -> Result<Self, Error> {
        let v: RefValues = serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))?;

        v.validate()?;

        Ok(v)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.package_name.is_empty() {
            return Err(Error::Sema("package-name must not be empty".to_string()));
        }

        if self.hostname.is_empty() {
            return Err(Error::Sema("hostname must not be empty".to_string()));
        }

        if self.certificate_digests.iter().any(String::is_empty) {
            return Err(Error::Sema(
                "certificate-digests must not contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}
