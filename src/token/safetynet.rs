// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64;
use super::common::*;
use super::errors::Error;
use bitmask::*;
use serde::Serialize;
use serde_json::{Map, Value};

const NONCE: &str = "nonce";
const TIMESTAMP_MS: &str = "timestampMs";
const APK_PACKAGE_NAME: &str = "apkPackageName";
const APK_CERTIFICATE_DIGEST_SHA256: &str = "apkCertificateDigestSha256";
const APK_DIGEST_SHA256: &str = "apkDigestSha256";
const CTS_PROFILE_MATCH: &str = "ctsProfileMatch";
const BASIC_INTEGRITY: &str = "basicIntegrity";
const EVALUATION_TYPE: &str = "evaluationType";
const ADVICE: &str = "advice";
const ERROR: &str = "error";

const EVALUATION_BASIC: &str = "BASIC";
const EVALUATION_HARDWARE_BACKED: &str = "HARDWARE_BACKED";

bitmask! {
    #[derive(Debug)]
    mask ClaimsSet: u8 where flags Claims {
        Nonce              = 0x01,
        TimestampMs        = 0x02,
        ApkPackageName     = 0x04,
        ApkCertDigests     = 0x08,
        ApkDigest          = 0x10,
        CtsProfileMatch    = 0x20,
        BasicIntegrity     = 0x40,
        EvaluationType     = 0x80,
    }
}

/// A SafetyNet attestation statement.  Unlike Play Integrity verdicts, every
/// field except `advice` and `error` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyNetStatement {
    /// The nonce echoed back by the attestation service, base64 encoded
    pub nonce: String,
    pub timestamp_ms: i64,
    pub apk_package_name: String,
    pub apk_certificate_digest_sha256: Vec<String>,
    pub apk_digest_sha256: String,
    pub cts_profile_match: bool,
    pub basic_integrity: bool,
    /// Comma separated list, e.g. "BASIC,HARDWARE_BACKED"
    pub evaluation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip)]
    claims_set: ClaimsSet,
}

impl Default for SafetyNetStatement {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyNetStatement {
    pub fn new() -> Self {
        Self {
            nonce: String::new(),
            timestamp_ms: 0,
            apk_package_name: String::new(),
            apk_certificate_digest_sha256: Vec::new(),
            apk_digest_sha256: String::new(),
            cts_profile_match: false,
            basic_integrity: false,
            evaluation_type: String::new(),
            advice: None,
            error: None,

            claims_set: ClaimsSet::none(),
        }
    }

    /// Map a verified JSON payload into a statement, failing on the first
    /// missing or mistyped mandatory claim
    pub fn decode(v: &Value) -> Result<Self, Error> {
        let contents = v
            .as_object()
            .ok_or_else(|| Error::TypeMismatch("SafetyNet payload MUST be an object".to_string()))?;

        let mut s = Self::new();

        s.parse(contents)?;
        s.validate()?;

        Ok(s)
    }

    fn parse(&mut self, contents: &Map<String, Value>) -> Result<(), Error> {
        for (k, v) in contents.iter() {
            match k.as_str() {
                NONCE => {
                    self.nonce = to_tstr(v, NONCE)?;
                    self.claims_set.set(Claims::Nonce);
                }
                TIMESTAMP_MS => {
                    self.timestamp_ms = to_int(v, TIMESTAMP_MS)?;
                    self.claims_set.set(Claims::TimestampMs);
                }
                APK_PACKAGE_NAME => {
                    self.apk_package_name = to_tstr(v, APK_PACKAGE_NAME)?;
                    self.claims_set.set(Claims::ApkPackageName);
                }
                APK_CERTIFICATE_DIGEST_SHA256 => {
                    self.apk_certificate_digest_sha256 =
                        to_tstr_array(v, APK_CERTIFICATE_DIGEST_SHA256)?;
                    self.claims_set.set(Claims::ApkCertDigests);
                }
                APK_DIGEST_SHA256 => {
                    self.apk_digest_sha256 = to_tstr(v, APK_DIGEST_SHA256)?;
                    self.claims_set.set(Claims::ApkDigest);
                }
                CTS_PROFILE_MATCH => {
                    self.cts_profile_match = to_bool(v, CTS_PROFILE_MATCH)?;
                    self.claims_set.set(Claims::CtsProfileMatch);
                }
                BASIC_INTEGRITY => {
                    self.basic_integrity = to_bool(v, BASIC_INTEGRITY)?;
                    self.claims_set.set(Claims::BasicIntegrity);
                }
                EVALUATION_TYPE => {
                    self.evaluation_type = to_tstr(v, EVALUATION_TYPE)?;
                    self.claims_set.set(Claims::EvaluationType);
                }
                ADVICE => self.advice = Some(to_tstr(v, ADVICE)?),
                ERROR => self.error = Some(to_tstr(v, ERROR)?),
                // the service adds fields over time, ignore what we don't know
                _ => continue,
            }
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let mandatory_claims = [
            (Claims::Nonce, NONCE),
            (Claims::TimestampMs, TIMESTAMP_MS),
            (Claims::ApkPackageName, APK_PACKAGE_NAME),
            (Claims::ApkCertDigests, APK_CERTIFICATE_DIGEST_SHA256),
            (Claims::ApkDigest, APK_DIGEST_SHA256),
            (Claims::CtsProfileMatch, CTS_PROFILE_MATCH),
            (Claims::BasicIntegrity, BASIC_INTEGRITY),
            (Claims::EvaluationType, EVALUATION_TYPE),
        ];

        for (c, n) in mandatory_claims.iter() {
            if !self.claims_set.contains(*c) {
                return Err(Error::MissingClaim(n.to_string()));
            }
        }

        Ok(())
    }

    /// The nonce as it was originally requested, if the echoed value is
    /// valid base64
    pub fn decoded_nonce(&self) -> Option<Vec<u8>> {
        base64::decode_any(&self.nonce)
    }

    pub fn has_basic_evaluation_type(&self) -> bool {
        self.evaluation_types().any(|t| t == EVALUATION_BASIC)
    }

    pub fn has_hardware_backed_evaluation_type(&self) -> bool {
        self.evaluation_types()
            .any(|t| t == EVALUATION_HARDWARE_BACKED)
    }

    fn evaluation_types(&self) -> impl Iterator<Item = &str> {
        self.evaluation_type.split(',').map(str::trim)
    }
}
