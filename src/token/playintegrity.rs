// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst};

/// Device recognition verdict of a genuine device that passes system integrity
pub const MEETS_DEVICE_INTEGRITY: &str = "MEETS_DEVICE_INTEGRITY";
pub const MEETS_BASIC_INTEGRITY: &str = "MEETS_BASIC_INTEGRITY";
pub const MEETS_STRONG_INTEGRITY: &str = "MEETS_STRONG_INTEGRITY";
pub const MEETS_VIRTUAL_INTEGRITY: &str = "MEETS_VIRTUAL_INTEGRITY";

#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDetails {
    pub request_package_name: Option<String>,
    /// Sent as a string by the service, accepted as a number too
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub timestamp_millis: Option<i64>,
    pub nonce: Option<String>,
}

#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppIntegrity {
    /// PLAY_RECOGNIZED, UNRECOGNIZED_VERSION or UNEVALUATED
    pub app_recognition_verdict: Option<String>,
    pub package_name: Option<String>,
    pub certificate_sha256_digest: Vec<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub version_code: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentDeviceActivity {
    /// LEVEL_1 (lowest) to LEVEL_4 (highest), or UNEVALUATED
    pub device_activity_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceIntegrity {
    /// A set of verdict labels; an empty set means none of the integrity
    /// levels is met
    pub device_recognition_verdict: Vec<String>,
    pub recent_device_activity: Option<RecentDeviceActivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountDetails {
    /// LICENSED, UNLICENSED or UNEVALUATED
    pub app_licensing_verdict: Option<String>,
}

/// A Play Integrity verdict.  Each section is absent when the corresponding
/// evaluation did not run, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayIntegrityStatement {
    pub request_details: Option<RequestDetails>,
    pub app_integrity: Option<AppIntegrity>,
    pub device_integrity: Option<DeviceIntegrity>,
    pub account_details: Option<AccountDetails>,
}

impl PlayIntegrityStatement {
    pub fn decode(v: &Value) -> Result<Self, Error> {
        if !v.is_object() {
            return Err(Error::TypeMismatch(
                "Play Integrity payload MUST be an object".to_string(),
            ));
        }

        PlayIntegrityStatement::deserialize(v).map_err(|e| Error::TypeMismatch(e.to_string()))
    }

    pub fn nonce(&self) -> Option<&str> {
        self.request_details.as_ref()?.nonce.as_deref()
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        self.request_details.as_ref()?.timestamp_millis
    }

    pub fn device_recognition_verdict(&self) -> &[String] {
        self.device_integrity
            .as_ref()
            .map(|d| d.device_recognition_verdict.as_slice())
            .unwrap_or_default()
    }

    pub fn meets_device_integrity(&self) -> bool {
        self.device_recognition_verdict()
            .iter()
            .any(|v| v == MEETS_DEVICE_INTEGRITY)
    }
}
