// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The attestation schemes understood by this crate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Play Integrity: JWE-wrapped JWS, multi-section verdict
    PlayIntegrity,
    /// SafetyNet: bare JWS with an embedded x5c chain, flat verdict
    SafetyNet,
}

impl Scheme {
    /// Path segment used by the verification server (`/api/{scheme}/...`)
    pub fn api_name(&self) -> &'static str {
        match self {
            Scheme::PlayIntegrity => "playintegrity",
            Scheme::SafetyNet => "safetynet",
        }
    }

    /// Namespace under which the request history of the scheme is persisted
    pub fn history_namespace(&self) -> &'static str {
        match self {
            Scheme::PlayIntegrity => "playIntegrityRequests",
            Scheme::SafetyNet => "safetyNetRequests",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playintegrity" => Ok(Scheme::PlayIntegrity),
            "safetynet" => Ok(Scheme::SafetyNet),
            unknown => Err(Error::Syntax(format!("unknown scheme {unknown}"))),
        }
    }
}

pub(crate) fn to_tstr(v: &Value, n: &str) -> Result<String, Error> {
    v.as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be a string")))
}

pub(crate) fn to_bool(v: &Value, n: &str) -> Result<bool, Error> {
    v.as_bool()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be a boolean")))
}

pub(crate) fn to_int(v: &Value, n: &str) -> Result<i64, Error> {
    v.as_i64()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be an integer")))
}

pub(crate) fn to_tstr_array(v: &Value, n: &str) -> Result<Vec<String>, Error> {
    let a = v
        .as_array()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be an array")))?;

    a.iter().map(|x| to_tstr(x, n)).collect()
}
