// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::Error;
use crate::token::Scheme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the nonce comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NonceMode {
    #[serde(rename = "local")]
    Local,
    /// Issued by the verification server
    #[serde(rename = "server")]
    Remote,
}

impl NonceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonceMode::Local => "local",
            NonceMode::Remote => "server",
        }
    }
}

impl fmt::Display for NonceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NonceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(NonceMode::Local),
            "server" => Ok(NonceMode::Remote),
            unknown => Err(Error::UnsupportedOption(format!("nonce mode '{unknown}'"))),
        }
    }
}

/// Where the token is verified
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerifyMode {
    /// Decrypted and verified in this process
    #[serde(rename = "local")]
    Local,
    /// The verification server asks the attestation provider to decode the
    /// token
    #[serde(rename = "google")]
    RemoteProvider,
    /// The verification server decodes the token itself
    #[serde(rename = "server")]
    RemoteServer,
}

impl VerifyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyMode::Local => "local",
            VerifyMode::RemoteProvider => "google",
            VerifyMode::RemoteServer => "server",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, VerifyMode::Local)
    }

    pub fn is_available_for(&self, scheme: Scheme) -> bool {
        match self {
            VerifyMode::RemoteProvider => scheme == Scheme::PlayIntegrity,
            VerifyMode::Local | VerifyMode::RemoteServer => true,
        }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerifyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(VerifyMode::Local),
            "google" => Ok(VerifyMode::RemoteProvider),
            "server" => Ok(VerifyMode::RemoteServer),
            unknown => Err(Error::Configuration(format!(
                "verify mode '{unknown}' is unknown"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modes() {
        assert_eq!("server".parse::<NonceMode>(), Ok(NonceMode::Remote));
        assert_eq!("google".parse::<VerifyMode>(), Ok(VerifyMode::RemoteProvider));
        assert_eq!(VerifyMode::RemoteServer.to_string(), "server");
    }

    #[test]
    fn unknown_modes_are_named() {
        assert_eq!(
            "remote".parse::<NonceMode>(),
            Err(Error::UnsupportedOption("nonce mode 'remote'".to_string()))
        );
        assert_eq!(
            "cloud".parse::<VerifyMode>(),
            Err(Error::Configuration("verify mode 'cloud' is unknown".to_string()))
        );
    }

    #[test]
    fn availability_per_scheme() {
        assert!(VerifyMode::RemoteProvider.is_available_for(Scheme::PlayIntegrity));
        assert!(!VerifyMode::RemoteProvider.is_available_for(Scheme::SafetyNet));
        assert!(VerifyMode::RemoteServer.is_available_for(Scheme::SafetyNet));
    }
}
