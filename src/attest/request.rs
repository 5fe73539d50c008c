// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::mode::{NonceMode, VerifyMode};
use crate::errors::Error;
use crate::token::Scheme;
use serde::{Deserialize, Serialize};

/// One user-triggered attestation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRequest {
    pub nonce_mode: NonceMode,
    pub verify_mode: VerifyMode,
    pub server_url: Option<String>,
}

impl AttestationRequest {
    pub fn new(nonce_mode: NonceMode, verify_mode: VerifyMode, server_url: Option<&str>) -> Self {
        Self {
            nonce_mode,
            verify_mode,
            server_url: server_url.map(str::to_string),
        }
    }

    pub fn needs_server(&self) -> bool {
        self.nonce_mode == NonceMode::Remote || self.verify_mode.is_remote()
    }

    /// The server URL, if one is set and not blank
    pub fn server_url(&self) -> Option<&str> {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Check the request can be served for `scheme` before anything is
    /// attempted
    pub fn validate(&self, scheme: Scheme) -> Result<(), Error> {
        if !self.verify_mode.is_available_for(scheme) {
            return Err(Error::Configuration(format!(
                "verify mode '{}' is not available for {scheme}",
                self.verify_mode
            )));
        }

        if self.needs_server() && self.server_url().is_none() {
            return Err(Error::Configuration(
                "a verification server URL is required by the selected modes".to_string(),
            ));
        }

        Ok(())
    }
}
