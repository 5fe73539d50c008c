// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use openssl::pkey::PKey;
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

/// Key material shared out-of-band by the integrity service for envelopes
/// that are encrypted to the relying party and then signed by the service
#[serde_with::serde_as]
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
pub struct PinnedKeys {
    /// Raw AES key used to unwrap the JWE content encryption key.  It is
    /// carried as standard base64 in the JSON store.
    #[serde(rename = "decryption-key")]
    #[serde_as(as = "serde_with::base64::Base64")]
    pub decryption_key: Vec<u8>,

    /// DER-encoded SubjectPublicKeyInfo of the service's signing key,
    /// standard base64 in the JSON store
    #[serde(rename = "verification-key")]
    #[serde_as(as = "serde_with::base64::Base64")]
    pub verification_key: Vec<u8>,
}

impl PinnedKeys {
    pub fn validate(&self) -> Result<(), Error> {
        match self.decryption_key.len() {
            16 | 24 | 32 => {}
            n => {
                return Err(Error::Sema(format!(
                    "decryption-key must be 16, 24 or 32 bytes, got {n}"
                )))
            }
        }

        PKey::public_key_from_der(&self.verification_key)
            .map_err(|e| Error::Sema(format!("verification-key: {e}")))?;

        Ok(())
    }
}

/// JSON format of the trust anchor store
#[derive(Clone, Deserialize, Debug, Default)]
pub struct TrustAnchors {
    #[serde(rename(deserialize = "play-integrity"))]
    pub play_integrity: Option<PinnedKeys>,

    /// Concatenated PEM certificates
    #[serde(rename(deserialize = "safetynet-roots"))]
    raw_roots: Option<String>,

    #[serde(skip)]
    pub roots: Vec<X509>,
}

impl TrustAnchors {
    pub fn parse(j: &str) -> Result<Self, Error> {
        let mut v: TrustAnchors =
            serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))?;

        if let Some(k) = &v.play_integrity {
            k.validate()?;
        }

        v.parse_roots()?;

        Ok(v)
    }

    fn parse_roots(&mut self) -> Result<(), Error> {
        let Some(pem) = &self.raw_roots else {
            return Ok(());
        };

        let roots =
            X509::stack_from_pem(pem.as_bytes()).map_err(|e| Error::Syntax(e.to_string()))?;

        if roots.is_empty() {
            return Err(Error::Sema(
                "safetynet-roots contains no certificates".to_string(),
            ));
        }

        self.roots = roots;

        Ok(())
    }
}
