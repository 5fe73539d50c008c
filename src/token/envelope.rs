// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::Scheme;
use super::errors::Error;
use super::{jwe, jws};
use crate::store::{ITrustAnchorStore, PinnedKeys, DEFAULT_HOSTNAME};
use openssl::x509::X509;
use serde_json::Value;
use tracing::debug;

/// The payload of an envelope whose cryptographic protection has been
/// checked.  It is still untyped; see [`super::Statement::parse`].
#[derive(Debug, Clone)]
pub struct VerifiedPayload {
    pub claims: Value,
    /// Leaf certificate that signed the payload, for envelopes carrying
    /// their own certificate chain
    pub certificate: Option<X509>,
}

/// Decodes the envelope format of each scheme using the configured key
/// material:
///
/// * Play Integrity: a JWE, decrypted with the pinned AES key, whose
///   plaintext is a JWS verified with the pinned EC public key
/// * SafetyNet: a JWS signed by the leaf of its `x5c` chain; the chain must
///   lead to one of the configured roots and the leaf must be issued to the
///   expected host
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    keys: Option<PinnedKeys>,
    roots: Vec<X509>,
    hostname: String,
}

impl EnvelopeCodec {
    pub fn new(keys: Option<PinnedKeys>, roots: Vec<X509>) -> Self {
        Self {
            keys,
            roots,
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }

    /// Pick up whatever key material the store holds
    pub fn from_store(tas: &impl ITrustAnchorStore) -> Self {
        Self::new(tas.lookup_pinned_keys(), tas.lookup_roots())
    }

    /// Expect embedded certificate chains to be issued to `hostname`
    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn decode(&self, envelope: &str, scheme: Scheme) -> Result<VerifiedPayload, Error> {
        match scheme {
            Scheme::PlayIntegrity => self.decode_nested(envelope),
            Scheme::SafetyNet => self.decode_signed(envelope),
        }
    }

    fn decode_nested(&self, envelope: &str) -> Result<VerifiedPayload, Error> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| Error::Key("no pinned keys configured".to_string()))?;

        let plaintext = jwe::decrypt(envelope, &keys.decryption_key)?;
        debug!(len = plaintext.len(), "JWE decrypted");

        let inner = std::str::from_utf8(&plaintext)
            .map_err(|e| Error::Syntax(format!("JWE plaintext is not a JWS: {e}")))?;

        let claims = jws::verify_with_spki(inner, &keys.verification_key)?;

        Ok(VerifiedPayload {
            claims,
            certificate: None,
        })
    }

    fn decode_signed(&self, envelope: &str) -> Result<VerifiedPayload, Error> {
        let (claims, leaf) = jws::verify_embedded(envelope.trim(), &self.roots, &self.hostname)?;

        Ok(VerifiedPayload {
            claims,
            certificate: Some(leaf),
        })
    }
}
