// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Device integrity attestation: nonce generation, token decoding,
//! verification and appraisal.
//!
//! The crate supports the two Android attestation schemes:
//!
//! * Play Integrity, whose verdicts are JWS tokens encrypted into a JWE with
//!   per-application keys
//! * SafetyNet, whose statements are JWS tokens signed by a certificate chain
//!   embedded in the token itself
//!
//! The API allows:
//! * Generating nonces locally or obtaining them from a verification server
//! * Decrypting and cryptographically verifying tokens against pinned keys or
//!   trusted roots ([`token::EnvelopeCodec`])
//! * Decoding the verified payload into a typed [`token::Statement`]
//! * Appraising the statement against reference values
//!   ([`policy::PolicyVerifier`])
//! * Delegating verification to a remote server ([`remote::RemoteCheckClient`])
//! * Driving whole, rate-limited requests and observing their state
//!   ([`attest::Orchestrator`])

pub mod attest;
mod errors;
pub mod nonce;
pub mod policy;
pub mod remote;
pub mod store;
pub mod token;

#[cfg(test)]
mod testutil;

pub use self::errors::{Error, ErrorKind};
