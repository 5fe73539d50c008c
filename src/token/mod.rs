// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The token module turns an untrusted compact-serialized attestation token
//! into a typed [`Statement`].  Decoding happens in two steps: the
//! [`EnvelopeCodec`] checks the cryptographic protection and yields a
//! [`VerifiedPayload`], then [`Statement::parse`] maps the payload onto the
//! claims of the relevant [`Scheme`].
//!
//! # Example
//!
//! ```no_run
//! use devattest::store::{ITrustAnchorStore, MemoTrustAnchorStore};
//! use devattest::token::{EnvelopeCodec, Scheme, Statement};
//!
//! let mut tas = MemoTrustAnchorStore::new();
//! tas.load_json(&std::fs::read_to_string("tastore.json").unwrap())
//!     .expect("loading trust anchors");
//!
//! let codec = EnvelopeCodec::from_store(&tas);
//!
//! let token = std::fs::read_to_string("token.jws").unwrap();
//! let payload = codec
//!     .decode(&token, Scheme::SafetyNet)
//!     .expect("verifying token");
//!
//! let statement = Statement::parse(Scheme::SafetyNet, &payload.claims)
//!     .expect("decoding statement");
//!
//! println!("{}", serde_json::to_string_pretty(&statement).unwrap());
//! ```

pub use self::common::Scheme;
pub use self::envelope::{EnvelopeCodec, VerifiedPayload};
pub use self::errors::Error;
pub use self::playintegrity::*;
pub use self::safetynet::SafetyNetStatement;
pub use self::statement::Statement;

pub(crate) mod base64;
mod common;
mod envelope;
mod errors;
pub mod jwe;
pub mod jws;
mod playintegrity;
mod safetynet;
mod statement;
