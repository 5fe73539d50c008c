// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::trustanchor::PinnedKeys;
use openssl::x509::X509;

/// Interface to the store where verification key material is stashed.
pub trait ITrustAnchorStore {
    /// Lookup the pinned decryption and verification keys used for nested
    /// (encrypted then signed) envelopes
    fn lookup_pinned_keys(&self) -> Option<PinnedKeys>;

    /// Lookup the CA certificates that embedded certificate chains must lead to
    fn lookup_roots(&self) -> Vec<X509>;
}
