// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::trustanchor::{PinnedKeys, TrustAnchors};
use super::ITrustAnchorStore;
use openssl::x509::X509;
use std::sync::RwLock;

/// In-memory store for the pinned Play Integrity keys and the SafetyNet
/// trust roots.
#[derive(Debug)]
pub struct MemoTrustAnchorStore {
    k: RwLock<Option<PinnedKeys>>,
    r: RwLock<Vec<X509>>,
}

impl Default for MemoTrustAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoTrustAnchorStore {
    /// Returns a new empty TrustAnchorStore
    pub fn new() -> Self {
        Self {
            k: Default::default(),
            r: Default::default(),
        }
    }

    /// Add to an existing (and possibly empty) TrustAnchorStore the trust
    /// anchors loaded from the given JSON file.  Pinned keys replace any
    /// previously loaded ones, roots are appended.
    pub fn load_json(&mut self, j: &str) -> Result<(), Error> {
        let tas = TrustAnchors::parse(j)?;

        if let Some(keys) = tas.play_integrity {
            *self
                .k
                .write()
                .map_err(|e| Error::Sema(e.to_string()))? = Some(keys);
        }

        self.r
            .write()
            .map_err(|e| Error::Sema(e.to_string()))?
            .extend(tas.roots);

        Ok(())
    }
}

impl ITrustAnchorStore for MemoTrustAnchorStore {
    fn lookup_pinned_keys(&self) -> Option<PinnedKeys> {
        self.k.read().ok()?.clone()
    }

    fn lookup_roots(&self) -> Vec<X509> {
        self.r.read().map(|r| r.clone()).unwrap_or_default()
    }
}
