// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;

/// Interface to the store where past request timestamps are kept, one ordered
/// history per namespace.
pub trait IRequestHistoryStore: Send + Sync {
    /// Load the timestamps (milliseconds since the epoch, most recent first)
    /// recorded under `namespace`.  An unknown namespace has an empty history.
    fn load(&self, namespace: &str) -> Result<Vec<i64>, Error>;

    /// Read-modify-write the history recorded under `namespace` as a single
    /// atomic step: no other update of the same store, from this process or
    /// another one sharing it, can interleave.  `f` edits the history in
    /// place and returns whether it must be written back.
    fn update(
        &self,
        namespace: &str,
        f: &mut dyn FnMut(&mut Vec<i64>) -> bool,
    ) -> Result<(), Error>;
}
