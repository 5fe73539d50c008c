// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::IRequestHistoryStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// Volatile request history, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoRequestHistoryStore {
    h: RwLock<HashMap<String, Vec<i64>>>,
}

impl MemoRequestHistoryStore {
    pub fn new() -> Self {
        Default::default()
    }
}

impl IRequestHistoryStore for MemoRequestHistoryStore {
    fn load(&self, namespace: &str) -> Result<Vec<i64>, Error> {
        let h = self.h.read().map_err(|e| Error::Sema(e.to_string()))?;

        Ok(h.get(namespace).cloned().unwrap_or_default())
    }

    fn update(
        &self,
        namespace: &str,
        f: &mut dyn FnMut(&mut Vec<i64>) -> bool,
    ) -> Result<(), Error> {
        let mut h = self.h.write().map_err(|e| Error::Sema(e.to_string()))?;

        let mut history = h.get(namespace).cloned().unwrap_or_default();

        if f(&mut history) {
            h.insert(namespace.to_string(), history);
        }

        Ok(())
    }
}
