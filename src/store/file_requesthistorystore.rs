// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::IRequestHistoryStore;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Request history persisted as a JSON object mapping each namespace to its
/// list of timestamps, so that rate limits survive process restarts.
///
/// Updates hold an advisory lock on a sibling `.lock` file, which serializes
/// them across every store (and every process) sharing the same path.
#[derive(Debug)]
pub struct FileRequestHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRequestHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, Vec<i64>>, Error> {
        let j = match fs::read_to_string(&self.path) {
            Ok(j) => j,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        if j.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&j).map_err(|e| Error::Syntax(e.to_string()))
    }

    fn write_all(&self, h: &HashMap<String, Vec<i64>>) -> Result<(), Error> {
        let j = serde_json::to_string_pretty(h).map_err(|e| Error::Syntax(e.to_string()))?;

        // replaced through a sibling file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, j)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Block until this process owns the store's lock file.  The lock is
    /// released when the returned file is closed.
    fn lock_file(&self) -> Result<File, Error> {
        let f = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("lock"))?;

        #[cfg(unix)]
        {
            use nix::fcntl::{flock, FlockArg};
            use std::os::unix::io::AsRawFd;

            flock(f.as_raw_fd(), FlockArg::LockExclusive)
                .map_err(|e| Error::Io(format!("locking request history: {e}")))?;
        }

        Ok(f)
    }
}

impl IRequestHistoryStore for FileRequestHistoryStore {
    fn load(&self, namespace: &str) -> Result<Vec<i64>, Error> {
        let _g = self.lock.lock().map_err(|e| Error::Sema(e.to_string()))?;

        Ok(self.read_all()?.remove(namespace).unwrap_or_default())
    }

    fn update(
        &self,
        namespace: &str,
        f: &mut dyn FnMut(&mut Vec<i64>) -> bool,
    ) -> Result<(), Error> {
        let _g = self.lock.lock().map_err(|e| Error::Sema(e.to_string()))?;
        let _lf = self.lock_file()?;

        let mut h = self.read_all()?;
        let mut history = h.remove(namespace).unwrap_or_default();

        if !f(&mut history) {
            return Ok(());
        }

        h.insert(namespace.to_string(), history);

        self.write_all(&h)
    }
}
