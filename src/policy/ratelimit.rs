// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::RateLimitError;
use crate::store::IRequestHistoryStore;
use crate::token::Scheme;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MIN_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_MAX_REQUESTS_PER_WINDOW: usize = 3;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Minimum time between two consecutive requests
    pub min_interval_ms: u64,
    /// Requests allowed within any sliding window
    pub max_requests_per_window: usize,
    pub window_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_requests_per_window: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

/// Throttles attestation requests of one scheme.  Accepted requests are
/// recorded in the history store under the limiter's namespace; the history
/// only ever holds the `max_requests_per_window` most recent timestamps.
pub struct RateLimiter {
    store: Arc<dyn IRequestHistoryStore>,
    namespace: String,
    config: RateLimiterConfig,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("namespace", &self.namespace)
            .field("config", &self.config)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn IRequestHistoryStore>,
        namespace: &str,
        config: RateLimiterConfig,
    ) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            config,
        }
    }

    /// A limiter keeping its history in the namespace reserved for `scheme`
    pub fn for_scheme(
        store: Arc<dyn IRequestHistoryStore>,
        scheme: Scheme,
        config: RateLimiterConfig,
    ) -> Self {
        Self::new(store, scheme.history_namespace(), config)
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    pub fn check_now(&self) -> Result<(), RateLimitError> {
        self.check(super::now_ms())
    }

    /// Admit a request issued at `now_ms` (milliseconds since the epoch) and
    /// record it, or explain how long to wait.  Rejected requests are not
    /// recorded.  The decision and the record happen in one store update, so
    /// limiters sharing a store never admit more than the budget between them.
    pub fn check(&self, now_ms: i64) -> Result<(), RateLimitError> {
        let mut verdict = Ok(());

        self.store
            .update(&self.namespace, &mut |history| {
                verdict = self.admit(history, now_ms);
                verdict.is_ok()
            })
            .map_err(|e| RateLimitError::StorageUnavailable(e.to_string()))?;

        if verdict.is_ok() {
            debug!(namespace = %self.namespace, now_ms, "request admitted");
        }

        verdict
    }

    fn admit(&self, history: &mut Vec<i64>, now_ms: i64) -> Result<(), RateLimitError> {
        // newest first
        history.sort_unstable_by(|a, b| b.cmp(a));

        if let Some(last) = history.first() {
            let elapsed = elapsed_ms(*last, now_ms);

            if elapsed < self.config.min_interval_ms {
                let retry_after_ms = self.config.min_interval_ms - elapsed;
                debug!(namespace = %self.namespace, retry_after_ms, "request too soon");
                return Err(RateLimitError::TooSoon { retry_after_ms });
            }
        }

        let max = self.config.max_requests_per_window;

        if max == 0 {
            return Err(RateLimitError::WindowExhausted {
                retry_after_ms: self.config.window_ms,
                max_requests: max,
                window_ms: self.config.window_ms,
            });
        }

        if let Some(oldest) = history.get(max - 1) {
            let elapsed = elapsed_ms(*oldest, now_ms);

            if elapsed < self.config.window_ms {
                let retry_after_ms = self.config.window_ms - elapsed;
                debug!(namespace = %self.namespace, retry_after_ms, "request window exhausted");
                return Err(RateLimitError::WindowExhausted {
                    retry_after_ms,
                    max_requests: max,
                    window_ms: self.config.window_ms,
                });
            }
        }

        history.insert(0, now_ms);
        history.truncate(max);

        Ok(())
    }
}

// a clock that went backwards counts as no time elapsed
fn elapsed_ms(then: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(then)).unwrap_or(0)
}
