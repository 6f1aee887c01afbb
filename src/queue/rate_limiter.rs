// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-key exponential backoff tracking for failed work items.

use crate::constants::queue::{BASE_DELAY_MS, MAX_DELAY_SECS};
use crate::types::ObjectKey;
use std::collections::HashMap;
use std::time::Duration;

/// Tracks consecutive failures per key. Every call to `next_delay` counts as
/// one more failure; `forget` clears the key's history after a terminal
/// outcome.
#[derive(Debug, Default)]
pub struct RateLimiter {
    failures: HashMap<ObjectKey, u32>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            failures: HashMap::new(),
        }
    }

    /// Delay before the key may be retried: base doubled per previous
    /// consecutive failure, capped at the configured maximum.
    pub fn next_delay(&mut self, key: &ObjectKey) -> Duration {
        let failures = self.failures.entry(key.clone()).or_insert(0);
        let exponent = *failures;
        *failures = failures.saturating_add(1);

        let max = Duration::from_secs(MAX_DELAY_SECS);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        Duration::from_millis(BASE_DELAY_MS)
            .checked_mul(multiplier)
            .unwrap_or(max)
            .min(max)
    }

    /// Reset the failure history for a key
    pub fn forget(&mut self, key: &ObjectKey) {
        self.failures.remove(key);
    }

    /// Number of consecutive failures recorded for a key
    pub fn retries(&self, key: &ObjectKey) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }
}
