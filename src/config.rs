// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;

/// Controller configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of concurrent reconcile workers
    pub workers: usize,
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let workers: usize = env::var("WORKER_COUNT")
            .unwrap_or("1".to_string())
            .parse()
            .context("WORKER_COUNT must be a positive integer")?;
        let watch_namespace = env::var("WATCH_NAMESPACE").ok().filter(|ns| !ns.is_empty());

        Ok(Config {
            workers: workers.max(1),
            watch_namespace,
        })
    }
}
