// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reflector-backed deployment cache with a readiness gate.

use crate::error::{Result, StowawayError};
use crate::types::ObjectKey;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector::store::Writer;
use kube::runtime::reflector::{self, Store};
use std::sync::Arc;

/// Read side of the deployment reflector. Entries are written only by the
/// watch stream; reconcile workers treat this as a read-only snapshot and
/// write through the API server instead.
#[derive(Clone)]
pub struct DeploymentCache {
    store: Store<Deployment>,
}

impl DeploymentCache {
    /// Create the cache together with the writer the watch stream feeds
    pub fn new() -> (Self, Writer<Deployment>) {
        let (store, writer) = reflector::store();
        (Self { store }, writer)
    }

    /// Point lookup. `None` covers both "never existed" and "deleted since
    /// the key was queued"; callers treat the two identically.
    pub fn get(&self, key: &ObjectKey) -> Option<Arc<Deployment>> {
        self.store.get(&key.object_ref())
    }

    /// Resolve once the initial list has been applied. Workers must not
    /// start before this, or they would reconcile against a partial view.
    pub async fn wait_until_synced(&self) -> Result<()> {
        self.store
            .wait_until_ready()
            .await
            .map_err(|e| StowawayError::CacheSyncFailed(e.to_string()))
    }
}
