// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StowawayError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Object is missing identity: {0}")]
    MalformedKey(String),

    #[error("Deployment cache failed to sync: {0}")]
    CacheSyncFailed(String),
}

pub type Result<T> = std::result::Result<T, StowawayError>;
