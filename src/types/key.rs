// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed (namespace, name) identity for watched deployments.

use crate::error::{Result, StowawayError};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector::ObjectRef;
use kube::Resource;
use std::fmt;

/// Identity of a watched deployment, used for queuing and deduplication.
/// Derived once at the watch boundary; everything downstream works with
/// this type instead of re-parsing strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derive the key from a watched deployment. Fails if the object carries
    /// no name or namespace, which the API server should never hand us.
    pub fn from_resource(deployment: &Deployment) -> Result<Self> {
        let meta = deployment.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| StowawayError::MalformedKey("deployment has no name".to_string()))?;
        let namespace = meta.namespace.clone().ok_or_else(|| {
            StowawayError::MalformedKey(format!("deployment {} has no namespace", name))
        })?;

        Ok(Self { namespace, name })
    }

    /// Reference used for cache store lookups
    pub fn object_ref(&self) -> ObjectRef<Deployment> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
