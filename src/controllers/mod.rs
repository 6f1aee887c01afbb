// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controller driver, event routing, and shared worker context.

pub mod router;
pub mod shell;

pub use shell::ShellController;

use crate::cache::DeploymentCache;
use crate::queue::WorkQueue;
use kube::Client;
use std::sync::Arc;

/// State shared by every reconcile worker. Built once at startup and passed
/// explicitly; no component reaches for globals.
pub struct Context {
    pub client: Client,
    pub cache: DeploymentCache,
    pub queue: Arc<WorkQueue>,
}
