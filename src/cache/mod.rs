// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Locally held mirror of the watched deployment collection.

pub mod deployments;

pub use deployments::DeploymentCache;
