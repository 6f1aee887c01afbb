// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sidecar mutation policy - decides whether a deployment needs the debug
//! sidecar injected or removed. Pure; never performs I/O.

use crate::constants::{annotations, sidecar};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Capabilities, Container, SecurityContext};

/// Corrective action for a deployment with respect to the sidecar policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarAction {
    /// Annotated but carrying no sidecar yet: inject it
    Inject,
    /// Carrying a sidecar without the annotation: remove it
    Remove,
    /// Already in the desired state
    Unchanged,
}

/// Decide the corrective action from annotation presence and the current
/// container list. The annotation value is deliberately not interpreted.
pub fn evaluate(deployment: &Deployment) -> SidecarAction {
    let annotated = deployment
        .metadata
        .annotations
        .as_ref()
        .is_some_and(|a| a.contains_key(annotations::SHELL));
    let present = containers(deployment)
        .iter()
        .any(|c| c.name == sidecar::CONTAINER_NAME);

    match (annotated, present) {
        (true, false) => SidecarAction::Inject,
        (false, true) => SidecarAction::Remove,
        _ => SidecarAction::Unchanged,
    }
}

/// Full desired object for a deployment that needs correcting, or `None`
/// when no update should be issued. Re-applying the policy to the returned
/// object always yields `Unchanged`.
pub fn desired_deployment(deployment: &Deployment) -> Option<Deployment> {
    let action = evaluate(deployment);
    if action == SidecarAction::Unchanged {
        return None;
    }

    let mut updated = deployment.clone();
    // A deployment without a pod template spec has nothing to edit
    let pod_spec = updated.spec.as_mut()?.template.spec.as_mut()?;
    if action == SidecarAction::Inject {
        pod_spec.containers.push(shell_container());
        pod_spec.share_process_namespace = Some(true);
    } else {
        pod_spec
            .containers
            .retain(|c| c.name != sidecar::CONTAINER_NAME);
        // Unset means disabled upstream; write the explicit value anyway
        pod_spec.share_process_namespace = Some(false);
    }

    Some(updated)
}

fn containers(deployment: &Deployment) -> &[Container] {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|s| s.containers.as_slice())
        .unwrap_or(&[])
}

/// The fixed debug container: interactive busybox shell that may ptrace its
/// pod siblings once process-namespace sharing is on
fn shell_container() -> Container {
    Container {
        name: sidecar::CONTAINER_NAME.to_string(),
        image: Some(sidecar::IMAGE.to_string()),
        stdin: Some(true),
        tty: Some(true),
        security_context: Some(SecurityContext {
            capabilities: Some(Capabilities {
                add: Some(vec![sidecar::CAPABILITY.to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
