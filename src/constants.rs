// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by Stowaway
pub mod annotations {
    /// Presence of this annotation opts a deployment into the debug sidecar.
    /// The value is not interpreted.
    pub const SHELL: &str = "shell";
}

/// The injected debug sidecar definition
pub mod sidecar {
    /// Name of the injected container
    pub const CONTAINER_NAME: &str = "shell";
    /// Image of the injected container
    pub const IMAGE: &str = "busybox:1.28";
    /// Capability granted so the sidecar can trace sibling processes
    pub const CAPABILITY: &str = "SYS_PTRACE";
}

/// Work queue retry configuration
pub mod queue {
    /// Base requeue delay in milliseconds for the first failure of a key
    pub const BASE_DELAY_MS: u64 = 5;
    /// Maximum requeue delay in seconds (exponential backoff cap)
    pub const MAX_DELAY_SECS: u64 = 1000;
}
