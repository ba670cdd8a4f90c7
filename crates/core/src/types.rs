//! Domain types shared between the watcher crates and the daemon.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A running container as reported by the container runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container ID (full 64-char hex or a prefix form).
    pub id: String,
    /// Container name, without the leading `/`.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Runtime state string (e.g. "running").
    pub status: String,
    /// Creation time.
    pub created_at: SystemTime,
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.id, self.status)
    }
}
