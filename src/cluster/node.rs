//! Node resource - represents a machine in the k89 cluster
//!
//! A Node is a registered compute host. Each Node:
//! - Gets an address from the node pool when it registers
//! - Is classified once, from its name, as schedulable or master
//! - Owns the pods placed on it

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::controller::ControllerError;
use super::pod::Pod;
use super::DEFAULT_NAMESPACE;

/// Name suffix marking the non-schedulable master node (`<anything>_m11`)
pub const MASTER_MARKER: &str = "m11";

/// A Node in the k89 cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique name for this node
    pub name: String,

    /// Logical namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Address allocated at registration
    pub address: Ipv4Addr,

    /// Whether background initialization completed
    pub status: bool,

    /// Whether this node accepts load-balanced pods
    pub schedulable: bool,

    /// Creation timestamp
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// When background initialization finished
    #[serde(rename = "startedAt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Pods on this node, by name
    #[serde(default)]
    pub pods: BTreeMap<String, Pod>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Whether a node name denotes a schedulable worker.
///
/// Only the last `_`-delimited segment is inspected: `master_m11` is the
/// master, `m11_worker` and `worker1` are workers.
pub fn is_schedulable_name(name: &str) -> bool {
    name.rsplit('_').next() != Some(MASTER_MARKER)
}

/// Validate a node or pod identifier.
///
/// Identifiers travel in URL paths and whitespace-separated tables, so they
/// must be non-empty and free of whitespace, control characters and `/`.
pub fn validate_name(kind: &str, name: &str) -> Result<(), ControllerError> {
    if name.is_empty() {
        return Err(ControllerError::InvalidArgument(format!(
            "{} name must not be empty",
            kind
        )));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/')
    {
        return Err(ControllerError::InvalidArgument(format!(
            "{} name '{}' contains whitespace, control characters or '/'",
            kind,
            name.escape_debug()
        )));
    }
    Ok(())
}

impl Node {
    /// Create a stopped node in the default namespace
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        let name = name.into();
        let schedulable = is_schedulable_name(&name);
        Self {
            name,
            namespace: default_namespace(),
            address,
            status: false,
            schedulable,
            created_at: Utc::now(),
            started_at: None,
            pods: BTreeMap::new(),
        }
    }

    /// Run the node's background initialization.
    ///
    /// Always succeeds today; the `Result` leaves room for real start-up work.
    pub fn start_background(&mut self) -> Result<(), ControllerError> {
        self.started_at = Some(Utc::now());
        self.status = true;
        info!("{} background services started", self.name);
        Ok(())
    }

    /// Check if this is the master node
    pub fn is_master(&self) -> bool {
        !self.schedulable
    }

    /// Number of pods on this node
    pub fn pod_count(&self) -> usize {
        self.pods.len()
    }

    /// Number of running pods on this node
    pub fn running_pods(&self) -> usize {
        self.pods.values().filter(|p| p.status).count()
    }

    /// Check if the node hosts a pod with this name
    pub fn has_pod(&self, name: &str) -> bool {
        self.pods.contains_key(name)
    }
}
