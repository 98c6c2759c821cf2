//! Cluster Controller - manages cluster state and placement
//!
//! The controller is responsible for:
//! - Registering and removing nodes
//! - Allocating node and pod addresses
//! - Placing pods on the least-assigned schedulable node
//! - Bootstrapping the control-plane pods on the master node
//!
//! All state lives behind a single lock. Every mutation validates first and
//! only then writes, so a failed call leaves the cluster exactly as it was.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::address::{
    AddressAllocator, DEFAULT_POOL_CAPACITY, NODE_ADDRESS_BASE, POD_ADDRESS_BASE,
};
use super::bootstrap::{bootstrap_master, control_plane_specs};
use super::node::{is_schedulable_name, validate_name, Node};
use super::placement::{load_spread, select_candidate};
use super::pod::{Pod, PodSpec};
use super::DEFAULT_NAMESPACE;

/// Errors that can occur in the cluster controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node '{0}' already registered")]
    NodeExists(String),

    #[error("Pod '{0}' already exists in namespace '{1}'")]
    PodExists(String, String),

    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Pod '{0}' not found in namespace '{1}'")]
    PodNotFound(String, String),

    #[error("No schedulable nodes available")]
    NoSchedulableNodes,

    #[error("Could not schedule the pod: {0}")]
    SchedulingFailed(String),

    #[error("No {0} addresses left")]
    AddressExhausted(String),

    #[error("Master node '{0}' is already registered")]
    MasterExists(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ControllerError {
    /// Check if the error reports a missing node or pod
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::PodNotFound(_, _))
    }

    /// Check if the error reports a duplicate resource
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::NodeExists(_) | Self::PodExists(_, _) | Self::MasterExists(_)
        )
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Cluster name shown in reports
    pub name: String,

    /// Address of the controller itself
    pub address: Ipv4Addr,

    /// First node address
    #[serde(rename = "nodeAddressBase")]
    pub node_address_base: Ipv4Addr,

    /// First pod address
    #[serde(rename = "podAddressBase")]
    pub pod_address_base: Ipv4Addr,

    /// Addresses available in each pool
    #[serde(rename = "poolCapacity")]
    pub pool_capacity: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "K89".to_string(),
            address: Ipv4Addr::new(127, 0, 0, 0),
            node_address_base: NODE_ADDRESS_BASE,
            pod_address_base: POD_ADDRESS_BASE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Parse a configuration from YAML; missing fields keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Reject pools that overflow IPv4 or overlap each other or the controller address
    pub fn validate(&self) -> Result<(), ControllerError> {
        let nodes = pool_range("node", self.node_address_base, self.pool_capacity)?;
        let pods = pool_range("pod", self.pod_address_base, self.pool_capacity)?;

        if nodes.0 < pods.1 && pods.0 < nodes.1 {
            return Err(ControllerError::InvalidArgument(format!(
                "node pool {}/{} overlaps pod pool {}/{}",
                self.node_address_base,
                self.pool_capacity,
                self.pod_address_base,
                self.pool_capacity
            )));
        }

        let controller = u64::from(u32::from(self.address));
        for (kind, (start, end)) in [("node", nodes), ("pod", pods)] {
            if start <= controller && controller < end {
                return Err(ControllerError::InvalidArgument(format!(
                    "controller address {} lies in the {} pool",
                    self.address, kind
                )));
            }
        }
        Ok(())
    }
}

/// Half-open address range `[base, base + capacity)` of one pool
fn pool_range(kind: &str, base: Ipv4Addr, capacity: u32) -> Result<(u64, u64), ControllerError> {
    if capacity == 0 {
        return Err(ControllerError::InvalidArgument(format!(
            "{} pool capacity must be positive",
            kind
        )));
    }
    let start = u64::from(u32::from(base));
    let end = start + u64::from(capacity);
    if end > u64::from(u32::MAX) + 1 {
        return Err(ControllerError::InvalidArgument(format!(
            "{} pool starting at {} runs past 255.255.255.255",
            kind, base
        )));
    }
    Ok((start, end))
}

/// A pod together with the node it was placed on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub node: String,
    pub pod: Pod,
}

/// Full copy of the cluster state, for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub name: String,
    pub address: Ipv4Addr,
    pub status: bool,
    #[serde(rename = "nodeCount")]
    pub node_count: usize,
    #[serde(rename = "podCount")]
    pub pod_count: usize,
    pub nodes: Vec<Node>,
    pub assignments: BTreeMap<String, u32>,
    #[serde(rename = "nextCandidate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
}

impl ClusterSnapshot {
    /// Check the bookkeeping invariants of the snapshot.
    ///
    /// Counters must match the actual node and pod maps, and every assignment
    /// entry must belong to an existing schedulable node and equal its pod
    /// count.
    pub fn is_consistent(&self) -> bool {
        let pods: usize = self.nodes.iter().map(|n| n.pod_count()).sum();
        if self.node_count != self.nodes.len() || self.pod_count != pods {
            return false;
        }

        let schedulable = self.nodes.iter().filter(|n| n.schedulable).count();
        if schedulable != self.assignments.len() {
            return false;
        }

        self.assignments.iter().all(|(name, count)| {
            self.nodes
                .iter()
                .find(|n| &n.name == name)
                .map(|n| n.schedulable && n.pod_count() == *count as usize)
                .unwrap_or(false)
        })
    }

    /// Total pods across all nodes
    pub fn total_pods(&self) -> usize {
        self.nodes.iter().map(|n| n.pod_count()).sum()
    }
}

/// Cluster statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_nodes: usize,
    pub running_nodes: usize,
    pub schedulable_nodes: usize,
    pub total_pods: usize,
    pub running_pods: usize,
}

/// State guarded by the controller lock
#[derive(Debug)]
struct ClusterState {
    status: bool,
    node_count: usize,
    pod_count: usize,
    nodes: BTreeMap<String, Node>,
    assignments: BTreeMap<String, u32>,
    next_candidate: Option<String>,
    master: Option<String>,
    node_addresses: AddressAllocator,
    pod_addresses: AddressAllocator,
}

impl ClusterState {
    fn new(config: &ControllerConfig) -> Self {
        Self {
            status: true,
            node_count: 0,
            pod_count: 0,
            nodes: BTreeMap::new(),
            assignments: BTreeMap::new(),
            next_candidate: None,
            master: None,
            node_addresses: AddressAllocator::new(
                "node",
                config.node_address_base,
                config.pool_capacity,
            ),
            pod_addresses: AddressAllocator::new(
                "pod",
                config.pod_address_base,
                config.pool_capacity,
            ),
        }
    }

    /// Assignment counts of schedulable nodes in `namespace`
    fn schedulable_assignments(&self, namespace: &str) -> BTreeMap<String, u32> {
        self.assignments
            .iter()
            .filter(|(name, _)| {
                self.nodes
                    .get(*name)
                    .map(|n| n.schedulable && n.namespace == namespace)
                    .unwrap_or(false)
            })
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }

    fn refresh_candidate(&mut self) {
        self.next_candidate =
            select_candidate(&self.schedulable_assignments(DEFAULT_NAMESPACE)).ok();
    }

    fn stats(&self) -> ClusterStats {
        ClusterStats {
            total_nodes: self.node_count,
            running_nodes: self.nodes.values().filter(|n| n.status).count(),
            schedulable_nodes: self.nodes.values().filter(|n| n.schedulable).count(),
            total_pods: self.pod_count,
            running_pods: self.nodes.values().map(|n| n.running_pods()).sum(),
        }
    }

    /// Find the node in `namespace` holding pod `name`
    fn find_pod(&self, namespace: &str, name: &str) -> Option<(&Node, &Pod)> {
        self.nodes
            .values()
            .filter(|n| n.namespace == namespace)
            .find_map(|n| n.pods.get(name).map(|p| (n, p)))
    }
}

/// The cluster controller manages all cluster state
#[derive(Clone)]
pub struct ClusterController {
    /// Cluster identity
    name: String,

    /// Controller address
    address: Ipv4Addr,

    /// Everything mutable, behind one lock
    state: Arc<RwLock<ClusterState>>,
}

impl ClusterController {
    /// Create a new cluster controller
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: ControllerConfig) -> Self {
        info!("{} controller started", config.name);
        Self {
            name: config.name.clone(),
            address: config.address,
            state: Arc::new(RwLock::new(ClusterState::new(&config))),
        }
    }

    /// Cluster name
    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Mark the cluster running
    pub async fn start(&self) {
        self.state.write().await.status = true;
        info!("{} is running", self.name);
    }

    /// Mark the cluster stopped. Nodes and pods are left in place.
    pub async fn stop(&self) {
        self.state.write().await.status = false;
        info!("{} stopped", self.name);
    }

    /// Whether the cluster is running
    pub async fn is_running(&self) -> bool {
        self.state.read().await.status
    }

    // =========================================================================
    // Node Management
    // =========================================================================

    /// Register a new node.
    ///
    /// Registering the master node (name ending in `_m11`) also places the
    /// control-plane pods on it before returning.
    pub async fn add_node(&self, name: &str) -> Result<Node, ControllerError> {
        validate_name("node", name)?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.nodes.contains_key(name) {
            return Err(ControllerError::NodeExists(name.to_string()));
        }

        let schedulable = is_schedulable_name(name);
        if !schedulable {
            if let Some(master) = &state.master {
                return Err(ControllerError::MasterExists(master.clone()));
            }
            // Control-plane pod names must still be free in the namespace
            for spec in control_plane_specs() {
                if state.find_pod(DEFAULT_NAMESPACE, &spec.name).is_some() {
                    warn!(
                        "Cannot bootstrap {}: pod {} already exists",
                        name, spec.name
                    );
                    return Err(ControllerError::PodExists(
                        spec.name,
                        DEFAULT_NAMESPACE.to_string(),
                    ));
                }
            }
        }

        let address = state.node_addresses.peek()?;
        let mut node = Node::new(name, address);
        node.start_background()?;

        // Bootstrap against a scratch allocator so a failure commits nothing
        let mut pod_addresses = state.pod_addresses.clone();
        let bootstrapped = if schedulable {
            0
        } else {
            bootstrap_master(&mut node, &mut pod_addresses)?
        };

        state.node_addresses.commit();
        state.pod_addresses = pod_addresses;
        state.nodes.insert(node.name.clone(), node.clone());
        state.node_count += 1;
        state.pod_count += bootstrapped;

        if schedulable {
            state.assignments.insert(node.name.clone(), 0);
        } else {
            state.master = Some(node.name.clone());
            info!(
                "Master node {} bootstrapped with {} control-plane pods",
                node.name, bootstrapped
            );
        }
        state.refresh_candidate();

        info!(
            "Registered node {} at {} (schedulable: {})",
            node.name, node.address, node.schedulable
        );
        Ok(node)
    }

    /// Remove a node and every pod on it.
    ///
    /// Returns `false` when no such node exists.
    pub async fn remove_node(&self, name: &str) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(node) = state.nodes.remove(name) else {
            warn!("Node {} not found, nothing to remove", name);
            return false;
        };

        state.node_count -= 1;
        state.pod_count -= node.pod_count();
        state.assignments.remove(name);
        if state.master.as_deref() == Some(name) {
            state.master = None;
        }
        state.refresh_candidate();

        info!("Removed node {} with {} pods", name, node.pod_count());
        true
    }

    /// Get a node by name
    pub async fn get_node(&self, name: &str) -> Result<Node, ControllerError> {
        self.state
            .read()
            .await
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| ControllerError::NodeNotFound(name.to_string()))
    }

    /// Whether a node is running
    pub async fn node_status(&self, name: &str) -> Result<bool, ControllerError> {
        let state = self.state.read().await;
        let node = state
            .nodes
            .get(name)
            .ok_or_else(|| ControllerError::NodeNotFound(name.to_string()))?;

        match (node.status, node.started_at) {
            (true, Some(started)) => {
                let uptime = Utc::now() - started;
                debug!(
                    "{} has been running since {} ({}s)",
                    name,
                    started,
                    uptime.num_seconds()
                );
            }
            _ => warn!("Node {} is not running", name),
        }

        Ok(node.status)
    }

    /// List all nodes, ordered by name
    pub async fn list_nodes(&self) -> Vec<Node> {
        self.state.read().await.nodes.values().cloned().collect()
    }

    // =========================================================================
    // Pod Management
    // =========================================================================

    /// Schedule a pod onto the least-assigned schedulable node
    pub async fn schedule_pod(
        &self,
        name: &str,
        image: &str,
        ports: Vec<u16>,
    ) -> Result<Pod, ControllerError> {
        self.place_pod(PodSpec::new(name, image, ports))
            .await
            .map(|placement| placement.pod)
    }

    /// Schedule a pod and report which node received it
    pub async fn place_pod(&self, spec: PodSpec) -> Result<Placement, ControllerError> {
        validate_name("pod", &spec.name)?;
        if spec.image.trim().is_empty() {
            return Err(ControllerError::InvalidArgument(
                "pod image must not be empty".to_string(),
            ));
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.find_pod(DEFAULT_NAMESPACE, &spec.name).is_some() {
            return Err(ControllerError::PodExists(
                spec.name,
                DEFAULT_NAMESPACE.to_string(),
            ));
        }

        let address = state.pod_addresses.peek()?;
        let candidate = select_candidate(&state.schedulable_assignments(DEFAULT_NAMESPACE))?;
        debug!("Best candidate for pod {} is {}", spec.name, candidate);

        let node = state
            .nodes
            .get_mut(&candidate)
            .filter(|n| n.schedulable && n.namespace == DEFAULT_NAMESPACE)
            .ok_or_else(|| {
                warn!("Candidate {} is not a schedulable node", candidate);
                ControllerError::SchedulingFailed(format!(
                    "candidate '{}' is not a schedulable node in namespace '{}'",
                    candidate, DEFAULT_NAMESPACE
                ))
            })?;

        let pod = Pod::running(spec, address);
        node.pods.insert(pod.name.clone(), pod.clone());

        state.pod_addresses.commit();
        state.pod_count += 1;
        *state.assignments.entry(candidate.clone()).or_insert(0) += 1;
        state.refresh_candidate();
        if let Some(spread) = load_spread(&state.assignments) {
            debug!("Assignment spread across workers is now {}", spread);
        }

        info!("Scheduled pod {} on {} at {}", pod.name, candidate, pod.endpoint());
        Ok(Placement {
            node: candidate,
            pod,
        })
    }

    /// Delete a pod by namespace and name
    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ControllerError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let owner = state
            .nodes
            .values_mut()
            .find(|n| n.namespace == namespace && n.has_pod(name))
            .ok_or_else(|| ControllerError::PodNotFound(name.to_string(), namespace.to_string()))?;

        owner.pods.remove(name);
        let owner = owner.name.clone();

        state.pod_count -= 1;
        if let Some(count) = state.assignments.get_mut(&owner) {
            *count = count.saturating_sub(1);
        }
        state.refresh_candidate();

        info!("Deleted pod {}/{} from {}", namespace, name, owner);
        Ok(())
    }

    /// Whether a pod is running
    pub async fn pod_status(&self, namespace: &str, name: &str) -> Result<bool, ControllerError> {
        let state = self.state.read().await;
        let (_, pod) = state
            .find_pod(namespace, name)
            .ok_or_else(|| ControllerError::PodNotFound(name.to_string(), namespace.to_string()))?;

        if let Some(started) = pod.started_at {
            debug!("{} has been running since {}", name, started);
        }
        Ok(pod.status)
    }

    /// Get a pod and the node it runs on
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<Placement, ControllerError> {
        let state = self.state.read().await;
        state
            .find_pod(namespace, name)
            .map(|(node, pod)| Placement {
                node: node.name.clone(),
                pod: pod.clone(),
            })
            .ok_or_else(|| ControllerError::PodNotFound(name.to_string(), namespace.to_string()))
    }

    /// List every pod with its node, ordered by node then pod name
    pub async fn list_pods(&self) -> Vec<Placement> {
        let state = self.state.read().await;
        state
            .nodes
            .values()
            .flat_map(|node| {
                node.pods.values().map(move |pod| Placement {
                    node: node.name.clone(),
                    pod: pod.clone(),
                })
            })
            .collect()
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Full copy of the cluster state
    pub async fn snapshot(&self) -> ClusterSnapshot {
        let state = self.state.read().await;
        ClusterSnapshot {
            name: self.name.clone(),
            address: self.address,
            status: state.status,
            node_count: state.node_count,
            pod_count: state.pod_count,
            nodes: state.nodes.values().cloned().collect(),
            assignments: state.assignments.clone(),
            next_candidate: state.next_candidate.clone(),
            master: state.master.clone(),
        }
    }

    /// Get cluster statistics
    pub async fn cluster_stats(&self) -> ClusterStats {
        self.state.read().await.stats()
    }

    /// Running flag and statistics read under one lock
    pub async fn status_report(&self) -> (bool, ClusterStats) {
        let state = self.state.read().await;
        (state.status, state.stats())
    }
}

impl Default for ClusterController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn cluster_with_workers(names: &[&str]) -> ClusterController {
        let controller = ClusterController::new();
        for name in names {
            controller.add_node(name).await.unwrap();
        }
        controller
    }

    #[tokio::test]
    async fn test_add_node() {
        let controller = ClusterController::new();
        let node = controller.add_node("vamos").await.unwrap();

        assert_eq!(node.name, "vamos");
        assert!(node.status);
        assert!(node.schedulable);
        assert_eq!(node.address, Ipv4Addr::new(127, 0, 1, 0));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.assignments.get("vamos"), Some(&0));
        assert_eq!(snapshot.next_candidate.as_deref(), Some("vamos"));
    }

    #[tokio::test]
    async fn test_add_many_nodes() {
        let names = ["a", "b", "c", "d", "e"];
        let controller = cluster_with_workers(&names).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, names.len());
        for name in names {
            assert_eq!(controller.get_node(name).await.unwrap().name, name);
        }
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_add_empty_name() {
        let controller = ClusterController::new();
        let result = controller.add_node("").await;

        assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 0);
        assert!(snapshot.nodes.is_empty());

        // The failed call must not have consumed an address
        let node = controller.add_node("worker1").await.unwrap();
        assert_eq!(node.address, Ipv4Addr::new(127, 0, 1, 0));
    }

    #[tokio::test]
    async fn test_add_duplicate_node() {
        let controller = cluster_with_workers(&["vamos"]).await;
        let result = controller.add_node("vamos").await;

        assert!(matches!(result, Err(ControllerError::NodeExists(_))));
        assert_eq!(controller.snapshot().await.node_count, 1);
    }

    #[tokio::test]
    async fn test_master_bootstrap() {
        let controller = ClusterController::new();
        let master = controller.add_node("vamos_m11").await.unwrap();

        assert!(!master.schedulable);
        assert_eq!(master.pod_count(), 3);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.pod_count, 3);
        assert_eq!(snapshot.master.as_deref(), Some("vamos_m11"));
        assert!(snapshot.assignments.is_empty());
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_second_master_rejected() {
        let controller = cluster_with_workers(&["master_m11"]).await;
        let result = controller.add_node("backup_m11").await;

        assert!(matches!(
            result,
            Err(ControllerError::MasterExists(ref m)) if m == "master_m11"
        ));
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.pod_count, 3);
    }

    #[tokio::test]
    async fn test_master_slot_freed_on_remove() {
        let controller = cluster_with_workers(&["master_m11"]).await;
        assert!(controller.remove_node("master_m11").await);
        assert_eq!(controller.snapshot().await.pod_count, 0);

        let replacement = controller.add_node("next_m11").await.unwrap();
        assert_eq!(replacement.pod_count(), 3);
        assert_eq!(controller.snapshot().await.pod_count, 3);
    }

    #[tokio::test]
    async fn test_bootstrap_counts_accumulate() {
        let controller = cluster_with_workers(&["worker1"]).await;
        controller.schedule_pod("redis", "redis", vec![6379]).await.unwrap();
        controller.add_node("master_m11").await.unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 4);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_remove_node() {
        let controller = cluster_with_workers(&["vamos"]).await;

        assert!(controller.remove_node("vamos").await);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 0);
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.assignments.is_empty());
        assert!(snapshot.next_candidate.is_none());
        assert!(matches!(
            controller.node_status("vamos").await,
            Err(ControllerError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_missing_node() {
        let controller = cluster_with_workers(&["vamos"]).await;

        assert!(!controller.remove_node("ghost").await);
        assert_eq!(controller.snapshot().await.node_count, 1);
    }

    #[tokio::test]
    async fn test_remove_node_drops_pods() {
        let controller = cluster_with_workers(&["w1", "w2"]).await;
        for pod in ["a", "b", "c", "d"] {
            controller.schedule_pod(pod, "img", vec![80]).await.unwrap();
        }

        assert!(controller.remove_node("w1").await);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 2);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_addresses_not_reused_after_remove() {
        let controller = cluster_with_workers(&["a", "b"]).await;
        controller.remove_node("a").await;

        let c = controller.add_node("c").await.unwrap();
        let b = controller.get_node("b").await.unwrap();
        assert_ne!(c.address, b.address);
        assert_eq!(c.address, Ipv4Addr::new(127, 0, 1, 2));
    }

    #[tokio::test]
    async fn test_node_status() {
        let controller = cluster_with_workers(&["worker1"]).await;
        assert!(controller.node_status("worker1").await.unwrap());
    }

    #[tokio::test]
    async fn test_schedule_pod() {
        let controller = cluster_with_workers(&["vamos"]).await;
        let pod = controller
            .schedule_pod("mongo", "mongo", vec![27017])
            .await
            .unwrap();

        assert_eq!(pod.name, "mongo");
        assert!(pod.status);
        assert_eq!(pod.address, Ipv4Addr::new(127, 0, 2, 0));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 1);
        assert_eq!(snapshot.assignments.get("vamos"), Some(&1));
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_schedule_without_nodes() {
        let controller = ClusterController::new();
        let result = controller.schedule_pod("redis", "redis", vec![6379]).await;

        assert!(matches!(result, Err(ControllerError::NoSchedulableNodes)));
        assert_eq!(controller.snapshot().await.pod_count, 0);
    }

    #[tokio::test]
    async fn test_schedule_master_only() {
        let controller = cluster_with_workers(&["master_m11"]).await;
        let result = controller.schedule_pod("redis", "redis", vec![6379]).await;

        assert!(matches!(result, Err(ControllerError::NoSchedulableNodes)));
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 3);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_schedule_invalid_arguments() {
        let controller = cluster_with_workers(&["worker1"]).await;

        assert!(matches!(
            controller.schedule_pod("", "redis", vec![]).await,
            Err(ControllerError::InvalidArgument(_))
        ));
        assert!(matches!(
            controller.schedule_pod("redis", " ", vec![]).await,
            Err(ControllerError::InvalidArgument(_))
        ));
        assert_eq!(controller.snapshot().await.pod_count, 0);
    }

    #[tokio::test]
    async fn test_schedule_duplicate_pod() {
        let controller = cluster_with_workers(&["w1", "w2"]).await;
        controller.schedule_pod("redis", "redis", vec![6379]).await.unwrap();

        let result = controller.schedule_pod("redis", "redis", vec![6379]).await;
        assert!(matches!(result, Err(ControllerError::PodExists(_, _))));
        assert_eq!(controller.snapshot().await.pod_count, 1);
    }

    #[tokio::test]
    async fn test_master_rejected_when_control_plane_name_taken() {
        let controller = cluster_with_workers(&["worker1"]).await;
        controller.schedule_pod("etcd", "myetcd", vec![2379]).await.unwrap();

        let result = controller.add_node("master_m11").await;
        assert!(matches!(
            result,
            Err(ControllerError::PodExists(ref pod, _)) if pod == "etcd"
        ));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.pod_count, 1);
        assert!(snapshot.master.is_none());
        assert!(snapshot.is_consistent());

        // Deleting etcd still hits the user's pod, and then the master fits
        controller.delete_pod(DEFAULT_NAMESPACE, "etcd").await.unwrap();
        assert!(controller.get_node("worker1").await.unwrap().pods.is_empty());
        let master = controller.add_node("master_m11").await.unwrap();
        assert_eq!(master.pod_count(), 3);
        // Rejected registration did not consume a node address
        assert_eq!(master.address, Ipv4Addr::new(127, 0, 1, 1));
    }

    #[tokio::test]
    async fn test_control_plane_pod_names_reserved() {
        let controller = cluster_with_workers(&["master_m11", "worker1"]).await;
        let result = controller.schedule_pod("etcd", "etcd", vec![2379]).await;
        assert!(matches!(result, Err(ControllerError::PodExists(_, _))));
    }

    #[tokio::test]
    async fn test_schedule_balances_load() {
        let controller = cluster_with_workers(&["w1", "w2", "w3"]).await;

        for i in 0..10 {
            controller
                .schedule_pod(&format!("pod-{}", i), "nginx", vec![80])
                .await
                .unwrap();

            let snapshot = controller.snapshot().await;
            let min = snapshot.assignments.values().min().unwrap();
            let max = snapshot.assignments.values().max().unwrap();
            assert!(max - min <= 1);
        }

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.assignments["w1"], 4);
        assert_eq!(snapshot.assignments["w2"], 3);
        assert_eq!(snapshot.assignments["w3"], 3);
    }

    #[tokio::test]
    async fn test_pod_lands_on_only_worker() {
        let controller = cluster_with_workers(&["master_m11"]).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.pod_count, 3);

        controller.add_node("worker1").await.unwrap();
        let placement = controller
            .place_pod(PodSpec::new("redis", "redis", vec![6379]))
            .await
            .unwrap();

        assert_eq!(placement.node, "worker1");
        assert_eq!(controller.snapshot().await.pod_count, 4);
    }

    #[tokio::test]
    async fn test_pod_address_exhaustion() {
        let config = ControllerConfig {
            pool_capacity: 1,
            ..ControllerConfig::default()
        };
        let controller = ClusterController::with_config(config);
        controller.add_node("worker1").await.unwrap();
        controller.schedule_pod("a", "img", vec![]).await.unwrap();

        let result = controller.schedule_pod("b", "img", vec![]).await;
        assert!(matches!(result, Err(ControllerError::AddressExhausted(_))));
        assert_eq!(controller.snapshot().await.pod_count, 1);
    }

    #[tokio::test]
    async fn test_master_needs_three_pod_addresses() {
        let config = ControllerConfig {
            pool_capacity: 2,
            ..ControllerConfig::default()
        };
        let controller = ClusterController::with_config(config);

        let result = controller.add_node("master_m11").await;
        assert!(matches!(result, Err(ControllerError::AddressExhausted(_))));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.node_count, 0);
        assert!(snapshot.master.is_none());

        // Neither pool moved
        let worker = controller.add_node("worker1").await.unwrap();
        assert_eq!(worker.address, Ipv4Addr::new(127, 0, 1, 0));
        let pod = controller.schedule_pod("a", "img", vec![]).await.unwrap();
        assert_eq!(pod.address, Ipv4Addr::new(127, 0, 2, 0));
    }

    #[tokio::test]
    async fn test_delete_pod() {
        let controller = cluster_with_workers(&["vamos"]).await;
        controller.schedule_pod("mongo", "mongo", vec![27017]).await.unwrap();

        controller.delete_pod(DEFAULT_NAMESPACE, "mongo").await.unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 0);
        assert_eq!(snapshot.assignments.get("vamos"), Some(&0));
        assert!(matches!(
            controller.pod_status(DEFAULT_NAMESPACE, "mongo").await,
            Err(ControllerError::PodNotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_pod() {
        let controller = cluster_with_workers(&["vamos"]).await;
        let result = controller.delete_pod(DEFAULT_NAMESPACE, "mongo").await;

        assert!(matches!(result, Err(ControllerError::PodNotFound(_, _))));
        assert_eq!(controller.snapshot().await.pod_count, 0);
    }

    #[tokio::test]
    async fn test_delete_pod_wrong_namespace() {
        let controller = cluster_with_workers(&["vamos"]).await;
        controller.schedule_pod("mongo", "mongo", vec![27017]).await.unwrap();

        let result = controller.delete_pod("production", "mongo").await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(controller.snapshot().await.pod_count, 1);
    }

    #[tokio::test]
    async fn test_delete_control_plane_pod() {
        let controller = cluster_with_workers(&["master_m11"]).await;
        controller.delete_pod(DEFAULT_NAMESPACE, "etcd").await.unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 2);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_pod_status() {
        let controller = cluster_with_workers(&["vamos"]).await;
        controller.schedule_pod("mongo", "mongo", vec![27017]).await.unwrap();

        assert!(controller.pod_status(DEFAULT_NAMESPACE, "mongo").await.unwrap());
        let placement = controller.get_pod(DEFAULT_NAMESPACE, "mongo").await.unwrap();
        assert_eq!(placement.node, "vamos");
    }

    #[tokio::test]
    async fn test_list_pods_ordered() {
        let controller = cluster_with_workers(&["master_m11", "worker1"]).await;
        controller.schedule_pod("redis", "redis", vec![6379]).await.unwrap();

        let pods: Vec<(String, String)> = controller
            .list_pods()
            .await
            .into_iter()
            .map(|p| (p.node, p.pod.name))
            .collect();

        assert_eq!(
            pods,
            vec![
                ("master_m11".to_string(), "etcd".to_string()),
                ("master_m11".to_string(), "kubeadm".to_string()),
                ("master_m11".to_string(), "weaver".to_string()),
                ("worker1".to_string(), "redis".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_start_stop() {
        let controller = cluster_with_workers(&["worker1"]).await;
        assert!(controller.is_running().await);

        controller.stop().await;
        assert!(!controller.is_running().await);
        // Stopping keeps resources in place
        assert_eq!(controller.snapshot().await.node_count, 1);

        controller.start().await;
        assert!(controller.is_running().await);
    }

    #[tokio::test]
    async fn test_cluster_stats() {
        let controller = cluster_with_workers(&["master_m11", "w1", "w2"]).await;
        controller.schedule_pod("redis", "redis", vec![6379]).await.unwrap();

        let stats = controller.cluster_stats().await;
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.running_nodes, 3);
        assert_eq!(stats.schedulable_nodes, 2);
        assert_eq!(stats.total_pods, 4);
        assert_eq!(stats.running_pods, 4);
    }

    #[tokio::test]
    async fn test_status_report_matches_parts() {
        let controller = cluster_with_workers(&["master_m11", "w1"]).await;
        controller.stop().await;

        let (running, stats) = controller.status_report().await;
        assert!(!running);
        assert_eq!(stats, controller.cluster_stats().await);
        assert_eq!(stats.total_pods, 3);
    }

    #[tokio::test]
    async fn test_concurrent_scheduling() {
        let controller = cluster_with_workers(&["w1", "w2", "w3", "w4"]).await;

        let tasks = (0..40).map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .schedule_pod(&format!("pod-{}", i), "nginx", vec![80])
                    .await
            })
        });
        let results = futures::future::join_all(tasks).await;
        assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.pod_count, 40);
        assert!(snapshot.assignments.values().all(|count| *count == 10));
        assert!(snapshot.is_consistent());

        let mut addresses: Vec<Ipv4Addr> = controller
            .list_pods()
            .await
            .into_iter()
            .map(|p| p.pod.address)
            .collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 40);
    }

    #[tokio::test]
    async fn test_concurrent_node_registration() {
        let controller = ClusterController::new();

        let tasks = (0..20).map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add_node(&format!("node-{}", i % 10)).await })
        });
        let results = futures::future::join_all(tasks).await;
        let added = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        assert_eq!(added, 10);
        assert_eq!(controller.snapshot().await.node_count, 10);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
name: lab
podAddressBase: 10.1.0.0
poolCapacity: 1024
"#;
        let config = ControllerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, "lab");
        assert_eq!(config.pod_address_base, Ipv4Addr::new(10, 1, 0, 0));
        assert_eq!(config.pool_capacity, 1024);
        assert_eq!(config.node_address_base, NODE_ADDRESS_BASE);
    }

    #[test]
    fn test_config_rejects_overlapping_pools() {
        assert!(ControllerConfig::default().validate().is_ok());

        // 127.0.1.0 + 512 runs into 127.0.2.0
        let config = ControllerConfig {
            pool_capacity: 512,
            ..ControllerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidArgument(msg)) if msg.contains("overlaps")
        ));

        let config = ControllerConfig {
            pod_address_base: Ipv4Addr::new(10, 1, 0, 0),
            pool_capacity: 1024,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_pools() {
        let empty = ControllerConfig {
            pool_capacity: 0,
            ..ControllerConfig::default()
        };
        assert!(empty.validate().is_err());

        let overflow = ControllerConfig {
            pod_address_base: Ipv4Addr::new(255, 255, 255, 0),
            pool_capacity: 257,
            ..ControllerConfig::default()
        };
        assert!(overflow.validate().is_err());

        let top = ControllerConfig {
            pod_address_base: Ipv4Addr::new(255, 255, 255, 0),
            ..ControllerConfig::default()
        };
        assert!(top.validate().is_ok());

        let inside = ControllerConfig {
            address: Ipv4Addr::new(127, 0, 2, 5),
            ..ControllerConfig::default()
        };
        assert!(matches!(
            inside.validate(),
            Err(ControllerError::InvalidArgument(msg)) if msg.contains("pod pool")
        ));
    }

    #[test]
    fn test_snapshot_consistency_check() {
        let snapshot = ClusterSnapshot {
            name: "K89".to_string(),
            address: Ipv4Addr::new(127, 0, 0, 0),
            status: true,
            node_count: 1,
            pod_count: 0,
            nodes: vec![],
            assignments: BTreeMap::new(),
            next_candidate: None,
            master: None,
        };
        assert!(!snapshot.is_consistent());
    }
}
