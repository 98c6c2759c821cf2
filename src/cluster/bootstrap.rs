//! Master node bootstrap
//!
//! When the master node registers, the control-plane pods are pinned onto it
//! directly. They never go through placement and never land on workers.

use super::address::AddressAllocator;
use super::controller::ControllerError;
use super::node::Node;
use super::pod::{Pod, PodSpec};

/// Control-plane pods every master runs: (name, image, port)
pub const CONTROL_PLANE_PODS: [(&str, &str, u16); 3] = [
    ("kubeadm", "kubeadm", 7373),
    ("etcd", "etcd", 4500),
    ("weaver", "weaver", 5500),
];

/// Specs for the control-plane pods
pub fn control_plane_specs() -> Vec<PodSpec> {
    CONTROL_PLANE_PODS
        .iter()
        .map(|(name, image, port)| PodSpec::new(*name, *image, vec![*port]))
        .collect()
}

/// Place the control-plane pods on `node`, drawing addresses from `pods`.
///
/// Returns the number of pods placed. The caller owns both arguments for the
/// duration of the registration and discards them if anything fails, so an
/// error here leaves no trace in the cluster.
pub fn bootstrap_master(
    node: &mut Node,
    pods: &mut AddressAllocator,
) -> Result<usize, ControllerError> {
    if node.schedulable {
        return Err(ControllerError::Internal(format!(
            "bootstrap requested for schedulable node '{}'",
            node.name
        )));
    }

    let specs = control_plane_specs();
    let placed = specs.len();
    for spec in specs {
        let address = pods.allocate()?;
        node.pods.insert(spec.name.clone(), Pod::running(spec, address));
    }

    Ok(placed)
}
