//! # k89 Cluster Management
//!
//! A minimal Kubernetes-like control plane that tracks nodes and places pods
//! onto them.
//!
//! ## Core Resources
//!
//! - **Node**: a registered host. Names ending in `_m11` denote the master,
//!   which only runs the control-plane pods; every other node is a worker.
//! - **Pod**: a workload unit (image + ports) owned by exactly one node.
//! - **Namespace**: a label on nodes and pods; everything lives in `default`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     k89 Control Plane                        │
//! │                       (k89 serve)                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ API Server   │  │ Cluster      │  │ Placement        │  │
//! │  │ :2300        │──│ Controller   │──│ (least assigned) │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!         ┌────────────────────┼────────────────────┐
//!         ▼                    ▼                    ▼
//!   ┌───────────┐        ┌───────────┐        ┌───────────┐
//!   │ master_m11│        │  worker1  │        │  worker2  │
//!   │ kubeadm   │        │  pods…    │        │  pods…    │
//!   │ etcd      │        │           │        │           │
//!   │ weaver    │        │           │        │           │
//!   └───────────┘        └───────────┘        └───────────┘
//! ```

pub mod address;
pub mod api;
pub mod bootstrap;
pub mod controller;
pub mod node;
pub mod placement;
pub mod pod;
pub mod resources;

pub use address::AddressAllocator;
pub use api::{create_control_plane_router, ControlPlaneState};
pub use controller::{
    ClusterController, ClusterSnapshot, ClusterStats, ControllerConfig, ControllerError,
    Placement,
};
pub use node::{is_schedulable_name, Node, MASTER_MARKER};
pub use placement::select_candidate;
pub use pod::{Pod, PodSpec};
pub use resources::*;

/// Default control plane API port
pub const CONTROL_PLANE_PORT: u16 = 2300;

/// The single namespace every node and pod lives in
pub const DEFAULT_NAMESPACE: &str = "default";

/// API version tag carried by list responses
pub const API_VERSION: &str = "k89/v1";
