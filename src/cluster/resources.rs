//! Shared resource types for the control-plane API

use serde::{Deserialize, Serialize};

use super::controller::ClusterStats;
use super::API_VERSION;

/// Response for listing resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList<T> {
    /// API version
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Kind (e.g., "NodeList", "PodList")
    pub kind: String,

    /// List of items
    pub items: Vec<T>,
}

impl<T> ResourceList<T> {
    /// Create a new resource list
    pub fn new(kind: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.into(),
            items,
        }
    }
}

/// Status of an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatus {
    /// Success or failure
    pub success: bool,

    /// Status message
    pub message: String,
}

impl OperationStatus {
    /// Create success status
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Create failure status
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Body of `GET /v1/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatus {
    /// Cluster name
    pub name: String,

    /// Whether the cluster is running
    pub running: bool,

    pub stats: ClusterStats,
}

/// Body of `POST /v1/nodes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    pub name: String,
}

/// Body of `GET /v1/namespaces/{namespace}/pods/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatusResponse {
    pub namespace: String,
    pub name: String,
    pub node: String,
    pub running: bool,
}
