//! Pod resource - a scheduled workload unit
//!
//! A Pod is always owned by exactly one Node. Pods are created already
//! running; there is no pending phase because scheduling either places the
//! pod or fails outright.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Pod placed on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    /// Unique identifier (generated)
    pub uid: Uuid,

    /// Pod name, unique within its namespace
    pub name: String,

    /// Workload image reference
    pub image: String,

    /// Whether the pod is running
    pub status: bool,

    /// Allocated address
    pub address: Ipv4Addr,

    /// Declared ports
    #[serde(default)]
    pub ports: Vec<u16>,

    /// Creation timestamp
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// When the pod started running
    #[serde(rename = "startedAt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// What a caller asks for when scheduling a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<u16>,
}

impl PodSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports,
        }
    }
}

impl Pod {
    /// Create a running pod at `address`
    pub fn running(spec: PodSpec, address: Ipv4Addr) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4(),
            name: spec.name,
            image: spec.image,
            status: true,
            address,
            ports: spec.ports,
            created_at: now,
            started_at: Some(now),
        }
    }

    /// Address and first declared port, e.g. `127.0.2.4:6379`
    pub fn endpoint(&self) -> String {
        match self.ports.first() {
            Some(port) => format!("{}:{}", self.address, port),
            None => self.address.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_pod() {
        let pod = Pod::running(
            PodSpec::new("redis", "redis", vec![6379]),
            Ipv4Addr::new(127, 0, 2, 0),
        );

        assert_eq!(pod.name, "redis");
        assert!(pod.status);
        assert!(pod.started_at.is_some());
        assert_eq!(pod.endpoint(), "127.0.2.0:6379");
    }

    #[test]
    fn test_endpoint_without_ports() {
        let pod = Pod::running(
            PodSpec::new("batch", "busybox", vec![]),
            Ipv4Addr::new(127, 0, 2, 9),
        );
        assert_eq!(pod.endpoint(), "127.0.2.9");
    }

    #[test]
    fn test_pod_spec_deserialize_defaults_ports() {
        let spec: PodSpec = serde_json::from_str(r#"{"name": "a", "image": "b"}"#).unwrap();
        assert!(spec.ports.is_empty());
    }
}
