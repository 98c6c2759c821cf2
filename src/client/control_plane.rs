use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::cluster::{
    ClusterController, ClusterSnapshot, ClusterStatus, ControllerError, Node, NodeRequest,
    Placement, Pod, PodSpec, PodStatusResponse, ResourceList,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Check if the error reports a missing node or pod
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Controller(e) => e.is_not_found(),
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

// ============================================================================
// SBIO: Trait for abstraction (HTTP or in-process)
// ============================================================================

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn status(&self) -> Result<ClusterStatus, ClientError>;

    async fn start(&self) -> Result<(), ClientError>;

    async fn stop(&self) -> Result<(), ClientError>;

    async fn snapshot(&self) -> Result<ClusterSnapshot, ClientError>;

    async fn add_node(&self, name: &str) -> Result<Node, ClientError>;

    /// Returns `false` when no such node exists
    async fn remove_node(&self, name: &str) -> Result<bool, ClientError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ClientError>;

    async fn schedule_pod(&self, spec: PodSpec) -> Result<Placement, ClientError>;

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClientError>;

    async fn pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodStatusResponse, ClientError>;

    async fn list_pods(&self) -> Result<Vec<Placement>, ClientError>;
}

// ============================================================================
// SBIO: I/O implementation (real HTTP client)
// ============================================================================

#[derive(Deserialize)]
struct NodeEnvelope {
    node: Option<Node>,
}

#[derive(Deserialize)]
struct PodEnvelope {
    node: Option<String>,
    pod: Option<Pod>,
}

/// Client for communicating with a running control plane
#[derive(Clone)]
pub struct ControlPlaneClient {
    client: reqwest::Client,
    base_url: String,
}

impl ControlPlaneClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL with each segment percent-encoded onto the base path
    pub fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Http(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Http(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn build_request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        request
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))
    }

    /// Check that the server answers its health endpoint
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &["health"])?)
            .await?;
        Ok(resp.status().is_success())
    }
}

/// Decode a successful response body, or turn an error body into `ClientError::Api`
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}

/// Pull the human-readable message out of an error body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ClusterApi for ControlPlaneClient {
    async fn status(&self) -> Result<ClusterStatus, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &["v1", "status"])?)
            .await?;
        read_json(resp).await
    }

    async fn start(&self) -> Result<(), ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::POST, &["v1", "start"])?)
            .await?;
        read_json::<serde_json::Value>(resp).await.map(|_| ())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::POST, &["v1", "stop"])?)
            .await?;
        read_json::<serde_json::Value>(resp).await.map(|_| ())
    }

    async fn snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &["v1", "cluster"])?)
            .await?;
        read_json(resp).await
    }

    async fn add_node(&self, name: &str) -> Result<Node, ClientError> {
        let request = NodeRequest {
            name: name.to_string(),
        };
        let resp = self
            .send(self.build_request(reqwest::Method::POST, &["v1", "nodes"])?.json(&request))
            .await?;

        let envelope: NodeEnvelope = read_json(resp).await?;
        envelope
            .node
            .ok_or_else(|| ClientError::Parse("response is missing the node".to_string()))
    }

    async fn remove_node(&self, name: &str) -> Result<bool, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::DELETE, &["v1", "nodes", name])?)
            .await?;

        match read_json::<serde_json::Value>(resp).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &["v1", "nodes"])?)
            .await?;
        let list: ResourceList<Node> = read_json(resp).await?;
        Ok(list.items)
    }

    async fn schedule_pod(&self, spec: PodSpec) -> Result<Placement, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::POST, &["v1", "pods"])?.json(&spec))
            .await?;

        let envelope: PodEnvelope = read_json(resp).await?;
        match (envelope.node, envelope.pod) {
            (Some(node), Some(pod)) => Ok(Placement { node, pod }),
            _ => Err(ClientError::Parse(
                "response is missing the placement".to_string(),
            )),
        }
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        let path = ["v1", "namespaces", namespace, "pods", name];
        let resp = self
            .send(self.build_request(reqwest::Method::DELETE, &path)?)
            .await?;
        read_json::<serde_json::Value>(resp).await.map(|_| ())
    }

    async fn pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodStatusResponse, ClientError> {
        let path = ["v1", "namespaces", namespace, "pods", name];
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &path)?)
            .await?;
        read_json(resp).await
    }

    async fn list_pods(&self) -> Result<Vec<Placement>, ClientError> {
        let resp = self
            .send(self.build_request(reqwest::Method::GET, &["v1", "pods"])?)
            .await?;
        let list: ResourceList<Placement> = read_json(resp).await?;
        Ok(list.items)
    }
}

// ============================================================================
// SBIO: In-process implementation (no I/O)
// ============================================================================

#[async_trait]
impl ClusterApi for ClusterController {
    async fn status(&self) -> Result<ClusterStatus, ClientError> {
        let (running, stats) = self.status_report().await;
        Ok(ClusterStatus {
            name: self.name().to_string(),
            running,
            stats,
        })
    }

    async fn start(&self) -> Result<(), ClientError> {
        ClusterController::start(self).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        ClusterController::stop(self).await;
        Ok(())
    }

    async fn snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
        Ok(ClusterController::snapshot(self).await)
    }

    async fn add_node(&self, name: &str) -> Result<Node, ClientError> {
        Ok(ClusterController::add_node(self, name).await?)
    }

    async fn remove_node(&self, name: &str) -> Result<bool, ClientError> {
        Ok(ClusterController::remove_node(self, name).await)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClientError> {
        Ok(ClusterController::list_nodes(self).await)
    }

    async fn schedule_pod(&self, spec: PodSpec) -> Result<Placement, ClientError> {
        Ok(self.place_pod(spec).await?)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        Ok(ClusterController::delete_pod(self, namespace, name).await?)
    }

    async fn pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodStatusResponse, ClientError> {
        let placement = self.get_pod(namespace, name).await?;
        Ok(PodStatusResponse {
            namespace: namespace.to_string(),
            name: name.to_string(),
            node: placement.node,
            running: placement.pod.status,
        })
    }

    async fn list_pods(&self) -> Result<Vec<Placement>, ClientError> {
        Ok(ClusterController::list_pods(self).await)
    }
}
