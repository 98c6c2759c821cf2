//! Control Plane API Server
//!
//! Provides REST endpoints for managing the k89 cluster:
//! - Nodes: add, list, get, remove
//! - Pods: schedule, list, status, delete
//! - Cluster: status, snapshot, start/stop

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::{
    controller::{ClusterController, ControllerError, Placement},
    node::Node,
    pod::{Pod, PodSpec},
    resources::{ClusterStatus, NodeRequest, OperationStatus, PodStatusResponse, ResourceList},
};

/// Shared state for the control plane API
#[derive(Clone)]
pub struct ControlPlaneState {
    pub controller: ClusterController,
}

impl ControlPlaneState {
    pub fn new() -> Self {
        Self {
            controller: ClusterController::new(),
        }
    }

    pub fn with_controller(controller: ClusterController) -> Self {
        Self { controller }
    }
}

impl Default for ControlPlaneState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the control plane router
pub fn create_control_plane_router(state: ControlPlaneState) -> Router {
    Router::new()
        // Cluster
        .route("/v1/status", get(cluster_status))
        .route("/v1/start", post(start_cluster))
        .route("/v1/stop", post(stop_cluster))
        .route("/v1/cluster", get(cluster_snapshot))
        // Nodes
        .route("/v1/nodes", get(list_nodes).post(add_node))
        .route("/v1/nodes/{name}", get(get_node).delete(remove_node))
        // Pods
        .route("/v1/pods", get(list_pods).post(schedule_pod))
        .route(
            "/v1/namespaces/{namespace}/pods/{name}",
            get(pod_status).delete(delete_pod),
        )
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP status for a controller error
pub fn error_status(error: &ControllerError) -> StatusCode {
    match error {
        e if e.is_conflict() => StatusCode::CONFLICT,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        ControllerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ControllerError::NoSchedulableNodes
        | ControllerError::SchedulingFailed(_)
        | ControllerError::AddressExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Health & Status
// ============================================================================

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn cluster_status(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    let (running, stats) = state.controller.status_report().await;
    Json(ClusterStatus {
        name: state.controller.name().to_string(),
        running,
        stats,
    })
}

async fn start_cluster(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    state.controller.start().await;
    Json(OperationStatus::success("Cluster started"))
}

async fn stop_cluster(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    state.controller.stop().await;
    Json(OperationStatus::success("Cluster stopped"))
}

async fn cluster_snapshot(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    Json(state.controller.snapshot().await)
}

// ============================================================================
// Node Endpoints
// ============================================================================

async fn list_nodes(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    let nodes = state.controller.list_nodes().await;
    Json(ResourceList::new("NodeList", nodes))
}

async fn add_node(
    State(state): State<ControlPlaneState>,
    Json(req): Json<NodeRequest>,
) -> impl IntoResponse {
    match state.controller.add_node(&req.name).await {
        Ok(node) => (StatusCode::CREATED, Json(NodeResponse::success(node))),
        Err(e) => (error_status(&e), Json(NodeResponse::error(e.to_string()))),
    }
}

#[derive(Serialize)]
struct NodeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NodeResponse {
    fn success(node: Node) -> Self {
        Self {
            success: true,
            node: Some(node),
            error: None,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            node: None,
            error: Some(msg),
        }
    }
}

async fn get_node(
    State(state): State<ControlPlaneState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.controller.get_node(&name).await {
        Ok(node) => (StatusCode::OK, Json(Some(node))).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Json::<Option<Node>>(None)).into_response(),
    }
}

async fn remove_node(
    State(state): State<ControlPlaneState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if state.controller.remove_node(&name).await {
        (StatusCode::OK, Json(OperationStatus::success("Node removed")))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(OperationStatus::failure(
                ControllerError::NodeNotFound(name).to_string(),
            )),
        )
    }
}

// ============================================================================
// Pod Endpoints
// ============================================================================

async fn list_pods(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    let pods = state.controller.list_pods().await;
    Json(ResourceList::new("PodList", pods))
}

async fn schedule_pod(
    State(state): State<ControlPlaneState>,
    Json(spec): Json<PodSpec>,
) -> impl IntoResponse {
    match state.controller.place_pod(spec).await {
        Ok(placement) => (StatusCode::CREATED, Json(PodResponse::success(placement))),
        Err(e) => (error_status(&e), Json(PodResponse::error(e.to_string()))),
    }
}

#[derive(Serialize)]
struct PodResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod: Option<Pod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PodResponse {
    fn success(placement: Placement) -> Self {
        Self {
            success: true,
            node: Some(placement.node),
            pod: Some(placement.pod),
            error: None,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            node: None,
            pod: None,
            error: Some(msg),
        }
    }
}

async fn pod_status(
    State(state): State<ControlPlaneState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.controller.get_pod(&namespace, &name).await {
        Ok(placement) => (
            StatusCode::OK,
            Json(PodStatusResponse {
                namespace,
                name,
                node: placement.node,
                running: placement.pod.status,
            }),
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(OperationStatus::failure(e.to_string())),
        )
            .into_response(),
    }
}

async fn delete_pod(
    State(state): State<ControlPlaneState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.controller.delete_pod(&namespace, &name).await {
        Ok(()) => (StatusCode::OK, Json(OperationStatus::success("Pod deleted"))),
        Err(e) => (
            error_status(&e),
            Json(OperationStatus::failure(e.to_string())),
        ),
    }
}
