//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results and formatted output, I/O is handled
//! by the caller

use thiserror::Error;

use super::display::{
    format_cluster, format_cluster_status, format_node_added, format_node_list,
    format_placement, format_pod_list,
};
use super::{CreateResource, DeleteResource, GetResource};
use crate::client::{ClientError, ClusterApi};
use crate::cluster::PodSpec;
use crate::context::{self, Config, Context, ContextError, LOCAL_CONTEXT};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0} not found")]
    NotFound(String),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Context Commands (Pure business logic)
// ============================================================================

/// Info about a context for display
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub name: String,
    pub url: String,
    pub is_current: bool,
}

/// List all contexts, the built-in local one included
pub fn context_list(config: &Config) -> Vec<ContextInfo> {
    let current = config.current_name();
    let mut contexts: Vec<_> = config
        .contexts
        .iter()
        .map(|(name, ctx)| ContextInfo {
            name: name.clone(),
            url: ctx.url.clone(),
            is_current: name == current,
        })
        .collect();

    contexts.push(ContextInfo {
        name: LOCAL_CONTEXT.to_string(),
        url: config.local_url(),
        is_current: current == LOCAL_CONTEXT,
    });

    contexts.sort_by(|a, b| a.name.cmp(&b.name));
    contexts
}

/// Get current context name and URL
pub fn context_current(config: &Config) -> CommandResult<(String, String)> {
    let url = config.current_url()?;
    Ok((config.current_name().to_string(), url))
}

/// Switch to a context
pub fn context_use(config: &mut Config, name: &str) -> CommandResult<()> {
    context::set_current_context(config, name)?;
    Ok(())
}

/// Add a new context
pub fn context_add(
    config: &mut Config,
    name: &str,
    url: &str,
    description: Option<&str>,
) -> CommandResult<()> {
    let mut ctx = Context::new(name, url);
    if let Some(desc) = description {
        ctx = ctx.with_description(desc);
    }
    context::add_context(config, ctx)?;
    Ok(())
}

/// Delete a context
pub fn context_delete(config: &mut Config, name: &str) -> CommandResult<bool> {
    let removed = context::remove_context(config, name);
    Ok(removed.is_some())
}

// ============================================================================
// Cluster Commands (against any ClusterApi)
// ============================================================================

/// `k89 status`
pub async fn run_status(api: &dyn ClusterApi) -> CommandResult<String> {
    let status = api.status().await?;
    Ok(format_cluster_status(&status))
}

/// `k89 start`
pub async fn run_start(api: &dyn ClusterApi) -> CommandResult<String> {
    api.start().await?;
    Ok("Cluster started\n".to_string())
}

/// `k89 stop`
pub async fn run_stop(api: &dyn ClusterApi) -> CommandResult<String> {
    api.stop().await?;
    Ok("Cluster stopped\n".to_string())
}

/// `k89 get ...`
pub async fn run_get(api: &dyn ClusterApi, resource: &GetResource) -> CommandResult<String> {
    let output = match resource {
        GetResource::Cluster => format_cluster(&api.snapshot().await?),
        GetResource::Nodes => format_node_list(&api.list_nodes().await?),
        GetResource::Pods => format_pod_list(&api.list_pods().await?),
    };
    Ok(output)
}

/// `k89 create ...`
pub async fn run_create(
    api: &dyn ClusterApi,
    resource: &CreateResource,
) -> CommandResult<String> {
    match resource {
        CreateResource::Node { name } => {
            let node = api.add_node(name).await?;
            Ok(format_node_added(&node))
        }
        CreateResource::Pod { name, image, ports } => {
            let spec = PodSpec::new(name.as_str(), image.as_str(), ports.clone());
            let placement = api.schedule_pod(spec).await?;
            Ok(format_placement(&placement))
        }
    }
}

/// `k89 delete ...`
pub async fn run_delete(
    api: &dyn ClusterApi,
    resource: &DeleteResource,
) -> CommandResult<String> {
    match resource {
        DeleteResource::Node { name } => {
            if api.remove_node(name).await? {
                Ok(format!("node/{} deleted\n", name))
            } else {
                Err(CommandError::NotFound(format!("node/{}", name)))
            }
        }
        DeleteResource::Pod { name, namespace } => {
            api.delete_pod(namespace, name).await?;
            Ok(format!("pod/{} deleted from {}\n", name, namespace))
        }
    }
}
