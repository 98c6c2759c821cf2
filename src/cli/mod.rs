//! CLI module for k89
//!
//! Provides kubectl-like subcommands:
//! - `k89 serve` - Run the control plane server
//! - `k89 status|start|stop` - Inspect or toggle the cluster
//! - `k89 get` - List resources (cluster, nodes, pods)
//! - `k89 create` - Register a node or schedule a pod
//! - `k89 delete` - Remove a node or a pod
//! - `k89 context` - Manage contexts

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::cluster::DEFAULT_NAMESPACE;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "k89")]
#[command(about = "A minimal cluster controller that places pods onto nodes")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.k89/config)
    #[arg(long, global = true, env = "K89_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control plane server
    Serve(ServeArgs),

    /// Show cluster status
    Status,

    /// Mark the cluster running
    Start,

    /// Mark the cluster stopped (nodes and pods stay in place)
    Stop,

    /// Get/list resources
    Get(GetArgs),

    /// Register a node or schedule a pod
    Create(CreateArgs),

    /// Delete a resource
    Delete(DeleteArgs),

    /// Manage cluster contexts
    Context(ContextArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Bind address for the server
    #[arg(long, default_value = "127.0.0.1")]
    pub bind_addr: String,

    /// Port to listen on (default: 2300)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to a .env file loaded before startup
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Controller configuration (YAML): name, address pools
    #[arg(long, value_name = "FILE")]
    pub cluster_config: Option<PathBuf>,
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Resource type to list
    #[command(subcommand)]
    pub resource: GetResource,
}

#[derive(Subcommand, Debug)]
pub enum GetResource {
    /// Show every node with its pods
    #[command(name = "cluster")]
    Cluster,

    /// List nodes
    #[command(name = "nodes", visible_alias = "node", visible_alias = "no")]
    Nodes,

    /// List pods
    #[command(name = "pods", visible_alias = "pod", visible_alias = "po")]
    Pods,
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[command(subcommand)]
    pub resource: CreateResource,
}

#[derive(Subcommand, Debug)]
pub enum CreateResource {
    /// Register a node (a name ending in `_m11` registers the master)
    #[command(name = "node", visible_alias = "no")]
    Node {
        /// Node name
        name: String,
    },

    /// Schedule a pod onto the least loaded worker
    #[command(name = "pod", visible_alias = "po")]
    Pod {
        /// Pod name
        name: String,

        /// Container image
        #[arg(long)]
        image: String,

        /// Exposed port (repeatable)
        #[arg(long = "port")]
        ports: Vec<u16>,
    },
}

/// Arguments for the delete command
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    #[command(subcommand)]
    pub resource: DeleteResource,
}

#[derive(Subcommand, Debug)]
pub enum DeleteResource {
    /// Delete a node and its pods
    #[command(name = "node", visible_alias = "no")]
    Node {
        /// Node name
        name: String,
    },

    /// Delete a pod
    #[command(name = "pod", visible_alias = "po")]
    Pod {
        /// Pod name
        name: String,

        /// Namespace
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
}

/// Arguments for the context command
#[derive(Parser, Debug)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub action: ContextAction,
}

#[derive(Subcommand, Debug)]
pub enum ContextAction {
    /// List all contexts
    List,

    /// Show current context
    Current,

    /// Switch to a context
    Use {
        /// Context name
        name: String,
    },

    /// Add a new context
    Add {
        /// Context name
        name: String,

        /// Control plane URL
        #[arg(long)]
        url: String,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a context
    Delete {
        /// Context name
        name: String,
    },
}
