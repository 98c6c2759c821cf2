use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::{ControllerConfig, CONTROL_PLANE_PORT};

/// Name of the built-in context pointing at a control plane on this host
pub const LOCAL_CONTEXT: &str = "local";

/// Default config file location: ~/.k89/config
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".k89")
        .join("config")
}

/// Resolve a `--config` argument, expanding `~` and environment variables
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf, ContextError> {
    let Some(path) = path else {
        return Ok(default_config_path());
    };

    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| ContextError::ParseError(format!("cannot expand {}: {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Errors that can occur during context operations
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Context '{0}' not found")]
    ContextNotFound(String),

    #[error("Context '{0}' is built in and cannot be changed")]
    BuiltinContext(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid cluster config: {0}")]
    InvalidConfig(String),

    #[error("Failed to write config: {0}")]
    WriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A single context naming a k89 control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Display name for this context
    pub name: String,
    /// URL of the control plane (e.g., "http://192.168.1.100:2300")
    pub url: String,
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The complete configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Currently active context name
    #[serde(rename = "current-context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Map of context name to context definition
    #[serde(default)]
    pub contexts: HashMap<String, Context>,

    /// Where the built-in local context points
    #[serde(default)]
    pub local: LocalConfig,
}

/// Local control plane location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_control_plane_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            port: CONTROL_PLANE_PORT,
            host: default_host(),
        }
    }
}

fn default_control_plane_port() -> u16 {
    CONTROL_PLANE_PORT
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse config from YAML string
pub fn parse_config(content: &str) -> Result<Config, ContextError> {
    serde_yaml::from_str(content).map_err(|e| ContextError::ParseError(e.to_string()))
}

/// Serialize config to YAML string
pub fn serialize_config(config: &Config) -> Result<String, ContextError> {
    serde_yaml::to_string(config).map_err(|e| ContextError::WriteError(e.to_string()))
}

/// Add or update a context in the config
pub fn add_context(config: &mut Config, context: Context) -> Result<(), ContextError> {
    if context.name == LOCAL_CONTEXT {
        return Err(ContextError::BuiltinContext(context.name));
    }
    config.contexts.insert(context.name.clone(), context);
    Ok(())
}

/// Remove a context from the config
pub fn remove_context(config: &mut Config, name: &str) -> Option<Context> {
    let removed = config.contexts.remove(name);
    if config.current_context.as_deref() == Some(name) {
        config.current_context = None;
    }
    removed
}

/// Set the current context
pub fn set_current_context(config: &mut Config, name: &str) -> Result<(), ContextError> {
    if !config.contexts.contains_key(name) && name != LOCAL_CONTEXT {
        return Err(ContextError::ContextNotFound(name.to_string()));
    }
    config.current_context = Some(name.to_string());
    Ok(())
}

// ============================================================================
// I/O boundary functions
// ============================================================================

/// Load config from a specific path; a missing file yields the defaults
pub fn load_config_from(path: &Path) -> Result<Config, ContextError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Save config to a specific path
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ContextError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serialize_config(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a controller configuration (YAML) for `k89 serve`
pub fn load_controller_config(path: &Path) -> Result<ControllerConfig, ContextError> {
    if !path.exists() {
        return Err(ContextError::ConfigNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config = ControllerConfig::from_yaml(&content)
        .map_err(|e| ContextError::ParseError(e.to_string()))?;
    config
        .validate()
        .map_err(|e| ContextError::InvalidConfig(e.to_string()))?;
    Ok(config)
}

impl Config {
    /// Name of the active context
    pub fn current_name(&self) -> &str {
        self.current_context.as_deref().unwrap_or(LOCAL_CONTEXT)
    }

    /// Get the URL for the current context
    pub fn current_url(&self) -> Result<String, ContextError> {
        match self.current_name() {
            LOCAL_CONTEXT => Ok(self.local_url()),
            name => self
                .contexts
                .get(name)
                .map(|c| c.url.clone())
                .ok_or_else(|| ContextError::ContextNotFound(name.to_string())),
        }
    }

    /// URL of the built-in local context
    pub fn local_url(&self) -> String {
        format!("http://{}:{}", self.local.host, self.local.port)
    }
}

impl Context {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}
