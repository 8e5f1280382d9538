//! Facts about the instance the tool runs on.
//!
//! Unset cluster settings (region, VPC, key pair, ...) default to the values
//! of the current instance. Those values arrive as an explicit
//! [`InventoryContext`], loaded from YAML or supplied by an inventory
//! provider, never from process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default context file location: ~/.slurm-ec2/context.yaml
pub fn default_context_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".slurm-ec2")
        .join("context.yaml")
}

/// Errors that can occur during context operations
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Context file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse context: {0}")]
    ParseError(String),

    #[error("Failed to write context: {0}")]
    WriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Environment-derived defaults for a cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InventoryContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,

    /// Region; derived from `availability_zone` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Instance profile ARN or name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_profile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl InventoryContext {
    pub fn new(vpc_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            vpc_id: Some(vpc_id.into()),
            region: Some(region.into()),
            ..Default::default()
        }
    }

    /// The explicit region, or the one implied by the availability zone
    pub fn region(&self) -> Option<String> {
        self.region.clone().or_else(|| {
            self.availability_zone
                .as_deref()
                .and_then(region_from_availability_zone)
        })
    }
}

/// `us-west-2a` -> `us-west-2`
pub fn region_from_availability_zone(az: &str) -> Option<String> {
    let mut chars = az.chars();
    match chars.next_back() {
        Some(c) if c.is_ascii_alphabetic() && !chars.as_str().is_empty() => {
            Some(chars.as_str().to_string())
        }
        _ => None,
    }
}

// ============================================================================
// SBIO: Pure parsing (no I/O)
// ============================================================================

/// Parse a context from a YAML string
pub fn parse_context(content: &str) -> Result<InventoryContext, ContextError> {
    serde_yaml::from_str(content).map_err(|e| ContextError::ParseError(e.to_string()))
}

/// Serialize a context to a YAML string
pub fn serialize_context(context: &InventoryContext) -> Result<String, ContextError> {
    serde_yaml::to_string(context).map_err(|e| ContextError::WriteError(e.to_string()))
}

// ============================================================================
// I/O boundary functions
// ============================================================================

/// Load a context from a specific path
pub fn load_context_from(path: &Path) -> Result<InventoryContext, ContextError> {
    if !path.exists() {
        return Err(ContextError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_context(&content)
}

/// Load the context from the default location, if one exists
pub fn load_default_context() -> Result<Option<InventoryContext>, ContextError> {
    let path = default_context_path();
    if !path.exists() {
        return Ok(None);
    }
    load_context_from(&path).map(Some)
}

/// Save a context to a specific path
pub fn save_context_to(context: &InventoryContext, path: &Path) -> Result<(), ContextError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serialize_context(context)?;
    std::fs::write(path, content)?;
    Ok(())
}
