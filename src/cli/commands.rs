//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results, I/O is handled by caller

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::{OutputArgs, ResolveArgs};
use crate::artifacts::{self, ArtifactError, NodeLaunchSpec};
use crate::config::{self, ConfigError};
use crate::context::{self, ContextError, InventoryContext};
use crate::inventory::{self, FileInventory, ResolveError};
use crate::topology::{AppConfig, ClusterSettings, ClusterTopology, TopologyError};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Topology(#[from] TopologyError),

    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Argument handling (pure)
// ============================================================================

/// Split list arguments given either repeated or space/comma separated
pub fn flatten_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `app:key=value` entries into application sections
pub fn parse_app_config(entries: &[String]) -> CommandResult<AppConfig> {
    let mut app_config: AppConfig = BTreeMap::new();

    for entry in entries {
        let invalid = || {
            CommandError::InvalidArgument(format!(
                "app config '{}' must look like app:key=value",
                entry
            ))
        };
        let (app, rest) = entry.split_once(':').ok_or_else(invalid)?;
        let (key, value) = rest.split_once('=').ok_or_else(invalid)?;
        let (app, key) = (app.trim(), key.trim());
        if app.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        app_config
            .entry(app.to_string())
            .or_default()
            .insert(key.to_string(), value.trim().to_string());
    }

    Ok(app_config)
}

/// Build cluster settings from command-line flags.
/// Unset flags keep their defaults; context defaults are applied later.
pub fn settings_from_args(args: &ResolveArgs) -> CommandResult<ClusterSettings> {
    let mut settings = ClusterSettings {
        region: args.region.clone(),
        slurm_s3_root: args.slurm_s3_root.clone(),
        vpc_id: args.vpc_id.clone(),
        instance_profile: args.instance_profile.clone(),
        key_name: args.key_name.clone(),
        security_groups: flatten_list(&args.security_groups),
        reserved_addresses: args
            .reserved_addresses
            .unwrap_or(crate::topology::DEFAULT_RESERVED_ADDRESSES),
        max_nodes: args.max_nodes,
        app_config: parse_app_config(&args.app_config)?,
        ..Default::default()
    };

    let node_subnet_ids = flatten_list(&args.node_subnet_ids);
    if !node_subnet_ids.is_empty() {
        settings.node_subnet_ids = Some(node_subnet_ids);
    }
    if let Some(selector) = args.controller_address {
        settings.controller = selector;
    }
    if let Some(selector) = args.backup_controller_address {
        settings.backup_controller = selector;
    }
    if let Some(name) = &args.controller_hostname {
        settings.controller_hostname = name.clone();
    }
    if let Some(name) = &args.backup_controller_hostname {
        settings.backup_controller_hostname = name.clone();
    }
    if let Some(prefix) = &args.node_hostname_prefix {
        settings.node_hostname_prefix = prefix.clone();
    }
    if let Some(instance_type) = &args.compute_instance_type {
        settings.compute.instance_type = instance_type.clone();
    }
    settings.compute.ami = args.compute_ami.clone();
    settings.compute.bid_price = args.compute_bid_price.clone();
    settings.compute.os_packages = flatten_list(&args.compute_os_packages);
    settings.compute.external_packages = flatten_list(&args.compute_external_packages);

    Ok(settings)
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

// ============================================================================
// Command bodies (I/O at the edges)
// ============================================================================

/// Load the instance context: an explicit path must exist, the default
/// location is optional.
pub fn load_context(path: Option<&Path>) -> CommandResult<Option<InventoryContext>> {
    match path {
        Some(path) => Ok(Some(context::load_context_from(&expand_path(path))?)),
        None => Ok(context::load_default_context()?),
    }
}

/// Resolve a topology from an inventory dump and command-line settings
pub async fn resolve_command(args: &ResolveArgs) -> CommandResult<ClusterTopology> {
    let settings = settings_from_args(args)?;

    let mut provider = FileInventory::new(expand_path(&args.inventory));
    if let Some(ctx) = load_context(args.context.as_deref())? {
        provider = provider.with_context(ctx);
    }

    let topology = inventory::resolve_topology(&provider, settings).await?;
    info!(
        "Resolved {}: controller {}, {} compute nodes",
        topology.vpc_id(),
        topology.controller_address(),
        topology.node_addresses().len()
    );
    Ok(topology)
}

/// Load a topology from a configuration file
pub fn load_topology(path: &Path) -> CommandResult<ClusterTopology> {
    Ok(config::load_topology_file(&expand_path(path))?)
}

/// Which artifact to emit on stdout when no output flag was given
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultArtifact {
    Config,
    SlurmConfig,
}

/// Render requested artifacts as `(target, content)` pairs.
/// Pure: nothing is written.
pub fn render_artifacts(
    topology: &ClusterTopology,
    output: &OutputArgs,
    default: DefaultArtifact,
) -> CommandResult<Vec<(PathBuf, String)>> {
    let mut output = output.clone();
    if output.is_empty() {
        match default {
            DefaultArtifact::Config => output.write_config = Some(PathBuf::from("-")),
            DefaultArtifact::SlurmConfig => output.write_slurm_config = Some(PathBuf::from("-")),
        }
    }

    let mut rendered = Vec::new();
    if let Some(target) = output.write_config {
        rendered.push((target, config::encode(topology)));
    }
    if let Some(target) = output.write_slurm_config {
        rendered.push((target, artifacts::slurm_configuration(topology)?));
    }
    if let Some(target) = output.write_hosts {
        rendered.push((target, artifacts::hosts_file(topology)));
    }
    Ok(rendered)
}

/// Write content to a path, or to stdout for `-`
pub fn write_output(target: &Path, content: &str) -> CommandResult<()> {
    if target == Path::new("-") {
        print!("{}", content);
        return Ok(());
    }

    let target = expand_path(target);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&target, content)?;
    debug!("Wrote {} bytes to {}", content.len(), target.display());
    Ok(())
}

/// Render and write every requested artifact
pub fn write_artifacts(
    topology: &ClusterTopology,
    output: &OutputArgs,
    default: DefaultArtifact,
) -> CommandResult<()> {
    for (target, content) in render_artifacts(topology, output, default)? {
        write_output(&target, &content)?;
    }
    Ok(())
}

pub fn node_address_command(
    topology: &ClusterTopology,
    node_name: &str,
) -> CommandResult<std::net::Ipv4Addr> {
    Ok(topology.address_for_nodename(node_name)?)
}

pub fn node_spec_command(
    topology: &ClusterTopology,
    node_name: &str,
) -> CommandResult<NodeLaunchSpec> {
    Ok(artifacts::node_launch_spec(topology, node_name)?)
}
