//! CLI module for slurm-topology
//!
//! Subcommands:
//! - `slurm-topology resolve` - Resolve a topology from an inventory and write artifacts
//! - `slurm-topology render` - Render artifacts from an existing configuration file
//! - `slurm-topology node-address` - Look up the address of a compute node
//! - `slurm-topology node-spec` - Describe the instance behind a compute node
//! - `slurm-topology hostname` - EC2 hostname for an address
//! - `slurm-topology validate` - Check a configuration for suspicious layouts
//! - `slurm-topology show` - Summarize a configuration

use clap::{ArgAction, Args, Parser, Subcommand};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::topology::AddressSelector;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "slurm-topology")]
#[command(about = "Resolve SLURM cluster layouts on EC2 and render their configuration")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a topology from an inventory dump and write artifacts
    Resolve(ResolveArgs),

    /// Render artifacts from an existing configuration file
    Render(RenderArgs),

    /// Print the address assigned to a compute node
    NodeAddress(NodeArgs),

    /// Print the launch description for a compute node as JSON
    NodeSpec(NodeArgs),

    /// Print the EC2 hostname (ip-a-b-c-d) for an address
    Hostname {
        /// IPv4 address
        address: Ipv4Addr,
    },

    /// Validate a configuration file
    Validate(ConfigArgs),

    /// Show a summary of a configuration file
    Show(ShowArgs),
}

/// Where to write generated artifacts. `-` writes to stdout.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Write the cluster configuration file
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,

    /// Write slurm.conf
    #[arg(long, value_name = "PATH")]
    pub write_slurm_config: Option<PathBuf>,

    /// Write the hosts file
    #[arg(long, value_name = "PATH")]
    pub write_hosts: Option<PathBuf>,
}

impl OutputArgs {
    pub fn is_empty(&self) -> bool {
        self.write_config.is_none()
            && self.write_slurm_config.is_none()
            && self.write_hosts.is_none()
    }
}

/// Arguments for the resolve command
#[derive(Parser, Debug, Default)]
pub struct ResolveArgs {
    /// Subnet inventory (JSON output of `aws ec2 describe-subnets`)
    #[arg(long, value_name = "FILE", env = "SLURM_EC2_INVENTORY")]
    pub inventory: PathBuf,

    /// Instance context YAML (default: ~/.slurm-ec2/context.yaml if present)
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// S3 prefix holding SLURM packages and state
    #[arg(long)]
    pub slurm_s3_root: Option<String>,

    /// VPC to build the cluster in
    #[arg(long)]
    pub vpc_id: Option<String>,

    /// Instance profile (ARN or name) for compute nodes
    #[arg(long)]
    pub instance_profile: Option<String>,

    /// Key pair for compute nodes
    #[arg(long)]
    pub key_name: Option<String>,

    /// Security groups for compute nodes (repeatable, or space/comma separated)
    #[arg(long, num_args = 1..)]
    pub security_groups: Vec<String>,

    /// Restrict compute nodes to these subnets
    #[arg(long, num_args = 1..)]
    pub node_subnet_ids: Vec<String>,

    /// Controller address: an IPv4 address or `auto`
    #[arg(long)]
    pub controller_address: Option<AddressSelector>,

    /// Backup controller address: an IPv4 address, `auto` or `disabled`
    #[arg(long)]
    pub backup_controller_address: Option<AddressSelector>,

    #[arg(long)]
    pub controller_hostname: Option<String>,

    #[arg(long)]
    pub backup_controller_hostname: Option<String>,

    /// Prefix for compute node hostnames
    #[arg(long)]
    pub node_hostname_prefix: Option<String>,

    /// Addresses to skip at the start of each node subnet
    #[arg(long)]
    pub reserved_addresses: Option<u32>,

    /// Upper bound on the number of compute nodes
    #[arg(long)]
    pub max_nodes: Option<u32>,

    #[arg(long)]
    pub compute_instance_type: Option<String>,

    #[arg(long)]
    pub compute_ami: Option<String>,

    /// Spot bid price; compute nodes launch on demand when unset
    #[arg(long)]
    pub compute_bid_price: Option<String>,

    #[arg(long, num_args = 1..)]
    pub compute_os_packages: Vec<String>,

    #[arg(long, num_args = 1..)]
    pub compute_external_packages: Vec<String>,

    /// Application setting as `app:key=value` (repeatable)
    #[arg(long, value_name = "APP:KEY=VALUE")]
    pub app_config: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for commands that read a configuration file
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Cluster configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for node lookups
#[derive(Parser, Debug)]
pub struct NodeArgs {
    /// Compute node name, e.g. node-3
    pub node_name: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the resolved topology as JSON
    #[arg(long)]
    pub json: bool,
}
