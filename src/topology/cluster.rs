use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::debug;

use super::resolver::{
    backup_controller_address, controller_address, get_address_for_nodename,
    get_subnet_for_address, node_addresses, node_name, TopologyError,
};
use super::selector::AddressSelector;
use super::subnet::Subnet;
use crate::context::InventoryContext;

pub const DEFAULT_CONTROLLER_HOSTNAME: &str = "controller";
pub const DEFAULT_BACKUP_CONTROLLER_HOSTNAME: &str = "backup-controller";
pub const DEFAULT_NODE_HOSTNAME_PREFIX: &str = "node-";
pub const DEFAULT_RESERVED_ADDRESSES: u32 = 8;
pub const DEFAULT_COMPUTE_INSTANCE_TYPE: &str = "c3.8xlarge";

/// Section name prefixes that always denote topology metadata
pub const VPC_ID_PREFIX: &str = "vpc-";
pub const SUBNET_ID_PREFIX: &str = "subnet-";

/// Application configuration: section -> key -> value, kept sorted
pub type AppConfig = BTreeMap<String, BTreeMap<String, String>>;

/// Compute node launch parameters carried alongside the topology
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeSettings {
    pub instance_type: String,
    pub ami: Option<String>,
    pub bid_price: Option<String>,
    pub os_packages: Vec<String>,
    pub external_packages: Vec<String>,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            instance_type: DEFAULT_COMPUTE_INSTANCE_TYPE.to_string(),
            ami: None,
            bid_price: None,
            os_packages: Vec::new(),
            external_packages: Vec::new(),
        }
    }
}

/// Raw inputs to topology resolution.
///
/// These are persisted verbatim by the configuration codec so that decoding
/// a file re-runs exactly the same resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSettings {
    pub region: Option<String>,
    pub slurm_s3_root: Option<String>,
    pub vpc_id: Option<String>,
    pub instance_profile: Option<String>,
    pub key_name: Option<String>,
    pub security_groups: Vec<String>,
    /// Restrict compute nodes to these subnets; `None` means every subnet
    pub node_subnet_ids: Option<Vec<String>>,
    pub controller: AddressSelector,
    pub backup_controller: AddressSelector,
    pub controller_hostname: String,
    pub backup_controller_hostname: String,
    pub node_hostname_prefix: String,
    /// Addresses set aside at the start of each node subnet
    pub reserved_addresses: u32,
    pub max_nodes: Option<u32>,
    pub compute: ComputeSettings,
    pub app_config: AppConfig,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            region: None,
            slurm_s3_root: None,
            vpc_id: None,
            instance_profile: None,
            key_name: None,
            security_groups: Vec::new(),
            node_subnet_ids: None,
            controller: AddressSelector::Auto,
            backup_controller: AddressSelector::Disabled,
            controller_hostname: DEFAULT_CONTROLLER_HOSTNAME.to_string(),
            backup_controller_hostname: DEFAULT_BACKUP_CONTROLLER_HOSTNAME.to_string(),
            node_hostname_prefix: DEFAULT_NODE_HOSTNAME_PREFIX.to_string(),
            reserved_addresses: DEFAULT_RESERVED_ADDRESSES,
            max_nodes: None,
            compute: ComputeSettings::default(),
            app_config: AppConfig::new(),
        }
    }
}

impl ClusterSettings {
    /// Whether any setting would be filled in from an instance context
    pub fn needs_context(&self) -> bool {
        self.region.is_none()
            || self.vpc_id.is_none()
            || self.instance_profile.is_none()
            || self.key_name.is_none()
            || self.security_groups.is_empty()
            || self.compute.ami.is_none()
    }

    /// Fill unset settings from the instance context. Values that are
    /// already set are never overridden.
    pub fn with_context_defaults(mut self, ctx: &InventoryContext) -> Self {
        if self.region.is_none() {
            self.region = ctx.region();
        }
        if self.vpc_id.is_none() {
            self.vpc_id = ctx.vpc_id.clone();
        }
        if self.instance_profile.is_none() {
            self.instance_profile = ctx.instance_profile.clone();
        }
        if self.key_name.is_none() {
            self.key_name = ctx.key_name.clone();
        }
        if self.security_groups.is_empty() {
            self.security_groups = ctx.security_groups.clone();
        }
        if self.compute.ami.is_none() {
            self.compute.ami = ctx.image_id.clone();
        }
        self
    }
}

/// A fully resolved cluster layout.
///
/// Built once, by [`ClusterTopology::resolve`] or by decoding a
/// configuration file, and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterTopology {
    settings: ClusterSettings,
    vpc_id: String,
    all_subnets: Vec<Subnet>,
    node_subnets: Vec<Subnet>,
    controller_address: Ipv4Addr,
    backup_controller_address: Option<Ipv4Addr>,
    node_addresses: Vec<Ipv4Addr>,
}

impl ClusterTopology {
    /// Resolve settings against the subnets of their VPC.
    pub fn resolve(
        settings: ClusterSettings,
        all_subnets: Vec<Subnet>,
    ) -> Result<Self, TopologyError> {
        let vpc_id = settings.vpc_id.clone().ok_or(TopologyError::MissingVpcId)?;
        if all_subnets.is_empty() {
            return Err(TopologyError::UnresolvableInventory(vpc_id));
        }

        check_settings(&settings)?;
        check_subnets(&vpc_id, &all_subnets)?;
        check_app_config(&settings.app_config, &vpc_id, &all_subnets)?;

        let node_subnets = select_node_subnets(settings.node_subnet_ids.as_deref(), &all_subnets)?;

        let controller = controller_address(settings.controller, &all_subnets)?;
        let controller_subnet = get_subnet_for_address(controller, &all_subnets);
        let backup = backup_controller_address(
            settings.backup_controller,
            controller_subnet,
            &all_subnets,
        )?;

        let nodes = node_addresses(
            &node_subnets,
            settings.reserved_addresses,
            settings.max_nodes,
        );

        debug!(
            "Resolved {}: controller {}, backup {:?}, {} nodes across {} subnets",
            vpc_id,
            controller,
            backup,
            nodes.len(),
            node_subnets.len()
        );

        Ok(Self {
            settings,
            vpc_id,
            all_subnets,
            node_subnets,
            controller_address: controller,
            backup_controller_address: backup,
            node_addresses: nodes,
        })
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    pub fn region(&self) -> Option<&str> {
        self.settings.region.as_deref()
    }

    pub fn all_subnets(&self) -> &[Subnet] {
        &self.all_subnets
    }

    pub fn node_subnets(&self) -> &[Subnet] {
        &self.node_subnets
    }

    pub fn controller_address(&self) -> Ipv4Addr {
        self.controller_address
    }

    pub fn backup_controller_address(&self) -> Option<Ipv4Addr> {
        self.backup_controller_address
    }

    /// Node addresses; index `i` belongs to node `prefix + i`
    pub fn node_addresses(&self) -> &[Ipv4Addr] {
        &self.node_addresses
    }

    pub fn controller_hostname(&self) -> &str {
        &self.settings.controller_hostname
    }

    pub fn backup_controller_hostname(&self) -> &str {
        &self.settings.backup_controller_hostname
    }

    pub fn node_hostname_prefix(&self) -> &str {
        &self.settings.node_hostname_prefix
    }

    pub fn controller_subnet(&self) -> Option<&Subnet> {
        get_subnet_for_address(self.controller_address, &self.all_subnets)
    }

    pub fn backup_controller_subnet(&self) -> Option<&Subnet> {
        self.backup_controller_address
            .and_then(|addr| get_subnet_for_address(addr, &self.all_subnets))
    }

    pub fn subnet_for_address(&self, addr: Ipv4Addr) -> Option<&Subnet> {
        get_subnet_for_address(addr, &self.all_subnets)
    }

    pub fn address_for_nodename(&self, name: &str) -> Result<Ipv4Addr, TopologyError> {
        get_address_for_nodename(name, &self.settings.node_hostname_prefix, &self.node_addresses)
    }

    /// Node names paired with their addresses, in node id order
    pub fn nodes(&self) -> impl Iterator<Item = (String, Ipv4Addr)> + '_ {
        self.node_addresses
            .iter()
            .enumerate()
            .map(|(i, addr)| (node_name(&self.settings.node_hostname_prefix, i), *addr))
    }
}

/// Whether a section name is reserved for topology metadata
pub fn is_reserved_section_name(name: &str, vpc_id: &str, subnets: &[Subnet]) -> bool {
    name.starts_with(VPC_ID_PREFIX)
        || name.starts_with(SUBNET_ID_PREFIX)
        || name == vpc_id
        || subnets.iter().any(|s| s.id == name)
}

// ============================================================================
// SBIO: Pure validation (no I/O)
// ============================================================================

/// Settings must survive the configuration file unchanged: one value per
/// line, trimmed, and list elements split on whitespace.
fn check_settings(settings: &ClusterSettings) -> Result<(), TopologyError> {
    let compute = &settings.compute;

    for (key, value) in [
        ("controller_hostname", &settings.controller_hostname),
        ("backup_controller_hostname", &settings.backup_controller_hostname),
        ("node_hostname_prefix", &settings.node_hostname_prefix),
        ("compute_instance_type", &compute.instance_type),
    ] {
        check_token(key, value)?;
    }

    for (key, value) in [
        ("region", &settings.region),
        ("slurm_s3_root", &settings.slurm_s3_root),
        ("instance_profile", &settings.instance_profile),
        ("key_name", &settings.key_name),
        ("compute_ami", &compute.ami),
        ("compute_bid_price", &compute.bid_price),
    ] {
        if let Some(value) = value {
            check_scalar(key, value)?;
        }
    }

    if let Some(vpc_id) = &settings.vpc_id {
        if let Some(reason) = section_name_problem(vpc_id) {
            return Err(TopologyError::InvalidSetting {
                key: "vpc_id".to_string(),
                reason: reason.to_string(),
            });
        }
    }

    let node_subnet_ids = settings.node_subnet_ids.as_deref().unwrap_or_default();
    for (key, values) in [
        ("security_groups", settings.security_groups.as_slice()),
        ("node_subnet_ids", node_subnet_ids),
        ("compute_os_packages", compute.os_packages.as_slice()),
        ("compute_external_packages", compute.external_packages.as_slice()),
    ] {
        for value in values {
            check_token(key, value)?;
        }
    }
    Ok(())
}

fn check_scalar(key: &str, value: &str) -> Result<(), TopologyError> {
    if value.is_empty() {
        return Err(TopologyError::EmptySetting(key.to_string()));
    }
    if value.contains(['\n', '\r']) || value.trim() != value {
        return Err(TopologyError::InvalidSetting {
            key: key.to_string(),
            reason: "values must be a single line without surrounding spaces".to_string(),
        });
    }
    Ok(())
}

fn check_token(key: &str, value: &str) -> Result<(), TopologyError> {
    if value.is_empty() {
        return Err(TopologyError::EmptySetting(key.to_string()));
    }
    if value.contains(char::is_whitespace) {
        return Err(TopologyError::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{}' contains whitespace", value.escape_debug()),
        });
    }
    Ok(())
}

/// VPC and subnet ids name sections and are listed space-separated.
fn section_name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("ids must not be empty")
    } else if name.contains(char::is_whitespace) || name.contains(['[', ']']) {
        Some("ids must not contain whitespace or brackets")
    } else if name == crate::config::MASTER_SECTION {
        Some("id collides with the settings section")
    } else {
        None
    }
}

fn check_subnets(vpc_id: &str, subnets: &[Subnet]) -> Result<(), TopologyError> {
    let mut seen = HashSet::new();
    for subnet in subnets {
        let invalid = |reason: &str| TopologyError::InvalidSubnet {
            subnet: subnet.id.clone(),
            reason: reason.to_string(),
        };
        if let Some(reason) = section_name_problem(&subnet.id) {
            return Err(invalid(reason));
        }
        let zone = &subnet.availability_zone;
        if zone.is_empty() || zone.contains(['\n', '\r']) || zone.trim() != zone {
            return Err(invalid("availability zone must be a non-empty single line"));
        }
        if !seen.insert(subnet.id.as_str()) {
            return Err(TopologyError::DuplicateSubnet(subnet.id.clone()));
        }
        if subnet.vpc_id != vpc_id {
            return Err(TopologyError::ForeignSubnet {
                subnet: subnet.id.clone(),
                actual: subnet.vpc_id.clone(),
                expected: vpc_id.to_string(),
            });
        }
    }
    Ok(())
}

fn check_app_config(
    app_config: &AppConfig,
    vpc_id: &str,
    subnets: &[Subnet],
) -> Result<(), TopologyError> {
    for (section, entries) in app_config {
        if section.trim().is_empty()
            || section.trim() != section
            || section.contains(['[', ']', '\n', '\r'])
            || section == crate::config::MASTER_SECTION
            || is_reserved_section_name(section, vpc_id, subnets)
        {
            return Err(TopologyError::ReservedAppSection(section.clone()));
        }

        for (key, value) in entries {
            let invalid = |reason: &str| TopologyError::InvalidAppEntry {
                section: section.clone(),
                key: key.clone(),
                reason: reason.to_string(),
            };
            if key.trim().is_empty() || key.trim() != key {
                return Err(invalid("keys must be non-empty without surrounding spaces"));
            }
            if key.contains(['=', ':', '\n']) || key.starts_with(['#', ';', '[']) {
                return Err(invalid("key contains a reserved character"));
            }
            if value.contains(['\n', '\r']) || value.trim() != value {
                return Err(invalid("values must be a single line without surrounding spaces"));
            }
        }
    }
    Ok(())
}

fn select_node_subnets(
    filter: Option<&[String]>,
    all_subnets: &[Subnet],
) -> Result<Vec<Subnet>, TopologyError> {
    let selected: Vec<Subnet> = match filter {
        None => all_subnets.to_vec(),
        Some(ids) => {
            if let Some(unknown) = ids.iter().find(|id| !all_subnets.iter().any(|s| &s.id == *id)) {
                return Err(TopologyError::UnknownNodeSubnet(unknown.clone()));
            }
            // Inventory order, not filter order, drives the interleave.
            all_subnets
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect()
        }
    };

    if selected.is_empty() {
        return Err(TopologyError::NoNodeSubnets);
    }
    Ok(selected)
}
