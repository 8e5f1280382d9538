//! Pure placement functions: controller, backup controller and node pool.
//!
//! Nothing in here touches the inventory or the filesystem. Every function
//! is a deterministic function of its arguments.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::debug;

use super::selector::AddressSelector;
use super::subnet::{min_by_cidr, Subnet};

/// Errors raised while resolving a topology
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    #[error("Invalid node name '{name}': expected '{prefix}' followed by a node index")]
    InvalidNodeName { name: String, prefix: String },

    #[error("Node index {index} is out of range ({count} node addresses available)")]
    NodeIndexOutOfRange { index: usize, count: usize },

    #[error("No subnets available for VPC '{0}'")]
    UnresolvableInventory(String),

    #[error("No subnets available to place the controller")]
    NoSubnets,

    #[error("No VPC id was given and none could be derived from the instance context")]
    MissingVpcId,

    #[error("The controller address cannot be disabled")]
    ControllerRequired,

    #[error("The controller address is not inside any subnet of the VPC")]
    ControllerOutsideInventory,

    #[error("Node subnet '{0}' is not part of the VPC")]
    UnknownNodeSubnet(String),

    #[error("No node subnets selected")]
    NoNodeSubnets,

    #[error("Subnet '{0}' appears more than once")]
    DuplicateSubnet(String),

    #[error("Subnet '{subnet}' belongs to VPC '{actual}', expected '{expected}'")]
    ForeignSubnet {
        subnet: String,
        actual: String,
        expected: String,
    },

    #[error("Setting '{0}' must not be empty")]
    EmptySetting(String),

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Invalid subnet '{subnet}': {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    #[error("Application section '{0}' collides with topology metadata")]
    ReservedAppSection(String),

    #[error("Invalid application entry [{section}] '{key}': {reason}")]
    InvalidAppEntry {
        section: String,
        key: String,
        reason: String,
    },
}

/// Resolve the primary controller address.
///
/// `Auto` takes the lowest subnet by `(network, prefix length, id)` and uses
/// its controller slot.
pub fn controller_address(
    selector: AddressSelector,
    all_subnets: &[Subnet],
) -> Result<Ipv4Addr, TopologyError> {
    match selector {
        AddressSelector::Explicit(addr) => Ok(addr),
        AddressSelector::Auto => min_by_cidr(all_subnets)
            .map(Subnet::controller_slot)
            .ok_or(TopologyError::NoSubnets),
        AddressSelector::Disabled => Err(TopologyError::ControllerRequired),
    }
}

/// Resolve the backup controller address.
///
/// `Auto` picks the lowest subnet outside the controller's availability
/// zone. A single-zone VPC yields `Ok(None)`: the backup is simply left out.
pub fn backup_controller_address(
    selector: AddressSelector,
    controller_subnet: Option<&Subnet>,
    all_subnets: &[Subnet],
) -> Result<Option<Ipv4Addr>, TopologyError> {
    match selector {
        AddressSelector::Disabled => Ok(None),
        AddressSelector::Explicit(addr) => Ok(Some(addr)),
        AddressSelector::Auto => {
            let controller_az = &controller_subnet
                .ok_or(TopologyError::ControllerOutsideInventory)?
                .availability_zone;

            let candidate = min_by_cidr(
                all_subnets
                    .iter()
                    .filter(|s| &s.availability_zone != controller_az),
            );

            if candidate.is_none() {
                debug!(
                    "No subnet outside {} for the backup controller; backup disabled",
                    controller_az
                );
            }
            Ok(candidate.map(Subnet::controller_slot))
        }
    }
}

/// First subnet, in the given order, whose CIDR contains `addr`.
///
/// Overlapping subnets are not an error here; the earliest match wins.
pub fn get_subnet_for_address(addr: Ipv4Addr, all_subnets: &[Subnet]) -> Option<&Subnet> {
    all_subnets.iter().find(|s| s.contains(addr))
}

/// Build the ordered node address pool.
///
/// Each subnet contributes its node-eligible hosts minus the first
/// `reserved_addresses`. The subnets are walked round-robin, one address
/// each per round, so consecutive node ids land in different availability
/// zones. Collection stops at `max_nodes`; running out of capacity first is
/// not an error.
pub fn node_addresses(
    node_subnets: &[Subnet],
    reserved_addresses: u32,
    max_nodes: Option<u32>,
) -> Vec<Ipv4Addr> {
    let limit = max_nodes.map(|m| m as usize).unwrap_or(usize::MAX);
    let rounds = node_subnets
        .iter()
        .map(|s| s.node_capacity(reserved_addresses))
        .max()
        .unwrap_or(0);
    let capacity = total_node_capacity(node_subnets, reserved_addresses);

    let mut addresses = Vec::with_capacity(capacity.min(limit));
    let mut seen = HashSet::with_capacity(capacity.min(limit));

    'rounds: for round in 0..rounds {
        for subnet in node_subnets {
            if addresses.len() >= limit {
                break 'rounds;
            }
            if let Some(addr) = subnet.node_address(reserved_addresses, round) {
                // Overlapping node subnets would otherwise hand out an
                // address twice.
                if seen.insert(addr) {
                    addresses.push(addr);
                }
            }
        }
    }

    addresses
}

/// Upper bound on the node pool size for these subnets
pub fn total_node_capacity(node_subnets: &[Subnet], reserved_addresses: u32) -> usize {
    node_subnets
        .iter()
        .map(|s| s.node_capacity(reserved_addresses) as usize)
        .sum()
}

/// Parse the node index out of a node name such as `node-12`.
pub fn node_index(name: &str, prefix: &str) -> Result<usize, TopologyError> {
    let invalid = || TopologyError::InvalidNodeName {
        name: name.to_string(),
        prefix: prefix.to_string(),
    };

    let suffix = name.strip_prefix(prefix).ok_or_else(invalid)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    suffix.parse().map_err(|_| invalid())
}

/// Map a node name back to its address.
pub fn get_address_for_nodename(
    name: &str,
    prefix: &str,
    node_addresses: &[Ipv4Addr],
) -> Result<Ipv4Addr, TopologyError> {
    let index = node_index(name, prefix)?;
    node_addresses
        .get(index)
        .copied()
        .ok_or(TopologyError::NodeIndexOutOfRange {
            index,
            count: node_addresses.len(),
        })
}

/// Hostname of the node with the given index
pub fn node_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}
