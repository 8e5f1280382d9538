//! Topology resolution: where the controllers live and which address each
//! compute node gets.

pub mod cluster;
pub mod resolver;
pub mod selector;
pub mod subnet;
pub mod validation;

pub use cluster::{
    is_reserved_section_name, AppConfig, ClusterSettings, ClusterTopology, ComputeSettings,
    DEFAULT_BACKUP_CONTROLLER_HOSTNAME, DEFAULT_COMPUTE_INSTANCE_TYPE,
    DEFAULT_CONTROLLER_HOSTNAME, DEFAULT_NODE_HOSTNAME_PREFIX, DEFAULT_RESERVED_ADDRESSES,
    SUBNET_ID_PREFIX, VPC_ID_PREFIX,
};
pub use resolver::{
    backup_controller_address, controller_address, get_address_for_nodename,
    get_subnet_for_address, node_addresses, node_index, node_name, total_node_capacity,
    TopologyError,
};
pub use selector::{AddressSelector, SelectorParseError};
pub use subnet::{
    cmp_by_cidr, hostname_for_address, min_by_cidr, Subnet, CONTROLLER_OFFSET, FIRST_NODE_OFFSET,
};
pub use validation::{
    format_validation_result, validate_topology, ValidationMessage, ValidationResult,
    ValidationSeverity,
};
