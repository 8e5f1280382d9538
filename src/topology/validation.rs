//! Sanity checks over a resolved topology.
//!
//! Resolution succeeds for some layouts that are legal but probably not
//! what the operator wants (overlapping subnets, a backup that silently
//! vanished, a node pool smaller than requested). These checks report them
//! without failing resolution.

use super::cluster::ClusterTopology;
use super::resolver::total_node_capacity;
use super::selector::AddressSelector;
use crate::artifacts::instance_types;
use crate::artifacts::launch::default_image_for_region;

/// Validation result with severity levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationSeverity {
    /// Informational hint
    Info,
    /// Works, but likely not what was intended
    Warning,
    /// Artifacts built from this topology will not work
    Error,
}

/// A single validation message
#[derive(Debug, Clone)]
pub struct ValidationMessage {
    pub severity: ValidationSeverity,
    pub code: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Validation result containing all messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub messages: Vec<ValidationMessage>,
    pub passed: bool,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            passed: true,
        }
    }

    pub fn add(&mut self, msg: ValidationMessage) {
        if msg.severity == ValidationSeverity::Error {
            self.passed = false;
        }
        self.messages.push(msg);
    }

    pub fn info(mut self, code: &str, message: &str) -> Self {
        self.add(ValidationMessage {
            severity: ValidationSeverity::Info,
            code: code.to_string(),
            message: message.to_string(),
            suggestion: None,
        });
        self
    }

    pub fn warning(mut self, code: &str, message: &str, suggestion: Option<&str>) -> Self {
        self.add(ValidationMessage {
            severity: ValidationSeverity::Warning,
            code: code.to_string(),
            message: message.to_string(),
            suggestion: suggestion.map(String::from),
        });
        self
    }

    pub fn error(mut self, code: &str, message: &str, suggestion: Option<&str>) -> Self {
        self.add(ValidationMessage {
            severity: ValidationSeverity::Error,
            code: code.to_string(),
            message: message.to_string(),
            suggestion: suggestion.map(String::from),
        });
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == ValidationSeverity::Error)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.messages.iter().any(|m| m.code == code)
    }
}

pub const AMBIGUOUS_SUBNET_MATCH: &str = "AMBIGUOUS_SUBNET_MATCH";
pub const NODE_POOL_LIMITED: &str = "NODE_POOL_LIMITED";
pub const NODE_CAPACITY_EXCEEDED: &str = "NODE_CAPACITY_EXCEEDED";
pub const EMPTY_NODE_POOL: &str = "EMPTY_NODE_POOL";
pub const BACKUP_DISABLED_SINGLE_ZONE: &str = "BACKUP_DISABLED_SINGLE_ZONE";
pub const BACKUP_SAME_ZONE: &str = "BACKUP_SAME_ZONE";
pub const CONTROLLER_OUTSIDE_SUBNETS: &str = "CONTROLLER_OUTSIDE_SUBNETS";
pub const BACKUP_OUTSIDE_SUBNETS: &str = "BACKUP_OUTSIDE_SUBNETS";
pub const CONTROLLER_IN_NODE_POOL: &str = "CONTROLLER_IN_NODE_POOL";
pub const UNKNOWN_INSTANCE_TYPE: &str = "UNKNOWN_INSTANCE_TYPE";
pub const MISSING_COMPUTE_IMAGE: &str = "MISSING_COMPUTE_IMAGE";

// ============================================================================
// SBIO: Pure validation logic (no I/O)
// ============================================================================

/// Check a resolved topology for layouts that resolve but misbehave.
pub fn validate_topology(topology: &ClusterTopology) -> ValidationResult {
    let mut result = ValidationResult::new();
    let settings = topology.settings();
    let subnets = topology.all_subnets();

    for (i, a) in subnets.iter().enumerate() {
        for b in &subnets[i + 1..] {
            if a.overlaps(b) {
                result = result.warning(
                    AMBIGUOUS_SUBNET_MATCH,
                    &format!(
                        "Subnets {} ({}) and {} ({}) overlap; addresses in both resolve to {}",
                        a.id, a.cidr_block, b.id, b.cidr_block, a.id
                    ),
                    Some("Remove the overlapping subnet from the VPC or from node_subnet_ids"),
                );
            }
        }
    }

    let controller = topology.controller_address();
    if topology.controller_subnet().is_none() {
        result = result.error(
            CONTROLLER_OUTSIDE_SUBNETS,
            &format!("Controller address {} is not inside any subnet of {}", controller, topology.vpc_id()),
            Some("Use controller_address=auto or an address inside the VPC"),
        );
    }

    match (settings.backup_controller, topology.backup_controller_address()) {
        (AddressSelector::Auto, None) => {
            result = result.warning(
                BACKUP_DISABLED_SINGLE_ZONE,
                "No subnet outside the controller's availability zone; running without a backup controller",
                Some("Add a subnet in a second availability zone"),
            );
        }
        (_, Some(backup)) => match topology.backup_controller_subnet() {
            None => {
                result = result.error(
                    BACKUP_OUTSIDE_SUBNETS,
                    &format!("Backup controller address {} is not inside any subnet", backup),
                    None,
                );
            }
            Some(backup_subnet) => {
                let same_zone = topology
                    .controller_subnet()
                    .map(|s| s.availability_zone == backup_subnet.availability_zone)
                    .unwrap_or(false);
                if same_zone {
                    result = result.warning(
                        BACKUP_SAME_ZONE,
                        &format!(
                            "Backup controller shares availability zone {} with the controller",
                            backup_subnet.availability_zone
                        ),
                        None,
                    );
                }
            }
        },
        _ => {}
    }

    let nodes = topology.node_addresses();
    for (role, addr) in std::iter::once(("controller", controller))
        .chain(topology.backup_controller_address().map(|a| ("backup controller", a)))
    {
        if let Some(index) = nodes.iter().position(|n| *n == addr) {
            result = result.error(
                CONTROLLER_IN_NODE_POOL,
                &format!(
                    "The {} address {} is also assigned to {}{}",
                    role,
                    addr,
                    topology.node_hostname_prefix(),
                    index
                ),
                Some("Raise reserved_addresses or move the controller"),
            );
        }
    }

    let capacity = total_node_capacity(topology.node_subnets(), settings.reserved_addresses);
    if nodes.is_empty() {
        result = result.error(
            EMPTY_NODE_POOL,
            "No addresses are available for compute nodes",
            Some("Lower reserved_addresses, raise max_nodes or add node subnets"),
        );
    } else if let Some(max) = settings.max_nodes {
        let max = max as usize;
        if max > nodes.len() {
            result = result.warning(
                NODE_CAPACITY_EXCEEDED,
                &format!(
                    "max_nodes is {} but the node subnets only provide {} addresses",
                    max,
                    nodes.len()
                ),
                None,
            );
        } else if max < capacity {
            result = result.info(
                NODE_POOL_LIMITED,
                &format!("Node pool limited to {} of {} available addresses", max, capacity),
            );
        }
    }

    let instance_type = &settings.compute.instance_type;
    if instance_types::lookup(instance_type).is_none() {
        result = result.warning(
            UNKNOWN_INSTANCE_TYPE,
            &format!("No resource profile for instance type {}", instance_type),
            Some("SLURM will probe node resources at registration"),
        );
    }

    let has_default_image = topology
        .region()
        .and_then(default_image_for_region)
        .is_some();
    if settings.compute.ami.is_none() && !has_default_image {
        result = result.warning(
            MISSING_COMPUTE_IMAGE,
            "No compute_ami set and no default image for this region",
            Some("Set compute_ami"),
        );
    }

    result
}

/// Format a validation result for display
pub fn format_validation_result(result: &ValidationResult) -> String {
    let mut output = String::new();

    for msg in &result.messages {
        let prefix = match msg.severity {
            ValidationSeverity::Info => "INFO",
            ValidationSeverity::Warning => "WARN",
            ValidationSeverity::Error => "ERROR",
        };

        output.push_str(&format!("  {} [{}]: {}\n", prefix, msg.code, msg.message));

        if let Some(suggestion) = &msg.suggestion {
            output.push_str(&format!("    -> {}\n", suggestion));
        }
    }

    output
}
