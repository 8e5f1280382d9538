//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use crate::topology::{format_validation_result, ClusterTopology, Subnet, ValidationResult};

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No resources found.\n".to_string();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!(
            "{:width$}",
            header.to_uppercase(),
            width = widths[i]
        ));
    }
    output.push('\n');

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        output.push('\n');
    }

    output
}

// ============================================================================
// Topology display
// ============================================================================

fn subnet_roles(topology: &ClusterTopology, subnet: &Subnet) -> String {
    let mut roles = Vec::new();
    if topology.controller_subnet().map(|s| &s.id) == Some(&subnet.id) {
        roles.push("controller");
    }
    if topology.backup_controller_subnet().map(|s| &s.id) == Some(&subnet.id) {
        roles.push("backup");
    }
    if topology.node_subnets().iter().any(|s| s.id == subnet.id) {
        roles.push("nodes");
    }
    if roles.is_empty() {
        "-".to_string()
    } else {
        roles.join(",")
    }
}

/// Format the subnets of a topology with their roles
pub fn format_subnet_table(topology: &ClusterTopology) -> String {
    let rows = topology
        .all_subnets()
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.cidr_block.to_string(),
                s.availability_zone.clone(),
                subnet_roles(topology, s),
            ]
        })
        .collect();
    format_table(&["SUBNET", "CIDR", "ZONE", "ROLES"], rows)
}

/// Format compute nodes with their address and subnet
pub fn format_node_table(topology: &ClusterTopology) -> String {
    let rows = topology
        .nodes()
        .map(|(name, addr)| {
            let subnet = topology
                .subnet_for_address(addr)
                .map(|s| s.id.clone())
                .unwrap_or_else(|| "-".to_string());
            vec![name, addr.to_string(), subnet]
        })
        .collect();
    format_table(&["NODE", "ADDRESS", "SUBNET"], rows)
}

/// Format a topology summary for display
pub fn format_topology_summary(topology: &ClusterTopology) -> String {
    let mut output = String::new();

    output.push_str(&format!("VPC:        {}\n", topology.vpc_id()));
    output.push_str(&format!(
        "Region:     {}\n",
        topology.region().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Controller: {} ({})\n",
        topology.controller_hostname(),
        topology.controller_address()
    ));
    match topology.backup_controller_address() {
        Some(addr) => output.push_str(&format!(
            "Backup:     {} ({})\n",
            topology.backup_controller_hostname(),
            addr
        )),
        None => output.push_str("Backup:     none\n"),
    }
    output.push_str(&format!(
        "Nodes:      {} x {}\n",
        topology.node_addresses().len(),
        topology.settings().compute.instance_type
    ));

    output.push('\n');
    output.push_str(&format_subnet_table(topology));
    output
}

// ============================================================================
// Validation display
// ============================================================================

/// Format validation result for display
pub fn format_validation_report(result: &ValidationResult, path: &str) -> String {
    let mut output = String::new();

    if result.passed {
        output.push_str(&format!("✓ {} is valid\n", path));
    } else {
        output.push_str(&format!("✗ {} is invalid\n", path));
    }
    if !result.messages.is_empty() {
        output.push('\n');
        output.push_str(&format_validation_result(result));
    }

    output
}
