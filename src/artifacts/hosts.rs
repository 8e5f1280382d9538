use std::net::Ipv4Addr;

use crate::topology::ClusterTopology;

/// Loopback entry at the top of every hosts file
pub const LOOPBACK_LINE: &str = "127.0.0.1 localhost localhost.localdomain";

/// EC2 private DNS suffix for a region
fn internal_domain(region: &str) -> String {
    format!("{}.compute.internal", region)
}

fn host_line(addr: Ipv4Addr, hostname: &str, region: Option<&str>) -> String {
    match region {
        Some(region) => format!(
            "{} {} {}.{}\n",
            addr,
            hostname,
            hostname,
            internal_domain(region)
        ),
        None => format!("{} {}\n", addr, hostname),
    }
}

/// Render the host-alias table (`/etc/hosts`).
///
/// Node lines follow node id order, which is already interleaved across
/// availability zones.
pub fn hosts_file(topology: &ClusterTopology) -> String {
    let region = topology.region();
    let mut out = String::new();

    out.push_str(LOOPBACK_LINE);
    out.push('\n');
    out.push_str(&host_line(
        topology.controller_address(),
        topology.controller_hostname(),
        region,
    ));
    if let Some(backup) = topology.backup_controller_address() {
        out.push_str(&host_line(
            backup,
            topology.backup_controller_hostname(),
            region,
        ));
    }
    for (name, addr) in topology.nodes() {
        out.push_str(&host_line(addr, &name, region));
    }

    out
}
