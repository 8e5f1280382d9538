//! End-to-end tests: inventory dump -> resolved topology -> configuration
//! file -> artifacts, the way a controller bootstraps a cluster and a node
//! later reads the result back.

use std::net::Ipv4Addr;
use std::path::Path;

use tempfile::TempDir;

use slurm_topology::artifacts::{hosts_file, node_launch_spec, slurm_configuration};
use slurm_topology::config::{decode, encode, load_topology_file, save_topology_file};
use slurm_topology::context::{save_context_to, InventoryContext};
use slurm_topology::inventory::{resolve_topology, FileInventory};
use slurm_topology::topology::{
    validate_topology, AddressSelector, ClusterSettings, ClusterTopology,
};

const TWO_ZONE_DUMP: &str = r#"{
    "Subnets": [
        {"SubnetId": "subnet-0a", "VpcId": "vpc-1", "CidrBlock": "10.0.0.0/24",
         "AvailabilityZone": "us-west-2a"},
        {"SubnetId": "subnet-0b", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24",
         "AvailabilityZone": "us-west-2b"},
        {"SubnetId": "subnet-zz", "VpcId": "vpc-other", "CidrBlock": "172.16.0.0/24",
         "AvailabilityZone": "us-west-2a"}
    ]
}"#;

fn write_dump(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("subnets.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

async fn resolve_two_zones(dir: &TempDir, settings: ClusterSettings) -> ClusterTopology {
    let inventory = FileInventory::new(write_dump(dir.path(), TWO_ZONE_DUMP))
        .with_context(InventoryContext::new("vpc-1", "us-west-2"));
    resolve_topology(&inventory, settings).await.unwrap()
}

#[tokio::test]
async fn test_two_zone_cluster() {
    let dir = TempDir::new().unwrap();
    let settings = ClusterSettings {
        backup_controller: AddressSelector::Auto,
        ..Default::default()
    };
    let topology = resolve_two_zones(&dir, settings).await;

    assert_eq!(topology.vpc_id(), "vpc-1");
    assert_eq!(topology.all_subnets().len(), 2);
    assert_eq!(topology.controller_address(), ip("10.0.0.4"));
    assert_eq!(topology.backup_controller_address(), Some(ip("10.0.1.4")));
    assert_eq!(
        &topology.node_addresses()[..4],
        &[ip("10.0.0.13"), ip("10.0.1.13"), ip("10.0.0.14"), ip("10.0.1.14")]
    );
    assert!(validate_topology(&topology).passed);
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut settings = ClusterSettings {
        backup_controller: AddressSelector::Auto,
        max_nodes: Some(6),
        slurm_s3_root: Some("s3://bucket/slurm".to_string()),
        ..Default::default()
    };
    settings.app_config.entry("myapp".to_string()).or_default().insert(
        "threads".to_string(),
        "4".to_string(),
    );
    let topology = resolve_two_zones(&dir, settings).await;

    let path = dir.path().join("etc").join("slurm-ec2.conf");
    save_topology_file(&topology, &path).unwrap();
    let reloaded = load_topology_file(&path).unwrap();

    assert_eq!(reloaded, topology);
    assert_eq!(encode(&reloaded), std::fs::read_to_string(&path).unwrap());
    assert_eq!(reloaded.settings().app_config["myapp"]["threads"], "4");
}

#[tokio::test]
async fn test_node_reads_config_and_renders_artifacts() {
    let dir = TempDir::new().unwrap();
    let settings = ClusterSettings {
        backup_controller: AddressSelector::Auto,
        max_nodes: Some(4),
        ..Default::default()
    };
    let topology = resolve_two_zones(&dir, settings).await;

    // A compute node only sees the configuration text.
    let on_node = decode(&encode(&topology)).unwrap();

    let slurm = slurm_configuration(&on_node).unwrap();
    assert!(slurm.contains("ControlAddr=10.0.0.4\n"));
    assert!(slurm.contains("BackupAddr=10.0.1.4\n"));
    assert!(slurm.contains("NodeName=node-[0-3] "));

    let hosts = hosts_file(&on_node);
    assert_eq!(hosts.lines().count(), 1 + 2 + 4);
    assert!(hosts.contains("10.0.1.14 node-3 node-3.us-west-2.compute.internal\n"));

    assert_eq!(on_node.address_for_nodename("node-2"), Ok(ip("10.0.0.14")));
    let spec = node_launch_spec(&on_node, "node-2").unwrap();
    assert_eq!(spec.subnet_id, "subnet-0a");
}

#[tokio::test]
async fn test_single_zone_has_no_backup() {
    let dir = TempDir::new().unwrap();
    let dump = r#"{"Subnets": [
        {"SubnetId": "subnet-0a", "VpcId": "vpc-1", "CidrBlock": "10.0.0.0/24",
         "AvailabilityZone": "us-west-2a"}
    ]}"#;
    let inventory = FileInventory::new(write_dump(dir.path(), dump));
    let settings = ClusterSettings {
        vpc_id: Some("vpc-1".to_string()),
        backup_controller: AddressSelector::Auto,
        ..Default::default()
    };

    let topology = resolve_topology(&inventory, settings).await.unwrap();
    assert_eq!(topology.backup_controller_address(), None);
    assert!(!slurm_configuration(&topology).unwrap().contains("BackupController"));
}

#[tokio::test]
async fn test_max_nodes_spreads_across_zones() {
    let dir = TempDir::new().unwrap();
    let settings = ClusterSettings {
        max_nodes: Some(2),
        ..Default::default()
    };
    let topology = resolve_two_zones(&dir, settings).await;

    let zones: Vec<_> = topology
        .node_addresses()
        .iter()
        .map(|a| topology.subnet_for_address(*a).unwrap().availability_zone.clone())
        .collect();
    assert_eq!(zones, vec!["us-west-2a", "us-west-2b"]);
}

#[tokio::test]
async fn test_context_file_supplies_defaults() {
    let dir = TempDir::new().unwrap();
    let mut ctx = InventoryContext::default();
    ctx.vpc_id = Some("vpc-1".to_string());
    ctx.availability_zone = Some("us-west-2b".to_string());
    ctx.key_name = Some("ops".to_string());
    let ctx_path = dir.path().join("context.yaml");
    save_context_to(&ctx, &ctx_path).unwrap();

    let loaded = slurm_topology::context::load_context_from(&ctx_path).unwrap();
    let inventory = FileInventory::new(write_dump(dir.path(), TWO_ZONE_DUMP)).with_context(loaded);
    let topology = resolve_topology(&inventory, ClusterSettings::default())
        .await
        .unwrap();

    assert_eq!(topology.region(), Some("us-west-2"));
    assert_eq!(topology.settings().key_name.as_deref(), Some("ops"));
}
