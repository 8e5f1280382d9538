//! Launch description for a single compute node.
//!
//! Producing the description is pure; whatever launches the instance
//! consumes the serialized form.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::{instance_types, ArtifactError};
use crate::config::{encode, DEFAULT_CONFIG_PATH};
use crate::topology::{hostname_for_address, ClusterTopology};

pub const ROOT_DEVICE_NAME: &str = "/dev/xvda";
pub const ROOT_VOLUME_SIZE_GB: u32 = 32;
pub const ROOT_VOLUME_TYPE: &str = "gp2";

/// Stock Amazon Linux image per region, used when no compute image is set
static DEFAULT_IMAGES: &[(&str, &str)] = &[
    ("ap-northeast-1", "ami-4985b048"),
    ("ap-southeast-1", "ami-ac5c7afe"),
    ("ap-southeast-2", "ami-63f79559"),
    ("cn-north-1", "ami-ce46d4f7"),
    ("eu-central-1", "ami-b43503a9"),
    ("eu-west-1", "ami-6e7bd919"),
    ("sa-east-1", "ami-8737829a"),
    ("us-east-1", "ami-b66ed3de"),
    ("us-west-1", "ami-4b6f650e"),
    ("us-west-2", "ami-b5a7ea85"),
];

pub fn default_image_for_region(region: &str) -> Option<&'static str> {
    DEFAULT_IMAGES
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, ami)| *ami)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceProfileRef {
    Arn(String),
    Name(String),
}

impl InstanceProfileRef {
    pub fn parse(profile: &str) -> Self {
        if profile.starts_with("arn:") {
            InstanceProfileRef::Arn(profile.to_string())
        } else {
            InstanceProfileRef::Name(profile.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BlockDevice {
    Ebs {
        device_name: String,
        size_gb: u32,
        volume_type: String,
    },
    Ephemeral {
        device_name: String,
        virtual_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeLaunchSpec {
    pub node_name: String,
    pub private_address: Ipv4Addr,
    pub subnet_id: String,
    pub availability_zone: String,
    pub instance_type: String,
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    pub security_groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_profile: Option<InstanceProfileRef>,
    /// Spot bid; `None` launches on demand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_price: Option<String>,
    pub block_devices: Vec<BlockDevice>,
    pub tags: Vec<(String, String)>,
    pub user_data: String,
}

/// Root volume plus one mapping per instance-store volume (`/dev/sdb`, ...)
pub fn block_devices(instance_type: &str) -> Vec<BlockDevice> {
    let mut devices = vec![BlockDevice::Ebs {
        device_name: ROOT_DEVICE_NAME.to_string(),
        size_gb: ROOT_VOLUME_SIZE_GB,
        volume_type: ROOT_VOLUME_TYPE.to_string(),
    }];

    let stores = instance_types::lookup(instance_type)
        .map(|r| r.ephemeral_stores_gb)
        .unwrap_or(&[]);
    for (i, _) in stores.iter().enumerate() {
        // hs1.8xlarge has 24 stores, which still ends at /dev/sdy
        let letter = (b'b' + i as u8) as char;
        devices.push(BlockDevice::Ephemeral {
            device_name: format!("/dev/sd{}", letter),
            virtual_name: format!("ephemeral{}", i),
        });
    }
    devices
}

/// Boot script: set the hostname and install the cluster configuration
fn user_data(topology: &ClusterTopology, node_name: &str) -> String {
    format!(
        "#!/bin/sh\nhostname '{}'\ncat > {} <<.EOF\n{}.EOF\n",
        node_name,
        DEFAULT_CONFIG_PATH,
        encode(topology)
    )
}

/// Describe the instance that backs `node_name`.
pub fn node_launch_spec(
    topology: &ClusterTopology,
    node_name: &str,
) -> Result<NodeLaunchSpec, ArtifactError> {
    let address = topology.address_for_nodename(node_name)?;
    let subnet = topology
        .subnet_for_address(address)
        .ok_or(ArtifactError::AddressOutsideInventory(address))?;
    let settings = topology.settings();
    let compute = &settings.compute;

    let image_id = match &compute.ami {
        Some(ami) => ami.clone(),
        None => topology
            .region()
            .and_then(default_image_for_region)
            .map(str::to_string)
            .ok_or_else(|| ArtifactError::MissingImage(topology.region().map(str::to_string)))?,
    };

    let mut tags = vec![
        ("Name".to_string(), format!("SLURM Computation Node {}", node_name)),
        ("SLURMHostname".to_string(), hostname_for_address(address)),
    ];
    if let Some(root) = &settings.slurm_s3_root {
        tags.push(("SLURMS3Root".to_string(), root.clone()));
    }

    Ok(NodeLaunchSpec {
        node_name: node_name.to_string(),
        private_address: address,
        subnet_id: subnet.id.clone(),
        availability_zone: subnet.availability_zone.clone(),
        instance_type: compute.instance_type.clone(),
        image_id,
        key_name: settings.key_name.clone(),
        security_groups: settings.security_groups.clone(),
        instance_profile: settings
            .instance_profile
            .as_deref()
            .map(InstanceProfileRef::parse),
        bid_price: compute.bid_price.clone(),
        block_devices: block_devices(&compute.instance_type),
        tags,
        user_data: user_data(topology, node_name),
    })
}
