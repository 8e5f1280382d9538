//! Files and descriptions rendered from a resolved topology.

pub mod hosts;
pub mod instance_types;
pub mod launch;
pub mod slurm;

pub use hosts::hosts_file;
pub use instance_types::{known_instance_types, lookup as lookup_instance_type, InstanceResources};
pub use launch::{node_launch_spec, BlockDevice, InstanceProfileRef, NodeLaunchSpec};
pub use slurm::{node_definition, slurm_configuration};

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::topology::TopologyError;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("No compute node addresses available; cannot describe an empty node range")]
    NoNodeAddresses,

    #[error("Address {0} is not inside any subnet of the inventory")]
    AddressOutsideInventory(Ipv4Addr),

    #[error("No compute image configured and no default image for region {0:?}")]
    MissingImage(Option<String>),
}
