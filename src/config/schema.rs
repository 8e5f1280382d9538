//! Key schema of the master section.
//!
//! The master section name and this table are the compatibility surface of
//! the file format. Changing either requires bumping [`FORMAT_VERSION`].

use crate::topology::{
    DEFAULT_BACKUP_CONTROLLER_HOSTNAME, DEFAULT_COMPUTE_INSTANCE_TYPE,
    DEFAULT_CONTROLLER_HOSTNAME, DEFAULT_NODE_HOSTNAME_PREFIX, DEFAULT_RESERVED_ADDRESSES,
};

/// Name of the master configuration section
pub const MASTER_SECTION: &str = "slurm-ec2";

/// Newest format version this crate reads and the one it writes
pub const FORMAT_VERSION: u32 = 1;

/// Key listing the subnets of a VPC section
pub const VPC_SUBNET_IDS_KEY: &str = "subnet_ids";
pub const CIDR_BLOCK_KEY: &str = "cidr_block";
pub const AVAILABILITY_ZONE_KEY: &str = "availability_zone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Scalar,
    /// Whitespace-separated list
    List,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDefault {
    None,
    Text(&'static str),
    Int(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub name: &'static str,
    pub kind: KeyKind,
    pub default: KeyDefault,
}

impl KeySpec {
    const fn new(name: &'static str, kind: KeyKind, default: KeyDefault) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }

    /// Textual form of the default, as it would appear in a file
    pub fn default_text(&self) -> Option<String> {
        match self.default {
            KeyDefault::None => None,
            KeyDefault::Text(s) => Some(s.to_string()),
            KeyDefault::Int(n) => Some(n.to_string()),
        }
    }
}

pub const FORMAT_VERSION_KEY: &str = "format_version";

/// Master section keys, in the order they are written.
pub const MASTER_KEYS: &[KeySpec] = &[
    KeySpec::new(FORMAT_VERSION_KEY, KeyKind::Int, KeyDefault::Int(FORMAT_VERSION)),
    KeySpec::new("region", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("slurm_s3_root", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("vpc_id", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("instance_profile", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("key_name", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("security_groups", KeyKind::List, KeyDefault::None),
    KeySpec::new("controller_address", KeyKind::Scalar, KeyDefault::Text("auto")),
    KeySpec::new("backup_controller_address", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new(
        "controller_hostname",
        KeyKind::Scalar,
        KeyDefault::Text(DEFAULT_CONTROLLER_HOSTNAME),
    ),
    KeySpec::new(
        "backup_controller_hostname",
        KeyKind::Scalar,
        KeyDefault::Text(DEFAULT_BACKUP_CONTROLLER_HOSTNAME),
    ),
    KeySpec::new(
        "node_hostname_prefix",
        KeyKind::Scalar,
        KeyDefault::Text(DEFAULT_NODE_HOSTNAME_PREFIX),
    ),
    KeySpec::new(
        "reserved_addresses",
        KeyKind::Int,
        KeyDefault::Int(DEFAULT_RESERVED_ADDRESSES),
    ),
    KeySpec::new("max_nodes", KeyKind::Int, KeyDefault::None),
    KeySpec::new(
        "compute_instance_type",
        KeyKind::Scalar,
        KeyDefault::Text(DEFAULT_COMPUTE_INSTANCE_TYPE),
    ),
    KeySpec::new("compute_ami", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("compute_bid_price", KeyKind::Scalar, KeyDefault::None),
    KeySpec::new("compute_os_packages", KeyKind::List, KeyDefault::None),
    KeySpec::new("compute_external_packages", KeyKind::List, KeyDefault::None),
    KeySpec::new("node_subnet_ids", KeyKind::List, KeyDefault::None),
];

/// Look up a master section key
pub fn key_spec(name: &str) -> Option<&'static KeySpec> {
    MASTER_KEYS.iter().find(|k| k.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let names: HashSet<_> = MASTER_KEYS.iter().map(|k| k.name).collect();
        assert_eq!(names.len(), MASTER_KEYS.len());
    }

    #[test]
    fn test_key_kinds() {
        assert_eq!(key_spec("security_groups").unwrap().kind, KeyKind::List);
        assert_eq!(key_spec("max_nodes").unwrap().kind, KeyKind::Int);
        assert_eq!(key_spec("vpc_id").unwrap().kind, KeyKind::Scalar);
        assert!(key_spec("subnet_ids").is_none());
    }

    #[test]
    fn test_default_text() {
        assert_eq!(
            key_spec("reserved_addresses").unwrap().default_text(),
            Some("8".to_string())
        );
        assert_eq!(
            key_spec("controller_hostname").unwrap().default_text(),
            Some("controller".to_string())
        );
        assert_eq!(key_spec("max_nodes").unwrap().default_text(), None);
    }

    #[test]
    fn test_format_version_is_written_first() {
        assert_eq!(MASTER_KEYS[0].name, FORMAT_VERSION_KEY);
    }
}
