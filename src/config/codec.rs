//! Topology <-> configuration text.
//!
//! The file carries the raw settings plus the VPC's subnets, so decoding
//! rebuilds the topology without asking the inventory provider. Resolution
//! is deterministic, so `decode(encode(t)) == t`.

use std::collections::BTreeMap;

use ipnet::Ipv4Net;
use thiserror::Error;
use tracing::debug;

use super::ini::{IniDocument, IniSection};
use super::schema::{
    key_spec, AVAILABILITY_ZONE_KEY, CIDR_BLOCK_KEY, FORMAT_VERSION, FORMAT_VERSION_KEY,
    MASTER_KEYS, MASTER_SECTION, VPC_SUBNET_IDS_KEY,
};
use crate::topology::{
    is_reserved_section_name, AddressSelector, AppConfig, ClusterSettings, ClusterTopology,
    ComputeSettings, Subnet, TopologyError,
};

/// Errors that can occur while decoding configuration text
#[derive(Error, Debug, PartialEq)]
pub enum ConfigParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing section [{0}]")]
    MissingSection(String),

    #[error("[{section}] missing required key '{key}'")]
    MissingKey { section: String, key: String },

    #[error("[{section}] unknown key '{key}'")]
    UnknownKey { section: String, key: String },

    #[error("[{section}] {key}: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },

    #[error("unsupported format version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("configuration does not resolve: {0}")]
    Topology(#[from] TopologyError),
}

// ============================================================================
// SBIO: Pure encoding (no I/O)
// ============================================================================

/// Serialize a topology to configuration text.
pub fn encode(topology: &ClusterTopology) -> String {
    let settings = topology.settings();
    let mut doc = IniDocument::new();

    let master = doc.push_section(MASTER_SECTION);
    for spec in MASTER_KEYS {
        let value = if spec.name == FORMAT_VERSION_KEY {
            // Always written so older readers can refuse newer files.
            Some(FORMAT_VERSION.to_string())
        } else {
            master_value(settings, spec.name)
                .filter(|v| !v.is_empty())
                .filter(|v| Some(v) != spec.default_text().as_ref())
        };
        if let Some(value) = value {
            master.set(spec.name, value);
        }
    }

    doc.push_section(topology.vpc_id()).set(
        VPC_SUBNET_IDS_KEY,
        join_list(topology.all_subnets().iter().map(|s| s.id.as_str())),
    );

    for subnet in topology.all_subnets() {
        let section = doc.push_section(subnet.id.as_str());
        section.set(CIDR_BLOCK_KEY, subnet.cidr_block.to_string());
        section.set(AVAILABILITY_ZONE_KEY, subnet.availability_zone.as_str());
    }

    for (app, entries) in &settings.app_config {
        let section = doc.push_section(app.as_str());
        for (key, value) in entries {
            section.set(key.as_str(), value.as_str());
        }
    }

    doc.render()
}

/// Textual value of a master key for these settings; `None` when unset.
fn master_value(settings: &ClusterSettings, key: &str) -> Option<String> {
    let compute = &settings.compute;
    match key {
        "region" => settings.region.clone(),
        "slurm_s3_root" => settings.slurm_s3_root.clone(),
        "vpc_id" => settings.vpc_id.clone(),
        "instance_profile" => settings.instance_profile.clone(),
        "key_name" => settings.key_name.clone(),
        "security_groups" => Some(join_list(&settings.security_groups)),
        "controller_address" => Some(settings.controller.to_string()),
        "backup_controller_address" => match settings.backup_controller {
            AddressSelector::Disabled => None,
            other => Some(other.to_string()),
        },
        "controller_hostname" => Some(settings.controller_hostname.clone()),
        "backup_controller_hostname" => Some(settings.backup_controller_hostname.clone()),
        "node_hostname_prefix" => Some(settings.node_hostname_prefix.clone()),
        "reserved_addresses" => Some(settings.reserved_addresses.to_string()),
        "max_nodes" => settings.max_nodes.map(|n| n.to_string()),
        "compute_instance_type" => Some(compute.instance_type.clone()),
        "compute_ami" => compute.ami.clone(),
        "compute_bid_price" => compute.bid_price.clone(),
        "compute_os_packages" => Some(join_list(&compute.os_packages)),
        "compute_external_packages" => Some(join_list(&compute.external_packages)),
        "node_subnet_ids" => settings.node_subnet_ids.as_ref().map(join_list),
        _ => None,
    }
}

fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// SBIO: Pure decoding (no I/O)
// ============================================================================

/// Parse configuration text back into a topology.
pub fn decode(text: &str) -> Result<ClusterTopology, ConfigParseError> {
    let doc = IniDocument::parse(text)?;
    let master = doc
        .section(MASTER_SECTION)
        .ok_or_else(|| ConfigParseError::MissingSection(MASTER_SECTION.to_string()))?;

    let fields = MasterFields::read(master)?;
    let settings = fields.settings()?;

    let vpc_id = settings
        .vpc_id
        .clone()
        .ok_or_else(|| missing_key(MASTER_SECTION, "vpc_id"))?;
    let subnets = read_subnets(&doc, &vpc_id)?;
    let app_config = read_app_config(&doc, &vpc_id, &subnets);

    let settings = ClusterSettings {
        app_config,
        ..settings
    };
    Ok(ClusterTopology::resolve(settings, subnets)?)
}

/// Master section values with schema defaults applied
struct MasterFields<'a> {
    section: &'a IniSection,
}

impl<'a> MasterFields<'a> {
    fn read(section: &'a IniSection) -> Result<Self, ConfigParseError> {
        if let Some(unknown) = section.keys().find(|k| key_spec(k).is_none()) {
            return Err(ConfigParseError::UnknownKey {
                section: MASTER_SECTION.to_string(),
                key: unknown.to_string(),
            });
        }

        let fields = Self { section };
        let version = fields.int(FORMAT_VERSION_KEY)?.unwrap_or(FORMAT_VERSION);
        if version > FORMAT_VERSION {
            return Err(ConfigParseError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(fields)
    }

    /// Raw text of a key, falling back to its default when absent or empty.
    fn raw(&self, key: &str) -> Option<String> {
        self.section
            .get(key)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| key_spec(key).and_then(|spec| spec.default_text()))
    }

    fn scalar(&self, key: &str) -> Option<String> {
        self.raw(key)
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.raw(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
    }

    fn int(&self, key: &str) -> Result<Option<u32>, ConfigParseError> {
        self.raw(key)
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|e| invalid_value(MASTER_SECTION, key, e.to_string()))
            })
            .transpose()
    }

    fn selector(&self, key: &str) -> Result<AddressSelector, ConfigParseError> {
        match self.scalar(key) {
            None => Ok(AddressSelector::Disabled),
            Some(v) => v
                .parse()
                .map_err(|e: crate::topology::SelectorParseError| {
                    invalid_value(MASTER_SECTION, key, e.to_string())
                }),
        }
    }

    fn text_or_default(&self, key: &str) -> String {
        self.scalar(key).unwrap_or_default()
    }

    fn settings(&self) -> Result<ClusterSettings, ConfigParseError> {
        Ok(ClusterSettings {
            region: self.scalar("region"),
            slurm_s3_root: self.scalar("slurm_s3_root"),
            vpc_id: self.scalar("vpc_id"),
            instance_profile: self.scalar("instance_profile"),
            key_name: self.scalar("key_name"),
            security_groups: self.list("security_groups").unwrap_or_default(),
            node_subnet_ids: self.list("node_subnet_ids"),
            controller: self.selector("controller_address")?,
            backup_controller: self.selector("backup_controller_address")?,
            controller_hostname: self.text_or_default("controller_hostname"),
            backup_controller_hostname: self.text_or_default("backup_controller_hostname"),
            node_hostname_prefix: self.text_or_default("node_hostname_prefix"),
            reserved_addresses: self.int("reserved_addresses")?.unwrap_or_default(),
            max_nodes: self.int("max_nodes")?,
            compute: ComputeSettings {
                instance_type: self.text_or_default("compute_instance_type"),
                ami: self.scalar("compute_ami"),
                bid_price: self.scalar("compute_bid_price"),
                os_packages: self.list("compute_os_packages").unwrap_or_default(),
                external_packages: self.list("compute_external_packages").unwrap_or_default(),
            },
            app_config: AppConfig::new(),
        })
    }
}

/// Rebuild the VPC's subnets from their sections.
fn read_subnets(doc: &IniDocument, vpc_id: &str) -> Result<Vec<Subnet>, ConfigParseError> {
    let vpc = doc
        .section(vpc_id)
        .ok_or_else(|| ConfigParseError::MissingSection(vpc_id.to_string()))?;
    let subnet_ids = vpc
        .get(VPC_SUBNET_IDS_KEY)
        .ok_or_else(|| missing_key(vpc_id, VPC_SUBNET_IDS_KEY))?;

    subnet_ids
        .split_whitespace()
        .map(|id| {
            let section = doc
                .section(id)
                .ok_or_else(|| ConfigParseError::MissingSection(id.to_string()))?;
            let cidr = section
                .get(CIDR_BLOCK_KEY)
                .ok_or_else(|| missing_key(id, CIDR_BLOCK_KEY))?;
            let cidr: Ipv4Net = cidr
                .parse()
                .map_err(|e: ipnet::AddrParseError| invalid_value(id, CIDR_BLOCK_KEY, e.to_string()))?;
            let az = section
                .get(AVAILABILITY_ZONE_KEY)
                .filter(|az| !az.is_empty())
                .ok_or_else(|| missing_key(id, AVAILABILITY_ZONE_KEY))?;
            Ok(Subnet::new(id, vpc_id, cidr, az))
        })
        .collect()
}

/// Every section that is not topology metadata is application data.
fn read_app_config(doc: &IniDocument, vpc_id: &str, subnets: &[Subnet]) -> AppConfig {
    let mut app_config = AppConfig::new();
    for section in doc.sections() {
        let referenced = section.name == MASTER_SECTION
            || section.name == vpc_id
            || subnets.iter().any(|s| s.id == section.name);
        if referenced {
            continue;
        }
        if is_reserved_section_name(&section.name, vpc_id, subnets) {
            debug!("Skipping unreferenced metadata section [{}]", section.name);
            continue;
        }

        let entries: BTreeMap<String, String> = section
            .entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        app_config.insert(section.name.clone(), entries);
    }
    app_config
}

fn missing_key(section: &str, key: &str) -> ConfigParseError {
    ConfigParseError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid_value(section: &str, key: &str, message: String) -> ConfigParseError {
    ConfigParseError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{total_node_capacity, DEFAULT_RESERVED_ADDRESSES};
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn subnet(id: &str, cidr: &str, az: &str) -> Subnet {
        Subnet::new(id, "vpc-1", cidr.parse().unwrap(), az)
    }

    fn sample_topology() -> ClusterTopology {
        let mut settings = ClusterSettings {
            region: Some("us-west-2".to_string()),
            vpc_id: Some("vpc-1".to_string()),
            slurm_s3_root: Some("s3://bucket/slurm".to_string()),
            key_name: Some("ops".to_string()),
            security_groups: vec!["sg-1".to_string(), "sg-2".to_string()],
            backup_controller: AddressSelector::Auto,
            max_nodes: Some(100),
            ..Default::default()
        };
        settings.compute.os_packages = vec!["munge".to_string(), "slurm".to_string()];
        settings.app_config.insert(
            "myapp".to_string(),
            BTreeMap::from([
                ("zeta".to_string(), "last".to_string()),
                ("alpha".to_string(), "first value".to_string()),
            ]),
        );

        ClusterTopology::resolve(
            settings,
            vec![
                subnet("subnet-b", "10.0.1.0/24", "us-west-2b"),
                subnet("subnet-a", "10.0.0.0/24", "us-west-2a"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let text = encode(&sample_topology());
        let expected = "\
[slurm-ec2]
format_version=1
region=us-west-2
slurm_s3_root=s3://bucket/slurm
vpc_id=vpc-1
key_name=ops
security_groups=sg-1 sg-2
backup_controller_address=auto
max_nodes=100
compute_os_packages=munge slurm

[vpc-1]
subnet_ids=subnet-b subnet-a

[subnet-b]
cidr_block=10.0.1.0/24
availability_zone=us-west-2b

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=us-west-2a

[myapp]
alpha=first value
zeta=last
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_round_trip() {
        let topo = sample_topology();
        let decoded = decode(&encode(&topo)).unwrap();
        assert_eq!(decoded, topo);
        assert_eq!(encode(&decoded), encode(&topo));
    }

    #[test]
    fn test_round_trip_non_default_values() {
        let mut settings = ClusterSettings {
            vpc_id: Some("vpc-1".to_string()),
            controller: AddressSelector::Explicit(Ipv4Addr::new(10, 0, 1, 50)),
            backup_controller: AddressSelector::Explicit(Ipv4Addr::new(10, 0, 0, 50)),
            controller_hostname: "head".to_string(),
            backup_controller_hostname: "head2".to_string(),
            node_hostname_prefix: "c".to_string(),
            reserved_addresses: 0,
            node_subnet_ids: Some(vec!["subnet-a".to_string()]),
            ..Default::default()
        };
        settings.compute.instance_type = "r3.large".to_string();
        settings.compute.bid_price = Some("0.25".to_string());

        let topo = ClusterTopology::resolve(
            settings,
            vec![
                subnet("subnet-a", "10.0.0.0/24", "a"),
                subnet("subnet-b", "10.0.1.0/24", "b"),
            ],
        )
        .unwrap();

        let text = encode(&topo);
        assert!(text.contains("reserved_addresses=0\n"));
        assert!(text.contains("controller_address=10.0.1.50\n"));
        assert!(text.contains("node_subnet_ids=subnet-a\n"));

        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, topo);
        assert_eq!(decoded.node_addresses()[0], Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_decode_applies_defaults() {
        let text = "\
[slurm-ec2]
vpc_id=vpc-1

[vpc-1]
subnet_ids=subnet-a

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=us-west-2a
";
        let topo = decode(text).unwrap();
        let settings = topo.settings();
        assert_eq!(settings.controller_hostname, "controller");
        assert_eq!(settings.node_hostname_prefix, "node-");
        assert_eq!(settings.reserved_addresses, 8);
        assert_eq!(settings.compute.instance_type, "c3.8xlarge");
        assert_eq!(settings.controller, AddressSelector::Auto);
        assert_eq!(settings.backup_controller, AddressSelector::Disabled);
        assert_eq!(topo.controller_address(), Ipv4Addr::new(10, 0, 0, 4));
        assert_eq!(topo.node_addresses().len(), 242);
    }

    #[test]
    fn test_decode_skips_metadata_sections() {
        let text = "\
[slurm-ec2]
vpc_id=vpc-1

[vpc-1]
subnet_ids=subnet-a

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=a

[subnet-stale]
cidr_block=10.9.0.0/24
availability_zone=b

[vpc-old]
subnet_ids=subnet-stale

[munge]
key_path=/etc/munge/munge.key
";
        let topo = decode(text).unwrap();
        let apps: Vec<_> = topo.settings().app_config.keys().cloned().collect();
        assert_eq!(apps, vec!["munge"]);
        assert_eq!(topo.all_subnets().len(), 1);
    }

    #[test]
    fn test_decode_errors_name_the_offender() {
        let base = "[vpc-1]\nsubnet_ids=subnet-a\n\n[subnet-a]\ncidr_block=10.0.0.0/24\navailability_zone=a\n";

        let err = decode(&format!("[slurm-ec2]\nvpc_id=vpc-1\nmax_nodes=lots\n\n{}", base))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigParseError::InvalidValue { ref key, .. } if key == "max_nodes"
        ));

        let err = decode(&format!("[slurm-ec2]\nvpc_id=vpc-1\ncolour=blue\n\n{}", base))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigParseError::UnknownKey {
                section: "slurm-ec2".to_string(),
                key: "colour".to_string()
            }
        );

        let err = decode(&format!("[slurm-ec2]\n\n{}", base)).unwrap_err();
        assert_eq!(
            err,
            ConfigParseError::MissingKey {
                section: "slurm-ec2".to_string(),
                key: "vpc_id".to_string()
            }
        );

        let err = decode(
            "[slurm-ec2]\nvpc_id=vpc-1\n\n[vpc-1]\nsubnet_ids=subnet-a\n\n[subnet-a]\ncidr_block=10.0.0/33\navailability_zone=a\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigParseError::InvalidValue { ref section, ref key, .. }
                if section == "subnet-a" && key == "cidr_block"
        ));

        let err = decode("[slurm-ec2]\nvpc_id=vpc-1\n").unwrap_err();
        assert_eq!(err, ConfigParseError::MissingSection("vpc-1".to_string()));

        let err = decode("[other]\nx=1\n").unwrap_err();
        assert_eq!(err, ConfigParseError::MissingSection("slurm-ec2".to_string()));

        let err = decode(&format!(
            "[slurm-ec2]\nvpc_id=vpc-1\ncontroller_address=nowhere\n\n{}",
            base
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigParseError::InvalidValue { ref key, .. } if key == "controller_address"
        ));
    }

    #[test]
    fn test_decode_rejects_newer_format() {
        let err = decode("[slurm-ec2]\nformat_version=2\nvpc_id=vpc-1\n").unwrap_err();
        assert_eq!(
            err,
            ConfigParseError::UnsupportedVersion {
                found: 2,
                supported: 1
            }
        );
    }

    #[test]
    fn test_decode_reports_unresolvable_topology() {
        let text = "\
[slurm-ec2]
vpc_id=vpc-1
controller_address=disabled

[vpc-1]
subnet_ids=subnet-a

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=a
";
        assert_eq!(
            decode(text).unwrap_err(),
            ConfigParseError::Topology(TopologyError::ControllerRequired)
        );
    }

    #[test]
    fn test_empty_selectors_mean_their_defaults() {
        let text = "\
[slurm-ec2]
vpc_id=vpc-1
controller_address=
backup_controller_address=

[vpc-1]
subnet_ids=subnet-a subnet-b

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=a

[subnet-b]
cidr_block=10.0.1.0/24
availability_zone=b
";
        let topo = decode(text).unwrap();
        assert_eq!(topo.settings().controller, AddressSelector::Auto);
        assert_eq!(topo.settings().backup_controller, AddressSelector::Disabled);
        assert_eq!(topo.backup_controller_address(), None);
    }

    #[test]
    fn test_unencodable_settings_never_resolve() {
        let subnets = || vec![subnet("subnet-a", "10.0.0.0/24", "a")];
        let base = || ClusterSettings {
            vpc_id: Some("vpc-1".to_string()),
            ..Default::default()
        };

        let mut empty_prefix = base();
        empty_prefix.node_hostname_prefix = String::new();
        let mut empty_controller = base();
        empty_controller.controller_hostname = String::new();
        let mut empty_instance_type = base();
        empty_instance_type.compute.instance_type = String::new();
        let mut injected = base();
        injected.slurm_s3_root = Some("s3://b\nmax_nodes=1".to_string());
        let mut spaced_group = base();
        spaced_group.security_groups = vec!["sg 1".to_string()];
        let mut padded_section = base();
        padded_section.app_config.insert(
            " myapp".to_string(),
            BTreeMap::from([("k".to_string(), "v".to_string())]),
        );

        for settings in [
            empty_prefix,
            empty_controller,
            empty_instance_type,
            injected,
            spaced_group,
            padded_section,
        ] {
            let described = format!("{:?}", settings);
            assert!(
                ClusterTopology::resolve(settings, subnets()).is_err(),
                "resolved {}",
                described
            );
        }
    }

    /// Deterministic linear congruential generator for generated layouts
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) as u32
        }

        fn below(&mut self, n: u32) -> u32 {
            self.next() % n
        }

        fn chance(&mut self, percent: u32) -> bool {
            self.below(100) < percent
        }
    }

    fn generated_subnets(rng: &mut Lcg) -> Vec<Subnet> {
        let zones = ["us-west-2a", "us-west-2b", "us-west-2c"];
        let zone_count = 1 + rng.below(3) as usize;
        let count = 1 + rng.below(4) as usize;

        let mut subnets: Vec<Subnet> = Vec::with_capacity(count);
        for i in 0..count {
            let prefix = 16 + rng.below(15) as u8;
            let cidr = if !subnets.is_empty() && rng.chance(40) {
                // Reuse a network, either verbatim or under another prefix
                let other = subnets[rng.below(subnets.len() as u32) as usize].cidr_block;
                if rng.chance(50) {
                    other
                } else {
                    Ipv4Net::new(other.network(), prefix).unwrap().trunc()
                }
            } else {
                let addr = Ipv4Addr::from((10 << 24) | (rng.below(1 << 16) << 8));
                Ipv4Net::new(addr, prefix).unwrap().trunc()
            };
            let zone = zones[rng.below(zone_count as u32) as usize];
            subnets.push(Subnet::new(format!("subnet-g{}", i), "vpc-1", cidr, zone));
        }
        subnets
    }

    fn generated_selector(rng: &mut Lcg, subnets: &[Subnet]) -> AddressSelector {
        match rng.below(4) {
            0 => AddressSelector::Auto,
            1 => AddressSelector::Disabled,
            2 => {
                let subnet = &subnets[rng.below(subnets.len() as u32) as usize];
                AddressSelector::Explicit(subnet.controller_slot())
            }
            _ => AddressSelector::Explicit(Ipv4Addr::from((10 << 24) | rng.below(1 << 24))),
        }
    }

    fn generated_settings(rng: &mut Lcg, subnets: &[Subnet]) -> ClusterSettings {
        let mut settings = ClusterSettings {
            vpc_id: Some("vpc-1".to_string()),
            controller: generated_selector(rng, subnets),
            backup_controller: generated_selector(rng, subnets),
            ..Default::default()
        };
        if rng.chance(30) {
            let ids = subnets
                .iter()
                .filter(|_| rng.chance(60))
                .map(|s| s.id.clone())
                .collect::<Vec<_>>();
            if !ids.is_empty() {
                settings.node_subnet_ids = Some(ids);
            }
        }

        let node_subnets: Vec<Subnet> = match &settings.node_subnet_ids {
            Some(ids) => subnets.iter().filter(|s| ids.contains(&s.id)).cloned().collect(),
            None => subnets.to_vec(),
        };
        let capacity_at = |reserved: u32| total_node_capacity(&node_subnets, reserved) as u32;

        settings.reserved_addresses = match rng.below(4) {
            0 => 0,
            1 => 1,
            2 => DEFAULT_RESERVED_ADDRESSES,
            _ => 1 + capacity_at(0),
        };
        let capacity = capacity_at(settings.reserved_addresses);
        settings.max_nodes = match rng.below(5) {
            0 => None,
            1 => Some(0),
            2 => Some(1),
            3 => Some(capacity.saturating_add(1)),
            _ => Some(rng.below(capacity.max(1))),
        };
        if rng.chance(25) {
            settings.node_hostname_prefix = "c".to_string();
        }
        settings
    }

    #[test]
    fn test_generated_layouts_round_trip() {
        let mut rng = Lcg(0x5eed);
        let mut resolved = 0;

        for _ in 0..200 {
            let subnets = generated_subnets(&mut rng);
            let settings = generated_settings(&mut rng, &subnets);
            let described = format!("{:?} over {:?}", settings, subnets);

            let topo = match ClusterTopology::resolve(settings, subnets) {
                Ok(topo) => topo,
                Err(TopologyError::ControllerRequired)
                | Err(TopologyError::ControllerOutsideInventory) => continue,
                Err(e) => panic!("unexpected {:?} for {}", e, described),
            };
            resolved += 1;

            let settings = topo.settings();
            let nodes = topo.node_addresses();
            if let Some(max) = settings.max_nodes {
                assert!(nodes.len() <= max as usize, "{}", described);
            }
            let capacity = total_node_capacity(topo.node_subnets(), settings.reserved_addresses);
            assert!(nodes.len() <= capacity, "{}", described);
            let unique: HashSet<_> = nodes.iter().collect();
            assert_eq!(unique.len(), nodes.len(), "{}", described);

            let decoded = decode(&encode(&topo)).unwrap();
            assert_eq!(decoded, topo, "{}", described);
        }

        assert!(resolved > 50, "only {} layouts resolved", resolved);
    }
}
