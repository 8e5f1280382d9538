pub mod codec;
pub mod ini;
pub mod schema;

pub use codec::{decode, encode, ConfigParseError};
pub use ini::{IniDocument, IniSection};
pub use schema::{key_spec, KeyKind, KeySpec, FORMAT_VERSION, MASTER_KEYS, MASTER_SECTION};

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::topology::ClusterTopology;

/// Where nodes keep their copy of the cluster configuration
pub const DEFAULT_CONFIG_PATH: &str = "/etc/slurm-ec2.conf";

/// Errors for file I/O operations (separate from pure parsing errors)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ParseError(#[from] ConfigParseError),
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load a topology from a configuration file.
/// This is the I/O boundary - it reads the file and delegates to [`decode`].
pub fn load_topology_file(path: &Path) -> Result<ClusterTopology, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let topology = decode(&content)?;
    debug!(
        "Loaded topology for {} from {}",
        topology.vpc_id(),
        path.display()
    );
    Ok(topology)
}

/// Write a topology to a configuration file, creating parent directories.
pub fn save_topology_file(topology: &ClusterTopology, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, encode(topology))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ClusterSettings, Subnet};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_topology_file() {
        let content = "\
[slurm-ec2]
vpc_id=vpc-1

[vpc-1]
subnet_ids=subnet-a

[subnet-a]
cidr_block=10.0.0.0/24
availability_zone=us-east-1a
";
        let file = create_temp_file(content);
        let topology = load_topology_file(file.path()).unwrap();
        assert_eq!(topology.vpc_id(), "vpc-1");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_topology_file(Path::new("/nonexistent/slurm-ec2.conf"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let file = create_temp_file("not an ini file\n");
        let result = load_topology_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_save_then_load() {
        let settings = ClusterSettings {
            vpc_id: Some("vpc-1".to_string()),
            ..Default::default()
        };
        let subnets = vec![Subnet::new(
            "subnet-a",
            "vpc-1",
            "10.0.0.0/24".parse().unwrap(),
            "us-east-1a",
        )];
        let topology = ClusterTopology::resolve(settings, subnets).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etc").join("slurm-ec2.conf");
        save_topology_file(&topology, &path).unwrap();

        assert_eq!(load_topology_file(&path).unwrap(), topology);
    }
}
