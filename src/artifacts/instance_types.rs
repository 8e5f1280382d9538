//! Static resource table for supported EC2 instance types.

/// CPU/memory layout and local storage of an instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceResources {
    pub cores_per_socket: u32,
    /// `None` when the type exposes one thread per core
    pub threads_per_core: Option<u32>,
    pub real_memory_mb: u32,
    /// Burstable (CPU credit) instance
    pub burstable: bool,
    /// Sizes in GB of the instance-store volumes
    pub ephemeral_stores_gb: &'static [u32],
}

impl InstanceResources {
    const fn new(
        cores_per_socket: u32,
        threads_per_core: Option<u32>,
        real_memory_mb: u32,
        ephemeral_stores_gb: &'static [u32],
    ) -> Self {
        Self {
            cores_per_socket,
            threads_per_core,
            real_memory_mb,
            burstable: false,
            ephemeral_stores_gb,
        }
    }

    const fn burst(cores_per_socket: u32, real_memory_mb: u32) -> Self {
        Self {
            cores_per_socket,
            threads_per_core: None,
            real_memory_mb,
            burstable: true,
            ephemeral_stores_gb: &[],
        }
    }

    /// SLURM node attributes, e.g. `CoresPerSocket=2 ThreadsPerCore=2 RealMemory=7680`
    pub fn slurm_attributes(&self) -> String {
        let mut attrs = vec![format!("CoresPerSocket={}", self.cores_per_socket)];
        if let Some(threads) = self.threads_per_core {
            attrs.push(format!("ThreadsPerCore={}", threads));
        }
        attrs.push(format!("RealMemory={}", self.real_memory_mb));
        attrs.join(" ")
    }

    /// SLURM feature tags beyond the `cloud` tag every node carries
    pub fn feature_tags(&self) -> Vec<&'static str> {
        if self.burstable {
            vec!["burst"]
        } else {
            Vec::new()
        }
    }
}

const HT: Option<u32> = Some(2);

static INSTANCE_TYPES: &[(&str, InstanceResources)] = &[
    ("t2.micro", InstanceResources::burst(1, 1024)),
    ("t2.small", InstanceResources::burst(1, 2048)),
    ("t2.medium", InstanceResources::burst(2, 4096)),
    ("m3.medium", InstanceResources::new(1, None, 3840, &[4])),
    ("m3.large", InstanceResources::new(1, HT, 7680, &[32])),
    ("m3.xlarge", InstanceResources::new(2, HT, 15360, &[40, 40])),
    ("m3.2xlarge", InstanceResources::new(4, HT, 30720, &[80, 80])),
    ("c3.large", InstanceResources::new(1, HT, 3840, &[16, 16])),
    ("c3.xlarge", InstanceResources::new(2, HT, 7680, &[40, 40])),
    ("c3.2xlarge", InstanceResources::new(4, HT, 15360, &[80, 80])),
    ("c3.4xlarge", InstanceResources::new(8, HT, 30720, &[160, 160])),
    ("c3.8xlarge", InstanceResources::new(16, HT, 61440, &[320, 320])),
    ("r3.large", InstanceResources::new(1, HT, 15616, &[32])),
    ("r3.xlarge", InstanceResources::new(2, HT, 31232, &[80])),
    ("r3.2xlarge", InstanceResources::new(4, HT, 62464, &[160])),
    ("r3.4xlarge", InstanceResources::new(8, HT, 124928, &[320])),
    ("r3.8xlarge", InstanceResources::new(16, HT, 249856, &[320, 320])),
    ("g2.2xlarge", InstanceResources::new(4, HT, 15360, &[60])),
    ("i2.xlarge", InstanceResources::new(2, HT, 31232, &[800])),
    ("i2.2xlarge", InstanceResources::new(4, HT, 62464, &[800; 2])),
    ("i2.4xlarge", InstanceResources::new(8, HT, 124928, &[800; 4])),
    ("i2.8xlarge", InstanceResources::new(16, HT, 249856, &[800; 8])),
    ("hs1.8xlarge", InstanceResources::new(8, HT, 119808, &[2000; 24])),
];

/// Resources for an instance type, if it is in the table
pub fn lookup(instance_type: &str) -> Option<&'static InstanceResources> {
    INSTANCE_TYPES
        .iter()
        .find(|(name, _)| *name == instance_type)
        .map(|(_, resources)| resources)
}

/// Every instance type in the table
pub fn known_instance_types() -> impl Iterator<Item = &'static str> {
    INSTANCE_TYPES.iter().map(|(name, _)| *name)
}
