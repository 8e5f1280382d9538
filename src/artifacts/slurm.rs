use tracing::debug;

use super::instance_types;
use super::ArtifactError;
use crate::topology::ClusterTopology;

pub const SUSPEND_PROGRAM: &str = "/usr/bin/slurm-ec2-suspend";
pub const RESUME_PROGRAM: &str = "/usr/bin/slurm-ec2-resume";

const CLUSTER_NAME: &str = "cluster";

const SLURM_BODY: &str = "\
AuthType=auth/munge
CacheGroups=0
CryptoType=crypto/munge
ReturnToService=1
SlurmctldPidFile=/var/run/slurmctld.pid
SlurmctldPort=6817
SlurmdPidFile=/var/run/slurmd.pid
SlurmdPort=6818
SlurmdSpoolDir=/var/slurm/spool
SlurmUser=slurm
StateSaveLocation=/var/slurm/state
SwitchType=switch/none
TaskPlugin=task/none

# TIMERS
InactiveLimit=0
KillWait=30
MinJobAge=300
SlurmctldTimeout=120
SlurmdTimeout=300
Waittime=0

# SCHEDULING
FastSchedule=1
SchedulerType=sched/backfill
SchedulerPort=7321
SelectType=select/linear
SuspendTime=600
TreeWidth=65535

# LOGGING AND ACCOUNTING
AccountingStorageType=accounting_storage/none
AccountingStoreJobComment=YES
JobCompType=jobcomp/none
JobAcctGatherFrequency=30
JobAcctGatherType=jobacct_gather/none
SlurmctldLogFile=/var/log/slurm/slurmctld.log
SlurmctldDebug=3
SlurmdLogFile=/var/log/slurm/slurmd.log
SlurmdDebug=3
";

/// The `NodeName=` line describing every compute node.
///
/// Unknown instance types get no resource attributes, leaving SLURM to
/// probe the node when it registers.
pub fn node_definition(prefix: &str, max_node_index: usize, instance_type: &str) -> String {
    let resources = instance_types::lookup(instance_type);

    let mut features = vec!["cloud"];
    if let Some(r) = resources {
        features.extend(r.feature_tags());
    }

    let mut line = format!("NodeName={}[0-{}] Weight=1", prefix, max_node_index);
    if let Some(r) = resources {
        line.push(' ');
        line.push_str(&r.slurm_attributes());
    }
    line.push_str(&format!(" Feature={} State=CLOUD", features.join(",")));
    line
}

/// Render `slurm.conf` for a resolved topology.
pub fn slurm_configuration(topology: &ClusterTopology) -> Result<String, ArtifactError> {
    let node_count = topology.node_addresses().len();
    if node_count == 0 {
        return Err(ArtifactError::NoNodeAddresses);
    }
    let max_node_index = node_count - 1;
    let prefix = topology.node_hostname_prefix();
    let instance_type = &topology.settings().compute.instance_type;

    let mut out = String::new();
    out.push_str(&format!("ControlMachine={}\n", topology.controller_hostname()));
    out.push_str(&format!("ControlAddr={}\n", topology.controller_address()));
    if let Some(backup) = topology.backup_controller_address() {
        out.push_str(&format!(
            "BackupController={}\n",
            topology.backup_controller_hostname()
        ));
        out.push_str(&format!("BackupAddr={}\n", backup));
    }
    out.push_str(&format!("ClusterName={}\n", CLUSTER_NAME));
    out.push_str(&format!("SuspendProgram={}\n", SUSPEND_PROGRAM));
    out.push_str(&format!("ResumeProgram={}\n", RESUME_PROGRAM));
    out.push_str(SLURM_BODY);
    out.push_str("\n# COMPUTE NODES\n");
    out.push_str(&node_definition(prefix, max_node_index, instance_type));
    out.push('\n');
    out.push_str(&format!(
        "PartitionName={} Nodes={}[0-{}] Default=yes\n",
        CLUSTER_NAME, prefix, max_node_index
    ));

    debug!(
        "Rendered slurm.conf with {} nodes of type {}",
        node_count, instance_type
    );
    Ok(out)
}
