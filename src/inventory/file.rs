use std::path::PathBuf;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::Deserialize;
use tracing::debug;

use super::{InventoryError, InventoryProvider};
use crate::context::InventoryContext;
use crate::topology::Subnet;

// ============================================================================
// Data structures (pure, no I/O)
// ============================================================================

/// `aws ec2 describe-subnets` output
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnetsOutput {
    #[serde(default)]
    subnets: Vec<SubnetRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetRecord {
    subnet_id: String,
    vpc_id: String,
    cidr_block: String,
    availability_zone: String,
}

// ============================================================================
// SBIO: Pure parsing (no I/O)
// ============================================================================

/// Parse describe-subnets JSON into subnets, in document order.
pub fn parse_subnets(json: &str) -> Result<Vec<Subnet>, InventoryError> {
    let output: DescribeSubnetsOutput =
        serde_json::from_str(json).map_err(|e| InventoryError::Parse(e.to_string()))?;

    output
        .subnets
        .into_iter()
        .map(|record| {
            let cidr: Ipv4Net =
                record
                    .cidr_block
                    .parse()
                    .map_err(|_| InventoryError::InvalidCidr {
                        subnet: record.subnet_id.clone(),
                        value: record.cidr_block.clone(),
                    })?;
            Ok(Subnet::new(
                record.subnet_id,
                record.vpc_id,
                cidr.trunc(),
                record.availability_zone,
            ))
        })
        .collect()
}

// ============================================================================
// SBIO: I/O implementation (reads a JSON dump from disk)
// ============================================================================

/// Inventory backed by a saved describe-subnets dump, with an optional
/// instance context loaded separately.
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
    context: Option<InventoryContext>,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: InventoryContext) -> Self {
        self.context = Some(context);
        self
    }
}

#[async_trait]
impl InventoryProvider for FileInventory {
    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, InventoryError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let subnets: Vec<Subnet> = parse_subnets(&content)?
            .into_iter()
            .filter(|s| s.vpc_id == vpc_id)
            .collect();
        debug!(
            "Read {} subnets of {} from {}",
            subnets.len(),
            vpc_id,
            self.path.display()
        );
        Ok(subnets)
    }

    async fn current_instance_context(&self) -> Result<InventoryContext, InventoryError> {
        self.context.clone().ok_or(InventoryError::NoContext)
    }
}
