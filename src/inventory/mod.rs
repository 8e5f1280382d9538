//! Where subnets and instance facts come from.

pub mod file;

pub use file::{parse_subnets, FileInventory};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::InventoryContext;
use crate::topology::{ClusterSettings, ClusterTopology, Subnet, TopologyError};

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read inventory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse inventory: {0}")]
    Parse(String),

    #[error("Subnet {subnet} has an invalid CIDR block '{value}'")]
    InvalidCidr { subnet: String, value: String },

    #[error("No instance context available")]
    NoContext,

    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unresolvable inventory: {0}")]
    UnresolvableInventory(#[from] InventoryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Subnets of a VPC, in the provider's listing order
    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, InventoryError>;

    /// Facts about the instance this runs on
    async fn current_instance_context(&self) -> Result<InventoryContext, InventoryError>;
}

/// Fill unset settings from the provider's instance context, list the VPC's
/// subnets and resolve the topology.
///
/// A missing instance context is not fatal; settings that stay unset fail
/// resolution on their own if they are required.
pub async fn resolve_topology(
    provider: &dyn InventoryProvider,
    settings: ClusterSettings,
) -> Result<ClusterTopology, ResolveError> {
    let settings = if settings.needs_context() {
        match provider.current_instance_context().await {
            Ok(ctx) => {
                debug!("Filling unset settings from instance context");
                settings.with_context_defaults(&ctx)
            }
            Err(e) => {
                warn!("Instance context unavailable, using settings as given: {}", e);
                settings
            }
        }
    } else {
        settings
    };

    let vpc_id = settings.vpc_id.clone().ok_or(TopologyError::MissingVpcId)?;
    let subnets = provider.list_subnets(&vpc_id).await?;
    info!("Found {} subnets in {}", subnets.len(), vpc_id);

    Ok(ClusterTopology::resolve(settings, subnets)?)
}

// ============================================================================
// SBIO: Mock implementation for testing (no I/O)
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub struct MockInventory {
        subnets: Vec<Subnet>,
        context: Option<InventoryContext>,
        fail_listing: bool,
        context_calls: Arc<AtomicUsize>,
    }

    impl MockInventory {
        pub fn new(subnets: Vec<Subnet>) -> Self {
            Self {
                subnets,
                context: None,
                fail_listing: false,
                context_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_context(mut self, context: InventoryContext) -> Self {
            self.context = Some(context);
            self
        }

        pub fn unreachable() -> Self {
            let mut mock = Self::new(Vec::new());
            mock.fail_listing = true;
            mock
        }

        pub fn context_calls(&self) -> usize {
            self.context_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InventoryProvider for MockInventory {
        async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, InventoryError> {
            if self.fail_listing {
                return Err(InventoryError::Unavailable("mock endpoint down".to_string()));
            }
            Ok(self
                .subnets
                .iter()
                .filter(|s| s.vpc_id == vpc_id)
                .cloned()
                .collect())
        }

        async fn current_instance_context(&self) -> Result<InventoryContext, InventoryError> {
            self.context_calls.fetch_add(1, Ordering::SeqCst);
            self.context.clone().ok_or(InventoryError::NoContext)
        }
    }
}
