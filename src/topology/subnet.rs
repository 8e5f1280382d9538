//! Subnet records and the CIDR arithmetic used for address placement.

use std::cmp::Ordering;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Offset of the controller slot inside a subnet.
///
/// EC2 reserves the network address and the three addresses after it, so
/// `network + 4` is the lowest address an instance can hold.
pub const CONTROLLER_OFFSET: u32 = 4;

/// Offset of the first address eligible for compute nodes. The controller
/// slot is skipped in every subnet, whether or not a controller lives there.
pub const FIRST_NODE_OFFSET: u32 = CONTROLLER_OFFSET + 1;

/// A VPC subnet as reported by the inventory or reconstructed from a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub vpc_id: String,
    pub cidr_block: Ipv4Net,
    pub availability_zone: String,
}

impl Subnet {
    pub fn new(
        id: impl Into<String>,
        vpc_id: impl Into<String>,
        cidr_block: Ipv4Net,
        availability_zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vpc_id: vpc_id.into(),
            cidr_block,
            availability_zone: availability_zone.into(),
        }
    }

    /// Network (base) address of the CIDR block
    pub fn network(&self) -> Ipv4Addr {
        self.cidr_block.network()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.cidr_block.contains(&addr)
    }

    /// Whether the two subnets share at least one address
    pub fn overlaps(&self, other: &Subnet) -> bool {
        self.cidr_block.contains(&other.cidr_block.network())
            || other.cidr_block.contains(&self.cidr_block.network())
    }

    /// The fixed controller slot of this subnet (`network + 4`).
    pub fn controller_slot(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network()).saturating_add(CONTROLLER_OFFSET))
    }

    /// Inclusive range of node-eligible addresses once `reserved` addresses
    /// have been set aside, or `None` if nothing is left.
    fn node_range(&self, reserved: u32) -> Option<(u32, u32)> {
        let network = u32::from(self.cidr_block.network());
        let broadcast = u32::from(self.cidr_block.broadcast());

        let first = network
            .checked_add(FIRST_NODE_OFFSET)?
            .checked_add(reserved)?;
        let last = broadcast.checked_sub(1)?;

        (first <= last).then_some((first, last))
    }

    /// Number of node addresses this subnet can supply
    pub fn node_capacity(&self, reserved: u32) -> u32 {
        self.node_range(reserved)
            .map(|(first, last)| last - first + 1)
            .unwrap_or(0)
    }

    /// The `index`-th node address of this subnet, if it has that many.
    pub fn node_address(&self, reserved: u32, index: u32) -> Option<Ipv4Addr> {
        let (first, last) = self.node_range(reserved)?;
        let addr = first.checked_add(index)?;
        (addr <= last).then(|| Ipv4Addr::from(addr))
    }

    fn sort_key(&self) -> (u32, u8, &str) {
        (
            u32::from(self.cidr_block.network()),
            self.cidr_block.prefix_len(),
            self.id.as_str(),
        )
    }
}

/// Total order on subnets: network address, then prefix length, then id.
pub fn cmp_by_cidr(a: &Subnet, b: &Subnet) -> Ordering {
    a.sort_key().cmp(&b.sort_key())
}

/// The subnet with the lowest CIDR under [`cmp_by_cidr`].
pub fn min_by_cidr<'a, I>(subnets: I) -> Option<&'a Subnet>
where
    I: IntoIterator<Item = &'a Subnet>,
{
    subnets.into_iter().min_by(|a, b| cmp_by_cidr(a, b))
}

/// EC2's internal DNS name for an address (`10.0.0.4` -> `ip-10-0-0-4`).
pub fn hostname_for_address(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("ip-{}-{}-{}-{}", a, b, c, d)
}
