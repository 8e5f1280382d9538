use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// How a controller address is chosen.
///
/// An empty string is not a selector. In a configuration file an empty
/// value stands for the key's default, which is `auto` for the controller
/// and `disabled` for the backup controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSelector {
    /// Use exactly this address
    Explicit(Ipv4Addr),
    /// Derive the address from the subnet layout
    Auto,
    /// No address (only meaningful for the backup controller)
    Disabled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid address selector '{0}': expected an IPv4 address, 'auto' or 'disabled'")]
pub struct SelectorParseError(pub String);

impl FromStr for AddressSelector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(AddressSelector::Auto);
        }
        if trimmed.eq_ignore_ascii_case("disabled") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(AddressSelector::Disabled);
        }
        trimmed
            .parse::<Ipv4Addr>()
            .map(AddressSelector::Explicit)
            .map_err(|_| SelectorParseError(s.to_string()))
    }
}

impl fmt::Display for AddressSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSelector::Explicit(addr) => write!(f, "{}", addr),
            AddressSelector::Auto => f.write_str("auto"),
            AddressSelector::Disabled => f.write_str("disabled"),
        }
    }
}

impl Serialize for AddressSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
