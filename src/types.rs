//! Type definitions and aliases

use std::fmt;
use std::net::IpAddr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Network address family measured by one half of a dual-stack run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NetworkFamily {
    V4,
    V6,
}

impl NetworkFamily {
    /// Human-readable family name, also used as the result type tag
    pub fn name(&self) -> &'static str {
        match self {
            NetworkFamily::V4 => "IPv4",
            NetworkFamily::V6 => "IPv6",
        }
    }

    /// Server list `typeName` that belongs to this family
    pub fn type_name(&self) -> &'static str {
        match self {
            NetworkFamily::V4 => "ipv4",
            NetworkFamily::V6 => "ipv6",
        }
    }

    /// Check whether an address belongs to this family
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            NetworkFamily::V4 => addr.is_ipv4(),
            NetworkFamily::V6 => addr.is_ipv6(),
        }
    }

    /// The other family
    pub fn other(&self) -> NetworkFamily {
        match self {
            NetworkFamily::V4 => NetworkFamily::V6,
            NetworkFamily::V6 => NetworkFamily::V4,
        }
    }

    /// Families in measurement order for the given preference
    pub fn ordered(prefer_ipv6: bool) -> [NetworkFamily; 2] {
        if prefer_ipv6 {
            [NetworkFamily::V6, NetworkFamily::V4]
        } else {
            [NetworkFamily::V4, NetworkFamily::V6]
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where outgoing measurement traffic is bound. Address and interface
/// binding are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceBinding {
    /// Bind sockets to a local address
    Address(IpAddr),
    /// Bind sockets to a named network interface
    Interface(String),
}

impl SourceBinding {
    /// Build the binding from the two optional config values
    pub fn from_options(source: Option<&str>, interface: Option<&str>) -> Result<Option<Self>> {
        match (source, interface) {
            (Some(_), Some(_)) => Err(AppError::config(
                "incompatible options 'source' and 'interface'",
            )),
            (Some(addr), None) => {
                let addr: IpAddr = addr
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid source address '{}': {}", addr, e)))?;
                Ok(Some(SourceBinding::Address(addr)))
            }
            (None, Some(name)) => Ok(Some(SourceBinding::Interface(name.to_string()))),
            (None, None) => Ok(None),
        }
    }

    /// Address to hand to tools that take a source argument
    pub fn as_ping_source(&self) -> String {
        match self {
            SourceBinding::Address(addr) => addr.to_string(),
            SourceBinding::Interface(name) => name.clone(),
        }
    }
}

/// Which families a run is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FamilyRestriction {
    #[default]
    Both,
    Only(NetworkFamily),
}

impl FamilyRestriction {
    /// Build from the force-IPv4 / force-IPv6 flags
    pub fn from_flags(force_ipv4: bool, force_ipv6: bool) -> Result<Self> {
        match (force_ipv4, force_ipv6) {
            (true, true) => Err(AppError::config("IPv4 and IPv6 cannot both be forced")),
            (true, false) => Ok(FamilyRestriction::Only(NetworkFamily::V4)),
            (false, true) => Ok(FamilyRestriction::Only(NetworkFamily::V6)),
            (false, false) => Ok(FamilyRestriction::Both),
        }
    }

    /// Whether the given family may be measured
    pub fn allows(&self, family: NetworkFamily) -> bool {
        match self {
            FamilyRestriction::Both => true,
            FamilyRestriction::Only(only) => *only == family,
        }
    }
}
