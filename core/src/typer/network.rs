//! IP network values (`10.0.0.0/8`, `192.168.1.7`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::ValueError;

use super::{ValueParser, first};

/// An IP network: a masked base address and a prefix length.
///
/// Parsing masks the host bits, so `192.168.1.7/24` becomes
/// `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    network: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    /// Creates a network, masking host bits of `addr`.
    ///
    /// Returns `None` if `prefix` exceeds the address width.
    pub fn new(addr: IpAddr, prefix: u8) -> Option<Self> {
        let network = match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return None;
                }
                let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return None;
                }
                let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        };
        Some(Self { network, prefix })
    }

    /// The masked base address.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// The prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    /// Returns `true` if `addr` lies inside this network.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match IpNetwork::new(addr, self.prefix) {
            Some(other) => other.network == self.network,
            None => false,
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for IpNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length in {s:?}"))?;
        let addr: IpAddr = addr.parse().map_err(|e| format!("{e}"))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("invalid prefix length {prefix:?}"))?;
        IpNetwork::new(addr, prefix).ok_or_else(|| format!("prefix length {prefix} out of range"))
    }
}

/// Parses an [`IpNetwork`]. A bare address gets a `/32` mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct Network;

impl ValueParser for Network {
    type Value = IpNetwork;

    fn parse(&self, tokens: &[String]) -> Result<IpNetwork, ValueError> {
        let token = first(tokens)?;
        let cidr = if token.contains('/') {
            token.to_string()
        } else {
            format!("{token}/32")
        };
        cidr.parse().map_err(|reason| ValueError::Invalid {
            value: token.to_string(),
            reason,
        })
    }
}
