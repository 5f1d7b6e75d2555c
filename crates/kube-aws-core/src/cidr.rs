//! IPv4 CIDR blocks and the containment/overlap arithmetic used to place a
//! cluster inside an existing VPC.
//!
//! A [`CidrBlock`] is always held in canonical form: any host bits present in
//! the parsed text are masked off, so `192.168.1.50/28` is stored as
//! `192.168.1.48/28`. Comparisons are done on the masked 32-bit values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// An IPv4 network and prefix length.
///
/// # Example
///
/// ```
/// use kube_aws_core::CidrBlock;
///
/// let vpc: CidrBlock = "10.5.0.0/16".parse().unwrap();
/// let subnet: CidrBlock = "10.5.11.0/24".parse().unwrap();
/// assert!(vpc.contains(&subnet));
/// assert!(vpc.overlaps(&subnet));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl CidrBlock {
    /// Build a block from an address and prefix length, masking host bits.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidNetworkFormat` if `prefix_len` exceeds 32.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(CoreError::network_format(
                &format!("{address}/{prefix_len}"),
                "prefix length must be between 0 and 32",
            ));
        }

        Ok(Self {
            network: Ipv4Addr::from(u32::from(address) & mask(prefix_len)),
            prefix_len,
        })
    }

    /// Parse CIDR notation such as `10.0.0.0/16`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidNetworkFormat` if the text is not an IPv4
    /// address followed by `/` and a prefix length in `0..=32`.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CoreError::network_format(s, "missing prefix length"))?;

        let address = Ipv4Addr::from_str(addr)
            .map_err(|_| CoreError::network_format(s, "not an IPv4 address"))?;

        // u8 parsing accepts a leading '+', which is not valid notation
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::network_format(s, "prefix length is not a number"));
        }
        match prefix.parse::<u8>() {
            Ok(prefix_len) if prefix_len <= 32 => Self::new(address, prefix_len),
            _ => Err(CoreError::network_format(
                s,
                "prefix length must be between 0 and 32",
            )),
        }
    }

    /// The network address (host bits zero).
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// The prefix length.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The highest address in the block.
    #[must_use]
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !mask(self.prefix_len))
    }

    /// Returns true if every address of `inner` lies within this block.
    #[must_use]
    pub fn contains(&self, inner: &Self) -> bool {
        self.prefix_len <= inner.prefix_len && self.contains_addr(inner.network)
    }

    /// Returns true if `addr` lies within this block.
    #[must_use]
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix_len) == u32::from(self.network)
    }

    /// Returns true if the two blocks share at least one address.
    ///
    /// Two CIDR blocks either nest or are disjoint, so it is enough to compare
    /// both networks at the shorter of the two prefix lengths.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let shorter = mask(self.prefix_len.min(other.prefix_len));
        u32::from(self.network) & shorter == u32::from(other.network) & shorter
    }
}

/// Returns the netmask for a prefix length in `0..=32`.
const fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    }
}

/// Returns true if the block `outer` fully contains the block `inner`.
///
/// # Errors
///
/// Returns `CoreError::InvalidNetworkFormat` if either argument is malformed.
pub fn contains(outer: &str, inner: &str) -> Result<bool> {
    Ok(CidrBlock::parse(outer)?.contains(&CidrBlock::parse(inner)?))
}

/// Returns true if the blocks `a` and `b` share at least one address.
///
/// # Errors
///
/// Returns `CoreError::InvalidNetworkFormat` if either argument is malformed.
pub fn overlaps(a: &str, b: &str) -> Result<bool> {
    Ok(CidrBlock::parse(a)?.overlaps(&CidrBlock::parse(b)?))
}

/// Parse a bare IPv4 address, mapping failures into the network error.
///
/// # Errors
///
/// Returns `CoreError::InvalidNetworkFormat` if `s` is not an IPv4 address.
pub fn parse_addr(s: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(s).map_err(|_| CoreError::network_format(s, "not an IPv4 address"))
}

impl FromStr for CidrBlock {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CidrBlock({self})")
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CidrBlock> for String {
    fn from(block: CidrBlock) -> Self {
        block.to_string()
    }
}
