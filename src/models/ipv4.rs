//! IPv4 CIDR block type used for VNET address space allocation.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub const MAX_LENGTH: u8 = 32;

/// An IPv4 address block in CIDR notation.
///
/// Ordering is by network address first, then mask, so `10.2.0.0/16`
/// sorts before `10.10.0.0/16` (numeric, not lexical).
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    pub addr: Ipv4Addr,
    pub mask: u8,
}

impl Ipv4 {
    pub fn new(addr_cidr: &str) -> Result<Ipv4, Box<dyn Error>> {
        let addr_cidr = addr_cidr.trim();
        let parts: Vec<&str> = addr_cidr.split('/').collect();
        if parts.len() != 2 {
            return Err(format!("Invalid address/mask: {addr_cidr}").into());
        }
        let addr = Ipv4Addr::from_str(parts[0])
            .map_err(|_| format!("Invalid address: {}", parts[0]))?;
        let mask: u8 = parts[1]
            .parse()
            .map_err(|_| format!("Invalid mask: {}", parts[1]))?;
        if mask > MAX_LENGTH {
            return Err("Network length is too long".into());
        }
        Ok(Ipv4 { addr, mask })
    }

    /// Network address as a 32-bit integer, for numeric sorting.
    pub fn network_u32(&self) -> u32 {
        u32::from(self.addr)
    }

    /// Number of addresses in this block (65536 for a /16).
    pub fn block_size(&self) -> u64 {
        1u64 << (MAX_LENGTH - self.mask)
    }

    /// The block immediately following this one, keeping the same mask.
    ///
    /// Returns `None` when the addition would wrap past the end of the
    /// IPv4 address space.
    pub fn next_block(&self) -> Option<Ipv4> {
        let size = u32::try_from(self.block_size()).ok()?;
        let next = self.network_u32().checked_add(size)?;
        Some(Ipv4 {
            addr: Ipv4Addr::from(next),
            mask: self.mask,
        })
    }

    /// Check if an IP address is contained within this block.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let right_len = u32::from(MAX_LENGTH - self.mask);
        let mask = if right_len >= 32 {
            0
        } else {
            (u32::MAX >> right_len) << right_len
        };
        u32::from(ip) & mask == self.network_u32() & mask
    }
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let cidr = format!("{}/{}", self.addr, self.mask);
        serializer.serialize_str(&cidr)
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(|e| de::Error::custom(format!("invalid CIDR {s}: {e}")))
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}
