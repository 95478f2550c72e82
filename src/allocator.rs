//! Next-free /16 address block allocation.

use crate::models::Ipv4;
use std::net::Ipv4Addr;

/// The block handed out when no /16 allocations exist yet, and the
/// fallback whenever the computation cannot complete.
pub const DEFAULT_PREFIX: Ipv4 = Ipv4 {
    addr: Ipv4Addr::new(10, 0, 0, 0),
    mask: 16,
};

/// Compute the next unused /16 block given every address prefix
/// currently allocated in the subscription.
///
/// Only prefixes written as `/16` participate; everything else is
/// ignored. The candidate is the block one /16-stride above the
/// numerically highest existing /16. Any parse failure among the /16
/// inputs, or arithmetic overflow, aborts the whole computation to
/// [`DEFAULT_PREFIX`].
///
/// Known precision gap, kept on purpose: the candidate is not checked
/// against non-/16 blocks (a `10.0.0.0/8` does not block `10.1.0.0/16`)
/// or against allocations outside the listed subscription.
pub fn next_prefix(existing: &[String]) -> Ipv4 {
    let sixteens: Vec<&String> = existing.iter().filter(|p| p.ends_with("/16")).collect();
    if sixteens.is_empty() {
        log::info!("No existing /16 VNET prefixes found, using default {DEFAULT_PREFIX}");
        return DEFAULT_PREFIX;
    }

    let parsed: Result<Vec<Ipv4>, _> = sixteens.iter().map(|p| Ipv4::new(p)).collect();
    let blocks = match parsed {
        Ok(blocks) => blocks,
        Err(e) => {
            log::error!("Error parsing existing VNET prefixes: {e}");
            return DEFAULT_PREFIX;
        }
    };

    // Highest block by numeric network address
    let last = blocks
        .iter()
        .max_by_key(|b| b.network_u32())
        .copied()
        .unwrap_or(DEFAULT_PREFIX);

    match last.next_block() {
        Some(next) => {
            log::info!("Next available VNET prefix: {next}");
            next
        }
        None => {
            log::error!("Address space exhausted after {last}, falling back to {DEFAULT_PREFIX}");
            DEFAULT_PREFIX
        }
    }
}
