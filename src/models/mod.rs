//! Domain models for network provisioning.
//!
//! This module contains the core data structures used throughout the
//! application:
//! - [`Ipv4`] - IPv4 address block with CIDR notation support
//! - [`ProvisioningState`] - remote lifecycle states
//! - [`Envelope`] and [`Provisioned`] - the canonical reconciler result
//! - [`ResourceIdentity`] - coordinates of the resource being reconciled
//! - [`ResourcePayload`] and friends - remote JSON payload shapes

mod envelope;
mod identity;
mod ipv4;
mod resource;
mod state;

// Re-export public types
pub use envelope::{Envelope, Provisioned};
pub use identity::{ResourceIdentity, ResourceKind};
pub use ipv4::{Ipv4, MAX_LENGTH};
pub use resource::{decode, ArmError, ResourcePayload, VnetListing};
pub use state::ProvisioningState;
