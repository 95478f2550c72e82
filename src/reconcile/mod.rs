//! Provisioning reconciliation engine.
//!
//! One state machine applied uniformly to both resource kinds:
//! - [`ResourceGroupReconciler`] - check -> create -> poll for groups
//! - [`VirtualNetworkReconciler`] - group-first composition for VNETs

mod resource_group;
mod virtual_network;

// Re-export public types
pub use resource_group::ResourceGroupReconciler;
pub use virtual_network::VirtualNetworkReconciler;
