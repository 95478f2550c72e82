//! Identity of the resource one reconciliation targets.

use serde::{Deserialize, Serialize};

/// Which management API collection a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    ResourceGroup,
    VirtualNetwork,
}

/// Caller-supplied coordinates of one resource, immutable for the
/// duration of a reconciliation. Names are opaque here; the remote API
/// is the only validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub subscription_id: String,
    pub resource_group: String,
    pub kind: ResourceKind,
    /// `None` for the resource group itself.
    pub resource_name: Option<String>,
    pub location: String,
}

impl ResourceIdentity {
    pub fn group(subscription_id: &str, resource_group: &str, location: &str) -> ResourceIdentity {
        ResourceIdentity {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            kind: ResourceKind::ResourceGroup,
            resource_name: None,
            location: location.to_string(),
        }
    }

    pub fn virtual_network(
        subscription_id: &str,
        resource_group: &str,
        vnet_name: &str,
        location: &str,
    ) -> ResourceIdentity {
        ResourceIdentity {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            kind: ResourceKind::VirtualNetwork,
            resource_name: Some(vnet_name.to_string()),
            location: location.to_string(),
        }
    }

    /// The resource group identity containing this resource.
    pub fn group_scope(&self) -> ResourceIdentity {
        ResourceIdentity::group(&self.subscription_id, &self.resource_group, &self.location)
    }

    /// The name the envelope reports: the resource's own name, or the
    /// group name for a group identity.
    pub fn display_name(&self) -> &str {
        self.resource_name.as_deref().unwrap_or(&self.resource_group)
    }
}
