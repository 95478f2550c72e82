//! The response envelope returned by every reconciler.
//!
//! One canonical shape regardless of transport: the CLI prints it as
//! JSON, the HTTP surface returns it as the response body with the
//! embedded `ReturnCode` mirrored as the HTTP status.

use super::ProvisioningState;
use serde::{Deserialize, Serialize};

/// Whether the resource is confirmed provisioned.
///
/// Serialized as `"Yes"` / `"No"` / `"Unknown"`. `Yes` together with
/// `ReturnCode == 200` means the resource exists with provisioning
/// state `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provisioned {
    Yes,
    No,
    Unknown,
}

/// Result of one reconciliation, exchanged verbatim with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    #[serde(rename = "isProvisioned")]
    pub is_provisioned: Provisioned,
    pub location: String,
    pub id: String,
    /// First address prefix of the virtual network (VNET envelopes only).
    #[serde(
        rename = "addressPrefix",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub address_prefix: Option<String>,
    /// Containing resource group (VNET envelopes only).
    #[serde(
        rename = "resourceGroup",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_group: Option<String>,
    #[serde(
        rename = "provisioningState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provisioning_state: Option<ProvisioningState>,
    /// Mirrors the last HTTP status observed from the management API;
    /// transport and logic failures map to 500.
    #[serde(rename = "ReturnCode")]
    pub return_code: u16,
    pub message: String,
    /// Caller-assigned token, carried unchanged through the whole call.
    #[serde(rename = "trackingId")]
    pub tracking_id: String,
    /// Remote-assigned per-request trace token, empty when no response
    /// header was observed.
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

impl Envelope {
    /// Envelope skeleton with the caller-supplied fields filled in and
    /// everything remote-sourced left at its placeholder value.
    pub fn new(name: &str, location: &str, tracking_id: &str) -> Envelope {
        Envelope {
            name: name.to_string(),
            is_provisioned: Provisioned::Unknown,
            location: location.to_string(),
            id: String::new(),
            address_prefix: None,
            resource_group: None,
            provisioning_state: None,
            return_code: 500,
            message: String::new(),
            tracking_id: tracking_id.to_string(),
            correlation_id: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_on_the_wire() {
        let mut envelope = Envelope::new("my-rg", "eastus", "track-1");
        envelope.is_provisioned = Provisioned::Yes;
        envelope.return_code = 200;
        envelope.provisioning_state = Some(ProvisioningState::Succeeded);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["isProvisioned"], "Yes");
        assert_eq!(json["ReturnCode"], 200);
        assert_eq!(json["provisioningState"], "Succeeded");
        assert_eq!(json["trackingId"], "track-1");
        assert_eq!(json["correlationId"], "");
        // VNET-only fields stay off the wire when unset
        assert!(json.get("addressPrefix").is_none());
        assert!(json.get("resourceGroup").is_none());
    }

    #[test]
    fn test_vnet_fields_serialized_when_set() {
        let mut envelope = Envelope::new("my-vnet", "eastus", "track-2");
        envelope.address_prefix = Some("10.1.0.0/16".to_string());
        envelope.resource_group = Some("my-rg".to_string());

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["addressPrefix"], "10.1.0.0/16");
        assert_eq!(json["resourceGroup"], "my-rg");
    }
}
