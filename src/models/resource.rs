//! Shapes of the JSON payloads the management API returns.

use super::ProvisioningState;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Resource body returned by GET/PUT on a resource group or virtual
/// network. Every field is optional; the API omits what does not apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePayload {
    pub name: Option<String>,
    pub id: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub properties: ResourceProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "provisioningState")]
    pub provisioning_state: Option<String>,
    #[serde(rename = "addressSpace", default)]
    pub address_space: AddressSpace,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressSpace {
    #[serde(rename = "addressPrefixes", default)]
    pub address_prefixes: Vec<String>,
}

impl ResourcePayload {
    pub fn state(&self) -> ProvisioningState {
        match self.properties.provisioning_state.as_deref() {
            Some(raw) => ProvisioningState::from_remote(raw),
            None => ProvisioningState::Unknown,
        }
    }

    /// First address prefix of the VNET, the one the envelope reports.
    pub fn first_prefix(&self) -> Option<String> {
        self.properties.address_space.address_prefixes.first().cloned()
    }
}

/// Subscription-wide VNET listing (`GET .../virtualNetworks`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VnetListing {
    #[serde(default)]
    pub value: Vec<ResourcePayload>,
}

impl VnetListing {
    /// All address prefixes across every listed VNET, in listing order.
    pub fn all_prefixes(&self) -> Vec<String> {
        self.value
            .iter()
            .flat_map(|v| v.properties.address_space.address_prefixes.iter().cloned())
            .collect()
    }
}

/// Error body the management API wraps failures in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmError {
    #[serde(default)]
    pub error: ArmErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ArmError {
    /// Human-readable summary of an error body, falling back to the raw
    /// JSON when the body is not in the usual error shape.
    pub fn summary(body: &Value) -> String {
        match decode::<ArmError>(body) {
            Ok(err) if err.error.code.is_some() || err.error.message.is_some() => format!(
                "{}: {}",
                err.error.code.unwrap_or_default(),
                err.error.message.unwrap_or_default()
            ),
            _ => body.to_string(),
        }
    }
}

/// Decode a JSON value into a payload type, reporting the JSON path of
/// any mismatch.
pub fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, String> {
    serde_path_to_error::deserialize(body.clone())
        .map_err(|e| format!("Error parsing response body: path={} error={}", e.path(), e))
}
