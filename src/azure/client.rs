//! Typed facade over the management REST API.
//!
//! One request in, one normalized `(status, body, correlation)` triple
//! out. No retries here - convergence retrying belongs to the poller -
//! which keeps this layer a pure I/O boundary that tests replace with
//! canned responses.

use super::{auth, ClientError};
use crate::config::Config;
use crate::models::{ResourceIdentity, ResourceKind};
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use colored::Colorize;
use serde_json::Value;
use std::sync::Arc;

/// Correlation header the management API attaches to every response.
const CORRELATION_HEADER: &str = "x-ms-correlation-request-id";

/// The request shapes the reconcilers need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// GET the resource; absence is status 404, not an error.
    Check,
    /// PUT the desired-state body; returns immediately while
    /// provisioning continues asynchronously.
    Create,
    /// DELETE the resource.
    Delete,
    /// GET all virtual networks in the resource group.
    ListInGroup,
    /// GET all virtual networks in the subscription.
    ListInSubscription,
}

/// Normalized response from one management API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies.
    pub body: Value,
    /// Remote-assigned correlation token, empty when the header was
    /// absent.
    pub correlation_id: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 201
    }
}

/// Boundary the reconcilers talk through. Tests implement this with an
/// in-memory double; production uses [`AzureResourceClient`].
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn request(
        &self,
        op: Operation,
        identity: &ResourceIdentity,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError>;
}

/// reqwest-backed client for the Azure Resource Manager endpoints.
///
/// Built once from [`Config`] and a shared credential, then passed by
/// reference into every reconciler.
pub struct AzureResourceClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    endpoint: String,
    api_version: String,
}

impl AzureResourceClient {
    pub fn new(config: &Config, credential: Arc<dyn TokenCredential>) -> AzureResourceClient {
        AzureResourceClient {
            http: reqwest::Client::new(),
            credential,
            endpoint: config.endpoint.clone(),
            api_version: config.api_version.clone(),
        }
    }

    /// Build the request URL for an operation, following the ARM path
    /// conventions for resource groups and virtual networks.
    fn url(&self, op: Operation, identity: &ResourceIdentity) -> String {
        let endpoint = &self.endpoint;
        let sub = &identity.subscription_id;
        let rg = &identity.resource_group;
        let v = &self.api_version;
        match identity.kind {
            ResourceKind::ResourceGroup => match op {
                Operation::ListInSubscription => {
                    format!("{endpoint}/subscriptions/{sub}/resourcegroups?api-version={v}")
                }
                _ => format!("{endpoint}/subscriptions/{sub}/resourcegroups/{rg}?api-version={v}"),
            },
            ResourceKind::VirtualNetwork => match op {
                Operation::ListInGroup => format!(
                    "{endpoint}/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks?api-version={v}"
                ),
                Operation::ListInSubscription => format!(
                    "{endpoint}/subscriptions/{sub}/providers/Microsoft.Network/virtualNetworks?api-version={v}"
                ),
                _ => {
                    let name = identity.resource_name.as_deref().unwrap_or_default();
                    format!(
                        "{endpoint}/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{name}?api-version={v}"
                    )
                }
            },
        }
    }
}

#[async_trait]
impl ResourceApi for AzureResourceClient {
    async fn request(
        &self,
        op: Operation,
        identity: &ResourceIdentity,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url(op, identity);
        log::debug!("{op:?} {url}", url = url.on_blue());

        let token = auth::bearer_token(&self.credential).await?;
        let request = match op {
            Operation::Check | Operation::ListInGroup | Operation::ListInSubscription => {
                self.http.get(&url)
            }
            Operation::Create => {
                let body = body.ok_or(ClientError::MissingBody)?;
                self.http.put(&url).json(body)
            }
            Operation::Delete => self.http.delete(&url),
        };

        let response = request.bearer_auth(token).send().await?;
        let status = response.status().as_u16();
        let correlation_id = response
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|source| ClientError::Decode { status, source })?
        };

        log::debug!("{op:?} status={status} correlation_id={correlation_id}");
        Ok(ApiResponse {
            status,
            body,
            correlation_id,
        })
    }
}
