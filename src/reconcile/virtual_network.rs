//! Virtual network reconciliation.
//!
//! Composed state machine: ensure the resource group, pick an address
//! prefix (reuse the existing one, or allocate the next free /16),
//! create, then poll to a terminal state. The VNET step never runs
//! against a group in an unknown state.

use super::resource_group::{apply_payload, ResourceGroupReconciler};
use crate::allocator;
use crate::azure::{ApiResponse, Operation, ResourceApi};
use crate::models::{
    decode, ArmError, Envelope, Provisioned, ProvisioningState, ResourceIdentity, ResourcePayload,
};
use crate::poller::{poll_until_terminal, PollPolicy};
use serde_json::json;

/// ARM error code for "resource already exists in another location".
const LOCATION_CONFLICT_CODE: &str = "InvalidResourceLocation";

pub struct VirtualNetworkReconciler<'a, C: ResourceApi + ?Sized> {
    client: &'a C,
    identity: ResourceIdentity,
    poll: PollPolicy,
    tracking_id: String,
}

impl<'a, C: ResourceApi + ?Sized> VirtualNetworkReconciler<'a, C> {
    pub fn new(
        client: &'a C,
        identity: ResourceIdentity,
        poll: PollPolicy,
        tracking_id: String,
    ) -> VirtualNetworkReconciler<'a, C> {
        VirtualNetworkReconciler {
            client,
            identity,
            poll,
            tracking_id,
        }
    }

    fn vnet_name(&self) -> &str {
        self.identity.display_name()
    }

    fn envelope(&self) -> Envelope {
        let mut envelope = Envelope::new(
            self.identity.display_name(),
            &self.identity.location,
            &self.tracking_id,
        );
        envelope.resource_group = Some(self.identity.resource_group.clone());
        envelope
    }

    /// Check whether the virtual network exists.
    pub async fn check(&self) -> Envelope {
        let vnet_name = self.vnet_name().to_string();
        let mut envelope = self.envelope();
        log::info!(
            "Starting Virtual Network check for VNET: {vnet_name} | trackingId: {tracking}",
            tracking = self.tracking_id
        );

        match self.client.request(Operation::Check, &self.identity, None).await {
            Ok(resp) if resp.status == 200 => {
                envelope.correlation_id = resp.correlation_id.clone();
                if let Ok(payload) = decode::<ResourcePayload>(&resp.body) {
                    envelope.provisioning_state = Some(payload.state());
                    envelope.address_prefix = payload.first_prefix();
                    apply_payload(&mut envelope, &payload);
                }
                envelope.is_provisioned = Provisioned::Yes;
                envelope.return_code = 200;
                envelope.message = format!("Virtual Network: {vnet_name} has been located.");
                log::info!("{}", envelope.message);
            }
            Ok(resp) if resp.status == 404 => {
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::No;
                envelope.return_code = 404;
                envelope.message = format!("Virtual Network: {vnet_name} does not exist.");
                log::info!("{}", envelope.message);
            }
            Ok(resp) => {
                let detail = ArmError::summary(&resp.body);
                log::error!("Issue checking for Virtual Network: {vnet_name}: {detail}");
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = resp.status;
                envelope.message =
                    format!("Issue checking for Virtual Network: {vnet_name}: {detail}");
            }
            Err(e) => {
                log::error!("Exception checking for Virtual Network: {vnet_name}: {e}");
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = 500;
                envelope.message =
                    format!("Exception checking for Virtual Network: {vnet_name}: {e}");
            }
        }
        envelope
    }

    /// Create the virtual network and drive it to a terminal state.
    pub async fn create(&self) -> Envelope {
        let vnet_name = self.vnet_name().to_string();
        let rg_name = self.identity.resource_group.clone();
        let location = self.identity.location.clone();

        // Ensure the resource group exists before touching the VNET.
        let group = ResourceGroupReconciler::new(
            self.client,
            self.identity.group_scope(),
            self.poll,
            self.tracking_id.clone(),
        );
        let group_check = group.check().await;
        if group_check.return_code != 200 {
            log::info!(
                "Resource group {rg_name} not found. Creating it... | trackingId: {tracking}",
                tracking = self.tracking_id
            );
            let group_created = group.create().await;
            if group_created.is_provisioned != Provisioned::Yes {
                log::error!(
                    "Failed to create resource group {rg_name}. Aborting VNET creation. | trackingId: {tracking}",
                    tracking = self.tracking_id
                );
                return group_created;
            }
        }

        // Existing VNET keeps its prefix; only confirmed-absent ones
        // get a fresh allocation.
        let prefix = match self.client.request(Operation::Check, &self.identity, None).await {
            Ok(resp) if resp.status == 200 => decode::<ResourcePayload>(&resp.body)
                .ok()
                .and_then(|payload| payload.first_prefix()),
            _ => None,
        };
        let mut prefix = match prefix {
            Some(existing) => existing,
            None => self.allocate_prefix().await,
        };

        let mut envelope = self.envelope();
        let body = json!({
            "location": location,
            "properties": { "addressSpace": { "addressPrefixes": [prefix.as_str()] } }
        });

        match self
            .client
            .request(Operation::Create, &self.identity, Some(&body))
            .await
        {
            Ok(resp) if resp.is_success() => {
                let outcome = poll_until_terminal(self.poll, move || self.fetch_state()).await;
                let state = outcome.state;

                if let Some(payload) = &outcome.payload {
                    apply_payload(&mut envelope, payload);
                    // The remote's prefix is authoritative over the
                    // submitted one.
                    if let Some(remote_prefix) = payload.first_prefix() {
                        prefix = remote_prefix;
                    }
                }
                envelope.correlation_id = resp.correlation_id;
                envelope.address_prefix = Some(prefix);
                envelope.is_provisioned = if state == ProvisioningState::Succeeded {
                    Provisioned::Yes
                } else {
                    Provisioned::No
                };
                envelope.provisioning_state = Some(state);
                envelope.return_code = resp.status;
                envelope.message = format!(
                    "Virtual Network: {vnet_name} was created with provisioningState: {state}"
                );
                log::info!(
                    "{message} | correlationId: {correlation} | trackingId: {tracking} | attempts: {attempts}",
                    message = envelope.message,
                    correlation = envelope.correlation_id,
                    tracking = self.tracking_id,
                    attempts = outcome.attempts
                );
            }
            Ok(resp) if resp.status == 409 => {
                envelope = self.adopt_existing(resp).await;
            }
            Ok(resp) => {
                let detail = ArmError::summary(&resp.body);
                log::error!("Issue creating Virtual Network: {vnet_name}: {detail}");
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.provisioning_state = Some(ProvisioningState::Unknown);
                envelope.address_prefix = Some("Unknown".to_string());
                envelope.return_code = resp.status;
                envelope.message = format!("Issue creating Virtual Network: {vnet_name}: {detail}");
            }
            Err(e) => {
                log::error!("Exception creating Virtual Network: {vnet_name}: {e}");
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.provisioning_state = Some(ProvisioningState::Unknown);
                envelope.address_prefix = Some("Unknown".to_string());
                envelope.return_code = 500;
                envelope.message = format!("Exception creating Virtual Network: {vnet_name}: {e}");
            }
        }
        envelope
    }

    /// Next free /16 from the subscription-wide listing. Any failure to
    /// list or decode falls back to the allocator's default block.
    async fn allocate_prefix(&self) -> String {
        log::info!("Fetching next usable VNET prefix (subscription-wide)");
        let listing = match self
            .client
            .request(Operation::ListInSubscription, &self.identity, None)
            .await
        {
            Ok(resp) if resp.status == 200 => decode::<crate::models::VnetListing>(&resp.body),
            Ok(resp) => Err(format!("listing returned status {}", resp.status)),
            Err(e) => Err(e.to_string()),
        };

        match listing {
            Ok(listing) => allocator::next_prefix(&listing.all_prefixes()).to_string(),
            Err(e) => {
                log::error!("Error fetching next VNET prefix: {e}");
                allocator::DEFAULT_PREFIX.to_string()
            }
        }
    }

    async fn fetch_state(&self) -> (ProvisioningState, Option<ResourcePayload>) {
        match self.client.request(Operation::Check, &self.identity, None).await {
            Ok(resp) if resp.status == 200 => match decode::<ResourcePayload>(&resp.body) {
                Ok(payload) => (payload.state(), Some(payload)),
                Err(e) => {
                    log::warn!("Undecodable status payload: {e}");
                    (ProvisioningState::Unknown, None)
                }
            },
            Ok(resp) if resp.status == 404 => (ProvisioningState::NotFound, None),
            Ok(resp) => {
                log::warn!("Status fetch returned {status}", status = resp.status);
                (ProvisioningState::Unknown, None)
            }
            Err(e) => {
                log::warn!("Status fetch failed: {e}");
                (ProvisioningState::Unknown, None)
            }
        }
    }

    /// Resolve a 409: a VNET that already exists in another location is
    /// adopted with its actual location and prefix, never overwritten.
    async fn adopt_existing(&self, resp: ApiResponse) -> Envelope {
        let vnet_name = self.vnet_name().to_string();
        let requested = self.identity.location.clone();
        let mut envelope = self.envelope();

        let arm_error = decode::<ArmError>(&resp.body).unwrap_or_default();
        let code = arm_error.error.code.as_deref().unwrap_or_default();
        let detail = arm_error.error.message.as_deref().unwrap_or_default();

        if code == LOCATION_CONFLICT_CODE && detail.contains("already exists") {
            if let Ok(check) = self.client.request(Operation::Check, &self.identity, None).await {
                if check.status == 200 {
                    if let Ok(payload) = decode::<ResourcePayload>(&check.body) {
                        envelope.provisioning_state = Some(payload.state());
                        envelope.address_prefix = payload.first_prefix();
                        apply_payload(&mut envelope, &payload);
                    }
                    let existing = envelope.location.clone();
                    envelope.correlation_id = check.correlation_id;
                    envelope.is_provisioned = Provisioned::Yes;
                    envelope.return_code = 200;
                    envelope.message = format!(
                        "Virtual Network: {vnet_name} already exists in location '{existing}'. You requested '{requested}'."
                    );
                    log::info!(
                        "{message} | trackingId: {tracking}",
                        message = envelope.message,
                        tracking = self.tracking_id
                    );
                    return envelope;
                }
            }
        }

        let detail = ArmError::summary(&resp.body);
        log::error!("Issue creating Virtual Network: {vnet_name}: {detail}");
        envelope.correlation_id = resp.correlation_id;
        envelope.is_provisioned = Provisioned::Unknown;
        envelope.provisioning_state = Some(ProvisioningState::Unknown);
        envelope.address_prefix = Some("Unknown".to_string());
        envelope.return_code = resp.status;
        envelope.message = format!("Issue creating Virtual Network: {vnet_name}: {detail}");
        envelope
    }
}
