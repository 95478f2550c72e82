//! Resource group reconciliation: check -> create -> poll -> report.

use crate::azure::{ApiResponse, Operation, ResourceApi};
use crate::models::{
    decode, ArmError, Envelope, Provisioned, ProvisioningState, ResourceIdentity, ResourcePayload,
};
use crate::poller::{poll_until_terminal, PollPolicy};
use serde_json::json;

/// ARM error code for "group already exists in another location".
const LOCATION_CONFLICT_CODE: &str = "InvalidResourceGroupLocation";

/// Drives one resource group toward the desired state.
///
/// Every entry operation returns a well-formed [`Envelope`]; failures
/// are folded into it rather than raised, so callers never catch
/// errors from this layer.
pub struct ResourceGroupReconciler<'a, C: ResourceApi + ?Sized> {
    client: &'a C,
    identity: ResourceIdentity,
    poll: PollPolicy,
    tracking_id: String,
}

impl<'a, C: ResourceApi + ?Sized> ResourceGroupReconciler<'a, C> {
    pub fn new(
        client: &'a C,
        identity: ResourceIdentity,
        poll: PollPolicy,
        tracking_id: String,
    ) -> ResourceGroupReconciler<'a, C> {
        ResourceGroupReconciler {
            client,
            identity,
            poll,
            tracking_id,
        }
    }

    fn envelope(&self) -> Envelope {
        Envelope::new(
            &self.identity.resource_group,
            &self.identity.location,
            &self.tracking_id,
        )
    }

    /// Check whether the resource group exists.
    ///
    /// 200 maps to existing, 404 to absent; anything else, including a
    /// client error, is `Unknown`.
    pub async fn check(&self) -> Envelope {
        let rg_name = &self.identity.resource_group;
        let mut envelope = self.envelope();

        match self.client.request(Operation::Check, &self.identity, None).await {
            Ok(resp) if resp.status == 200 => {
                envelope.correlation_id = resp.correlation_id.clone();
                if let Ok(payload) = decode::<ResourcePayload>(&resp.body) {
                    apply_payload(&mut envelope, &payload);
                }
                envelope.is_provisioned = Provisioned::Yes;
                envelope.return_code = 200;
                envelope.message = format!("ResourceGroup: {rg_name} was found");
                log::info!(
                    "ResourceGroup: {rg_name} was found | correlationId: {correlation} | trackingId: {tracking}",
                    correlation = envelope.correlation_id,
                    tracking = self.tracking_id
                );
            }
            Ok(resp) if resp.status == 404 => {
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::No;
                envelope.return_code = 404;
                envelope.message = format!("Resource Group: {rg_name} does not exist.");
                log::info!("{}", envelope.message);
            }
            Ok(resp) => {
                let detail = ArmError::summary(&resp.body);
                log::error!("Issue checking for Resource Group: {rg_name}: {detail}");
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = resp.status;
                envelope.message =
                    format!("Issue checking for Resource Group: {rg_name}: {detail}");
            }
            Err(e) => {
                log::error!("Exception checking for Resource Group: {rg_name}: {e}");
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = 500;
                envelope.message =
                    format!("Exception checking for Resource Group: {rg_name}: {e}");
            }
        }
        envelope
    }

    /// Create the resource group and drive it to a terminal state.
    ///
    /// Idempotent: creating a group that already exists in the same
    /// location converges to a success envelope without a second
    /// mutating call; an existing group in a different location is
    /// adopted as-is (the existing location always wins).
    pub async fn create(&self) -> Envelope {
        let rg_name = &self.identity.resource_group;
        let location = &self.identity.location;
        let mut envelope = self.envelope();
        let body = json!({ "location": location });

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
                }
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = if state == ProvisioningState::Succeeded {
                    Provisioned::Yes
                } else {
                    Provisioned::No
                };
                envelope.provisioning_state = Some(state);
                envelope.return_code = resp.status;
                envelope.message =
                    format!("ResourceGroup: {rg_name} was created with provisioningState: {state}");
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
                log::error!("Issue creating Resource Group: {rg_name}: {detail}");
                envelope.correlation_id = resp.correlation_id;
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = resp.status;
                envelope.message = format!("Issue creating Resource Group: {rg_name}: {detail}");
            }
            Err(e) => {
                log::error!("Exception creating Resource Group: {rg_name}: {e}");
                envelope.is_provisioned = Provisioned::Unknown;
                envelope.return_code = 500;
                envelope.message = format!("Exception creating Resource Group: {rg_name}: {e}");
            }
        }
        envelope
    }

    /// One status fetch for the convergence poller. Unreachable remote
    /// or undecodable payloads count as `Unknown`, which keeps the loop
    /// going.
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

    /// Resolve a 409: when the group already exists in another
    /// location, re-fetch it and report the existing state as success.
    /// Other 409s are reported as-is.
    async fn adopt_existing(&self, resp: ApiResponse) -> Envelope {
        let rg_name = &self.identity.resource_group;
        let requested = &self.identity.location;
        let mut envelope = self.envelope();

        let arm_error = decode::<ArmError>(&resp.body).unwrap_or_default();
        let code = arm_error.error.code.as_deref().unwrap_or_default();
        let detail = arm_error.error.message.as_deref().unwrap_or_default();

        if code == LOCATION_CONFLICT_CODE && detail.contains("already exists") {
            if let Ok(check) = self.client.request(Operation::Check, &self.identity, None).await {
                if check.status == 200 {
                    if let Ok(payload) = decode::<ResourcePayload>(&check.body) {
                        apply_payload(&mut envelope, &payload);
                    }
                    let existing = envelope.location.clone();
                    envelope.correlation_id = check.correlation_id;
                    envelope.is_provisioned = Provisioned::Yes;
                    envelope.return_code = 200;
                    envelope.message = format!(
                        "Resource Group: {rg_name} already exists in location '{existing}'. You requested '{requested}'."
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
        log::error!("Issue creating Resource Group: {rg_name}: {detail}");
        envelope.correlation_id = resp.correlation_id;
        envelope.is_provisioned = Provisioned::Unknown;
        envelope.return_code = resp.status;
        envelope.message = format!("Issue creating Resource Group: {rg_name}: {detail}");
        envelope
    }
}

/// Copy the remote-sourced fields into the envelope, keeping the
/// caller-supplied values where the payload has none.
pub(crate) fn apply_payload(envelope: &mut Envelope, payload: &ResourcePayload) {
    if let Some(name) = &payload.name {
        envelope.name = name.clone();
    }
    if let Some(id) = &payload.id {
        envelope.id = id.clone();
    }
    if let Some(location) = &payload.location {
        envelope.location = location.clone();
    }
}
