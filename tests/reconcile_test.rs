//! Integration tests for the reconciliation engine.
//!
//! All remote interaction goes through an in-memory [`ResourceApi`]
//! double that records every call, so ordering and idempotence can be
//! asserted without a live subscription.

use async_trait::async_trait;
use azure_net_provision::azure::{ApiResponse, ClientError, Operation, ResourceApi};
use azure_net_provision::models::{Provisioned, ProvisioningState, ResourceIdentity, ResourceKind};
use azure_net_provision::poller::PollPolicy;
use azure_net_provision::reconcile::{ResourceGroupReconciler, VirtualNetworkReconciler};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const FAST: PollPolicy = PollPolicy::new(3, Duration::ZERO);

#[derive(Debug, Clone)]
struct Call {
    op: Operation,
    kind: ResourceKind,
    body: Option<Value>,
}

/// Scripted management API: records calls, answers via the closure.
struct FakeApi<F> {
    calls: Mutex<Vec<Call>>,
    respond: F,
}

impl<F> FakeApi<F>
where
    F: Fn(Operation, &ResourceIdentity) -> Result<ApiResponse, ClientError> + Send + Sync,
{
    fn new(respond: F) -> FakeApi<F> {
        FakeApi {
            calls: Mutex::new(Vec::new()),
            respond,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, op: Operation, kind: ResourceKind) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.op == op && c.kind == kind)
            .count()
    }
}

#[async_trait]
impl<F> ResourceApi for FakeApi<F>
where
    F: Fn(Operation, &ResourceIdentity) -> Result<ApiResponse, ClientError> + Send + Sync,
{
    async fn request(
        &self,
        op: Operation,
        identity: &ResourceIdentity,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        self.calls.lock().unwrap().push(Call {
            op,
            kind: identity.kind,
            body: body.cloned(),
        });
        (self.respond)(op, identity)
    }
}

fn ok(status: u16, body: Value) -> Result<ApiResponse, ClientError> {
    Ok(ApiResponse {
        status,
        body,
        correlation_id: "corr-1".to_string(),
    })
}

fn rg_payload(state: &str, location: &str) -> Value {
    json!({
        "name": "rg-a",
        "id": "/subscriptions/sub-1/resourceGroups/rg-a",
        "location": location,
        "properties": { "provisioningState": state }
    })
}

fn vnet_payload(state: &str, location: &str, prefix: &str) -> Value {
    json!({
        "name": "vnet-a",
        "id": "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/virtualNetworks/vnet-a",
        "location": location,
        "properties": {
            "provisioningState": state,
            "addressSpace": { "addressPrefixes": [prefix] }
        }
    })
}

fn conflict_body(code: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": "Resource already exists in location 'westus' and cannot be created in 'eastus'."
        }
    })
}

fn group_identity() -> ResourceIdentity {
    ResourceIdentity::group("sub-1", "rg-a", "eastus")
}

fn vnet_identity() -> ResourceIdentity {
    ResourceIdentity::virtual_network("sub-1", "rg-a", "vnet-a", "eastus")
}

#[tokio::test]
async fn test_rg_create_converges_to_yes() {
    let checks = AtomicUsize::new(0);
    let api = FakeApi::new(|op, _identity| match op {
        Operation::Create => ok(201, rg_payload("Accepted", "eastus")),
        Operation::Check => {
            // Accepted on the first poll, Succeeded afterwards.
            let n = checks.fetch_add(1, Ordering::SeqCst);
            let state = if n == 0 { "Accepted" } else { "Succeeded" };
            ok(200, rg_payload(state, "eastus"))
        }
        _ => ok(200, Value::Null),
    });

    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.is_provisioned, Provisioned::Yes);
    assert_eq!(envelope.provisioning_state, Some(ProvisioningState::Succeeded));
    assert_eq!(envelope.return_code, 201);
    assert_eq!(envelope.name, "rg-a");
    assert_eq!(envelope.tracking_id, "track-1");
    assert_eq!(envelope.correlation_id, "corr-1");
}

#[tokio::test]
async fn test_rg_create_is_idempotent() {
    let puts = AtomicUsize::new(0);
    let api = FakeApi::new(|op, _identity| match op {
        Operation::Create => {
            // Second PUT hits the already-exists conflict.
            if puts.fetch_add(1, Ordering::SeqCst) == 0 {
                ok(201, rg_payload("Accepted", "eastus"))
            } else {
                ok(409, conflict_body("InvalidResourceGroupLocation"))
            }
        }
        Operation::Check => ok(200, rg_payload("Succeeded", "eastus")),
        _ => ok(200, Value::Null),
    });

    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let first = reconciler.create().await;
    let second = reconciler.create().await;

    assert_eq!(first.is_provisioned, Provisioned::Yes);
    assert_eq!(second.is_provisioned, Provisioned::Yes);
    assert_eq!(first.name, second.name);
    assert_eq!(first.location, second.location);
    assert_eq!(first.id, second.id);
    // One mutating write per call and none after existence is confirmed
    assert_eq!(
        api.count(Operation::Create, ResourceKind::ResourceGroup),
        2
    );
}

#[tokio::test]
async fn test_rg_create_remote_failure_is_unknown() {
    let api = FakeApi::new(|op, _identity| match op {
        Operation::Create => ok(
            403,
            json!({"error": {"code": "AuthorizationFailed", "message": "denied"}}),
        ),
        _ => ok(200, Value::Null),
    });

    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.is_provisioned, Provisioned::Unknown);
    assert_eq!(envelope.return_code, 403);
    assert!(envelope.message.contains("AuthorizationFailed"));
    // No polling against a rejected create
    assert_eq!(api.count(Operation::Check, ResourceKind::ResourceGroup), 0);
}

#[tokio::test]
async fn test_rg_check_maps_statuses() {
    let api = FakeApi::new(|_op, _identity| ok(200, rg_payload("Succeeded", "westus")));
    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.check().await;
    assert_eq!(envelope.is_provisioned, Provisioned::Yes);
    assert_eq!(envelope.location, "westus");
    assert_eq!(envelope.return_code, 200);

    let api = FakeApi::new(|_op, _identity| ok(404, Value::Null));
    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.check().await;
    assert_eq!(envelope.is_provisioned, Provisioned::No);
    assert_eq!(envelope.return_code, 404);

    let api = FakeApi::new(|_op, _identity| ok(503, Value::Null));
    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.check().await;
    assert_eq!(envelope.is_provisioned, Provisioned::Unknown);
    assert_eq!(envelope.return_code, 503);
}

#[tokio::test]
async fn test_rg_client_error_maps_to_unknown_500() {
    let api = FakeApi::new(|_op, _identity| Err(ClientError::MissingBody));
    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());

    let checked = reconciler.check().await;
    assert_eq!(checked.is_provisioned, Provisioned::Unknown);
    assert_eq!(checked.return_code, 500);
    assert!(checked.message.contains("Exception checking for Resource Group: rg-a"));
    assert!(checked.message.contains("request body"), "cause must reach the message");

    let created = reconciler.create().await;
    assert_eq!(created.is_provisioned, Provisioned::Unknown);
    assert_eq!(created.return_code, 500);
    assert!(created.message.contains("Exception creating Resource Group: rg-a"));
    // Only the check() above fetched status; a failed create never polls
    assert_eq!(api.count(Operation::Check, ResourceKind::ResourceGroup), 1);
}

#[tokio::test]
async fn test_rg_create_timeout_reports_no() {
    let api = FakeApi::new(|op, _identity| match op {
        Operation::Create => ok(201, rg_payload("Accepted", "eastus")),
        Operation::Check => ok(200, rg_payload("Accepted", "eastus")),
        _ => ok(200, Value::Null),
    });

    let reconciler =
        ResourceGroupReconciler::new(&api, group_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.is_provisioned, Provisioned::No);
    assert_eq!(envelope.provisioning_state, Some(ProvisioningState::Accepted));
    // Budget spent in full: one check per attempt
    assert_eq!(
        api.count(Operation::Check, ResourceKind::ResourceGroup),
        FAST.max_attempts as usize
    );
}

#[tokio::test]
async fn test_vnet_create_orders_group_before_network() {
    let rg_checks = AtomicUsize::new(0);
    let vnet_checks = AtomicUsize::new(0);
    let api = FakeApi::new(|op, identity| match (identity.kind, op) {
        (ResourceKind::ResourceGroup, Operation::Check) => {
            // Absent on the first look, Succeeded once created.
            if rg_checks.fetch_add(1, Ordering::SeqCst) == 0 {
                ok(404, Value::Null)
            } else {
                ok(200, rg_payload("Succeeded", "eastus"))
            }
        }
        (ResourceKind::ResourceGroup, Operation::Create) => {
            ok(201, rg_payload("Accepted", "eastus"))
        }
        (ResourceKind::VirtualNetwork, Operation::Check) => {
            if vnet_checks.fetch_add(1, Ordering::SeqCst) == 0 {
                ok(404, Value::Null)
            } else {
                ok(200, vnet_payload("Succeeded", "eastus", "10.1.0.0/16"))
            }
        }
        (ResourceKind::VirtualNetwork, Operation::ListInSubscription) => ok(
            200,
            json!({"value": [
                { "properties": { "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] } } }
            ]}),
        ),
        (ResourceKind::VirtualNetwork, Operation::Create) => {
            ok(201, vnet_payload("Accepted", "eastus", "10.1.0.0/16"))
        }
        _ => ok(200, Value::Null),
    });

    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.is_provisioned, Provisioned::Yes);
    assert_eq!(envelope.address_prefix.as_deref(), Some("10.1.0.0/16"));
    assert_eq!(envelope.resource_group.as_deref(), Some("rg-a"));

    let calls = api.calls();
    let rg_create = calls
        .iter()
        .position(|c| c.kind == ResourceKind::ResourceGroup && c.op == Operation::Create)
        .expect("resource group must be created");
    let vnet_create = calls
        .iter()
        .position(|c| c.kind == ResourceKind::VirtualNetwork && c.op == Operation::Create)
        .expect("virtual network must be created");
    assert!(
        rg_create < vnet_create,
        "VNET create must come after the resource group is provisioned"
    );

    // Allocation picked the next free /16 above the listed blocks
    let body = calls[vnet_create].body.as_ref().expect("create body");
    assert_eq!(
        body["properties"]["addressSpace"]["addressPrefixes"][0],
        "10.1.0.0/16"
    );
}

#[tokio::test]
async fn test_vnet_create_aborts_when_group_fails() {
    let api = FakeApi::new(|op, identity| match (identity.kind, op) {
        (ResourceKind::ResourceGroup, Operation::Check) => ok(404, Value::Null),
        (ResourceKind::ResourceGroup, Operation::Create) => ok(
            500,
            json!({"error": {"code": "InternalServerError", "message": "boom"}}),
        ),
        _ => ok(200, Value::Null),
    });

    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.is_provisioned, Provisioned::Unknown);
    assert_eq!(envelope.return_code, 500);
    assert_eq!(
        api.count(Operation::Create, ResourceKind::VirtualNetwork),
        0,
        "no VNET mutation against a group in an unknown state"
    );
}

#[tokio::test]
async fn test_vnet_create_reuses_existing_prefix() {
    let api = FakeApi::new(|op, identity| match (identity.kind, op) {
        (ResourceKind::ResourceGroup, Operation::Check) => {
            ok(200, rg_payload("Succeeded", "eastus"))
        }
        (ResourceKind::VirtualNetwork, Operation::Check) => {
            ok(200, vnet_payload("Succeeded", "eastus", "10.8.0.0/16"))
        }
        (ResourceKind::VirtualNetwork, Operation::Create) => {
            ok(200, vnet_payload("Accepted", "eastus", "10.8.0.0/16"))
        }
        _ => ok(200, Value::Null),
    });

    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    assert_eq!(envelope.address_prefix.as_deref(), Some("10.8.0.0/16"));
    assert_eq!(
        api.count(Operation::ListInSubscription, ResourceKind::VirtualNetwork),
        0,
        "allocator is only consulted for confirmed-absent networks"
    );
    let calls = api.calls();
    let create = calls
        .iter()
        .find(|c| c.kind == ResourceKind::VirtualNetwork && c.op == Operation::Create)
        .expect("create call");
    assert_eq!(
        create.body.as_ref().unwrap()["properties"]["addressSpace"]["addressPrefixes"][0],
        "10.8.0.0/16"
    );
}

#[tokio::test]
async fn test_vnet_conflict_adopts_existing_location() {
    let api = FakeApi::new(|op, identity| match (identity.kind, op) {
        (ResourceKind::ResourceGroup, Operation::Check) => {
            ok(200, rg_payload("Succeeded", "eastus"))
        }
        (ResourceKind::VirtualNetwork, Operation::Check) => {
            ok(200, vnet_payload("Succeeded", "westus", "10.3.0.0/16"))
        }
        (ResourceKind::VirtualNetwork, Operation::Create) => {
            ok(409, conflict_body("InvalidResourceLocation"))
        }
        _ => ok(200, Value::Null),
    });

    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.create().await;

    // The existing network wins: its location and prefix are reported,
    // the requested location only appears in the message.
    assert_eq!(envelope.is_provisioned, Provisioned::Yes);
    assert_eq!(envelope.return_code, 200);
    assert_eq!(envelope.location, "westus");
    assert_eq!(envelope.address_prefix.as_deref(), Some("10.3.0.0/16"));
    assert!(envelope.message.contains("already exists in location 'westus'"));
    assert!(envelope.message.contains("You requested 'eastus'"));
}

#[tokio::test]
async fn test_vnet_check_reports_state_and_prefix() {
    let api = FakeApi::new(|op, _identity| match op {
        Operation::Check => ok(200, vnet_payload("Succeeded", "eastus", "10.2.0.0/16")),
        _ => ok(200, Value::Null),
    });

    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.check().await;

    assert_eq!(envelope.is_provisioned, Provisioned::Yes);
    assert_eq!(envelope.provisioning_state, Some(ProvisioningState::Succeeded));
    assert_eq!(envelope.address_prefix.as_deref(), Some("10.2.0.0/16"));
    assert_eq!(envelope.name, "vnet-a");
}

#[tokio::test]
async fn test_vnet_client_error_maps_to_unknown_500() {
    // The group is healthy; only network calls fail.
    let api = FakeApi::new(|_op, identity| match identity.kind {
        ResourceKind::ResourceGroup => ok(200, rg_payload("Succeeded", "eastus")),
        ResourceKind::VirtualNetwork => Err(ClientError::MissingBody),
    });
    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());

    let checked = reconciler.check().await;
    assert_eq!(checked.is_provisioned, Provisioned::Unknown);
    assert_eq!(checked.return_code, 500);
    assert!(checked.message.contains("Exception checking for Virtual Network: vnet-a"));
    assert!(checked.message.contains("request body"), "cause must reach the message");

    let created = reconciler.create().await;
    assert_eq!(created.is_provisioned, Provisioned::Unknown);
    assert_eq!(created.return_code, 500);
    assert!(created.message.contains("Exception creating Virtual Network: vnet-a"));
    assert_eq!(created.address_prefix.as_deref(), Some("Unknown"));
}

#[tokio::test]
async fn test_vnet_check_absent() {
    let api = FakeApi::new(|_op, _identity| ok(404, Value::Null));
    let reconciler =
        VirtualNetworkReconciler::new(&api, vnet_identity(), FAST, "track-1".to_string());
    let envelope = reconciler.check().await;
    assert_eq!(envelope.is_provisioned, Provisioned::No);
    assert_eq!(envelope.return_code, 404);
}
