//! HTTP surface: thin axum adapter over the reconcilers.
//!
//! Routes mirror the CLI one-to-one; the handler builds an identity,
//! runs the reconciler, and relays its envelope unchanged as the JSON
//! body. The HTTP status code equals the envelope's `ReturnCode`.

use crate::azure::AzureResourceClient;
use crate::config::Config;
use crate::models::{Envelope, ResourceIdentity};
use crate::reconcile::{ResourceGroupReconciler, VirtualNetworkReconciler};
use crate::tracking;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::error::Error;
use std::sync::Arc;

pub struct AppState {
    pub client: AzureResourceClient,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/location/{location}/resourceGroup/{rg_name}",
            get(check_rg).post(create_rg),
        )
        .route(
            "/resourceGroup/{rg_name}/location/{location}/virtual-network/{vnet_name}",
            get(check_vnet).post(create_vnet),
        )
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("HTTP surface listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn group_reconciler<'a>(
    state: &'a AppState,
    rg_name: &str,
    location: &str,
    tracking_id: String,
) -> ResourceGroupReconciler<'a, AzureResourceClient> {
    let identity = ResourceIdentity::group(&state.config.subscription_id, rg_name, location);
    ResourceGroupReconciler::new(&state.client, identity, state.config.create_poll, tracking_id)
}

fn vnet_reconciler<'a>(
    state: &'a AppState,
    rg_name: &str,
    location: &str,
    vnet_name: &str,
    tracking_id: String,
) -> VirtualNetworkReconciler<'a, AzureResourceClient> {
    let identity = ResourceIdentity::virtual_network(
        &state.config.subscription_id,
        rg_name,
        vnet_name,
        location,
    );
    VirtualNetworkReconciler::new(&state.client, identity, state.config.create_poll, tracking_id)
}

fn envelope_response(envelope: Envelope) -> impl IntoResponse {
    let status =
        StatusCode::from_u16(envelope.return_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope))
}

async fn check_rg(
    State(state): State<Arc<AppState>>,
    Path((location, rg_name)): Path<(String, String)>,
) -> impl IntoResponse {
    let tracking_id = tracking::new_tracking_id();
    let envelope = group_reconciler(&state, &rg_name, &location, tracking_id)
        .check()
        .await;
    envelope_response(envelope)
}

async fn create_rg(
    State(state): State<Arc<AppState>>,
    Path((location, rg_name)): Path<(String, String)>,
) -> impl IntoResponse {
    let tracking_id = tracking::new_tracking_id();
    let envelope = group_reconciler(&state, &rg_name, &location, tracking_id)
        .create()
        .await;
    envelope_response(envelope)
}

async fn check_vnet(
    State(state): State<Arc<AppState>>,
    Path((rg_name, location, vnet_name)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let tracking_id = tracking::new_tracking_id();
    let envelope = vnet_reconciler(&state, &rg_name, &location, &vnet_name, tracking_id)
        .check()
        .await;
    envelope_response(envelope)
}

async fn create_vnet(
    State(state): State<Arc<AppState>>,
    Path((rg_name, location, vnet_name)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let tracking_id = tracking::new_tracking_id();
    let envelope = vnet_reconciler(&state, &rg_name, &location, &vnet_name, tracking_id)
        .create()
        .await;
    envelope_response(envelope)
}
