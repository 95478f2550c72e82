//! Bearer-token acquisition for the management API.

use super::ClientError;
use crate::config;
use azure_core::auth::TokenCredential;
use azure_identity::DefaultAzureCredentialBuilder;
use std::sync::Arc;

/// Build the shared credential chain (environment, managed identity,
/// Azure CLI). Constructed once at startup and passed into the client;
/// token caching and refresh live inside the credential.
pub fn default_credential() -> Arc<dyn TokenCredential> {
    Arc::new(DefaultAzureCredentialBuilder::new().build())
}

/// Fetch a bearer token for the management scope.
pub async fn bearer_token(credential: &Arc<dyn TokenCredential>) -> Result<String, ClientError> {
    let token = credential
        .get_token(&[config::MANAGEMENT_SCOPE])
        .await
        .map_err(ClientError::Token)?;
    Ok(token.token.secret().to_string())
}
