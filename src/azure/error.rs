//! Errors at the management API client boundary.

use thiserror::Error;

/// Failure to complete one request against the management API.
///
/// A `404` on a check is a normal response, never one of these. These
/// cover the cases the reconcilers map to a `ReturnCode = 500` envelope.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("token acquisition failed: {0}")]
    Token(#[source] azure_core::Error),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON in response (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("create requires a request body with at least a 'location' key")]
    MissingBody,
}
