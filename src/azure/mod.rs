//! Management API interaction.
//!
//! This module handles all remote-API-facing concerns:
//! - [`auth`] - bearer-token acquisition through the credential chain
//! - [`client`] - the typed request facade over the REST endpoints
//! - [`error`] - the client-boundary error taxonomy

pub mod auth;
mod client;
mod error;

// Re-export public types
pub use client::{ApiResponse, AzureResourceClient, Operation, ResourceApi};
pub use error::ClientError;
