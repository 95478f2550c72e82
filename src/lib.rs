//! Automated provisioning of Azure resource groups and virtual
//! networks: check whether the resource exists, create it if absent,
//! poll the asynchronous provisioning to a terminal state, and report
//! one canonical envelope. Exposed through a CLI and an HTTP API.

pub mod allocator;
pub mod api;
pub mod azure;
pub mod config;
pub mod models;
pub mod poller;
pub mod reconcile;
pub mod tracking;

pub use allocator::next_prefix;
pub use config::Config;
pub use models::Envelope;
