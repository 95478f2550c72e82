//! Environment-driven runtime settings.
//!
//! Loaded once in `main` after `dotenv`, then shared by reference.
//! `AZURE_SUBSCRIPTION_ID` is required; everything else has a default.

use crate::poller::PollPolicy;
use std::error::Error;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const API_VERSION: &str = "2022-09-01";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

#[derive(Debug, Clone)]
pub struct Config {
    pub subscription_id: String,
    pub endpoint: String,
    pub api_version: String,
    /// Convergence budget for create operations.
    pub create_poll: PollPolicy,
}

impl Config {
    /// Defaults for everything except the subscription.
    pub fn new(subscription_id: &str) -> Config {
        Config {
            subscription_id: subscription_id.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: API_VERSION.to_string(),
            create_poll: PollPolicy::creation(),
        }
    }

    /// Read settings from the environment.
    ///
    /// # Returns
    /// * `Ok(Config)` - settings with defaults applied
    /// * `Err` - if `AZURE_SUBSCRIPTION_ID` is missing or an override
    ///   does not parse
    pub fn from_env() -> Result<Config, Box<dyn Error>> {
        let subscription_id = std::env::var("AZURE_SUBSCRIPTION_ID")
            .map_err(|_| "AZURE_SUBSCRIPTION_ID is not set")?;
        let mut config = Config::new(&subscription_id);

        if let Ok(endpoint) = std::env::var("AZURE_MGMT_ENDPOINT") {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Ok(attempts) = std::env::var("PROVISION_POLL_ATTEMPTS") {
            config.create_poll.max_attempts = attempts
                .parse()
                .map_err(|e| format!("Invalid PROVISION_POLL_ATTEMPTS '{attempts}': {e}"))?;
        }
        if let Ok(secs) = std::env::var("PROVISION_POLL_INTERVAL_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| format!("Invalid PROVISION_POLL_INTERVAL_SECS '{secs}': {e}"))?;
            config.create_poll.interval = Duration::from_secs(secs);
        }

        log::info!(
            "config: subscription={} endpoint={} poll={}x{:?}",
            config.subscription_id,
            config.endpoint,
            config.create_poll.max_attempts,
            config.create_poll.interval
        );
        Ok(config)
    }
}
