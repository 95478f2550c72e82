//! Remote provisioning lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provisioning state reported by the management API for an
/// asynchronous create operation.
///
/// `Succeeded` is the only success terminal; `Failed` and `Canceled` are
/// failure terminals. `Accepted` means provisioning is still running.
/// `Unknown` covers unreachable or unparseable status responses and
/// doubles as the sentinel when a poll budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    NotFound,
    Accepted,
    Succeeded,
    Failed,
    Canceled,
    Unknown,
}

impl ProvisioningState {
    /// Map the string the management API reports into a state.
    /// Anything unrecognised (including Azure's transient states such as
    /// `Updating`) is treated as still-in-progress `Accepted`.
    pub fn from_remote(raw: &str) -> ProvisioningState {
        match raw {
            "Succeeded" => ProvisioningState::Succeeded,
            "Failed" => ProvisioningState::Failed,
            "Canceled" => ProvisioningState::Canceled,
            "NotFound" => ProvisioningState::NotFound,
            _ => ProvisioningState::Accepted,
        }
    }

    /// Terminal states stop the convergence poller.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProvisioningState::Succeeded
                | ProvisioningState::Failed
                | ProvisioningState::Canceled
        )
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::NotFound => "NotFound",
            ProvisioningState::Accepted => "Accepted",
            ProvisioningState::Succeeded => "Succeeded",
            ProvisioningState::Failed => "Failed",
            ProvisioningState::Canceled => "Canceled",
            ProvisioningState::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}
