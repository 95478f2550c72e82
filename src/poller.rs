//! Convergence poller for asynchronous provisioning.
//!
//! The management API accepts a create and finishes it in the
//! background; this loop re-fetches the status at a fixed interval
//! until a terminal state appears or the attempt budget runs out.

use crate::models::ProvisioningState;
use std::future::Future;
use std::time::Duration;

/// Attempt budget for one convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> PollPolicy {
        PollPolicy {
            max_attempts,
            interval,
        }
    }

    /// Default budget for driving a create to completion (~60s).
    pub const fn creation() -> PollPolicy {
        PollPolicy::new(30, Duration::from_secs(2))
    }
}

/// What one convergence loop observed.
#[derive(Debug)]
pub struct PollOutcome<P> {
    /// Last state seen; non-terminal (`Accepted`/`Unknown`) when the
    /// budget ran out without convergence.
    pub state: ProvisioningState,
    /// Latest payload any attempt produced.
    pub payload: Option<P>,
    pub attempts: u32,
}

/// Poll `fetch` until it reports a terminal state or `policy` is spent.
///
/// Attempt 1 runs immediately; each further attempt waits `interval`
/// first. A fetch that cannot reach the remote reports `Unknown`, which
/// is non-terminal, so one transient failure never aborts convergence.
/// Dropping the returned future cancels the local wait only; the remote
/// operation keeps running.
pub async fn poll_until_terminal<F, Fut, P>(policy: PollPolicy, mut fetch: F) -> PollOutcome<P>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = (ProvisioningState, Option<P>)>,
{
    let mut state = ProvisioningState::Unknown;
    let mut payload = None;
    let mut attempts = 0;

    for attempt in 1..=policy.max_attempts.max(1) {
        if attempt > 1 {
            tokio::time::sleep(policy.interval).await;
        }
        attempts = attempt;

        let (observed, observed_payload) = fetch().await;
        state = observed;
        if observed_payload.is_some() {
            payload = observed_payload;
        }
        log::debug!(
            "poll attempt {attempt}/{max}: state={state}",
            max = policy.max_attempts
        );
        if state.is_terminal() {
            break;
        }
    }

    PollOutcome {
        state,
        payload,
        attempts,
    }
}
