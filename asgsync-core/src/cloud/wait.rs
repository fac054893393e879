//! Polling a load balancer until it accepts changes again.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{Error, Result};

use super::api::LoadBalancerApi;
use super::types::LoadBalancer;

/// How long to poll for.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            attempts: 30,
        }
    }
}

impl WaitPolicy {
    pub fn new(interval: Duration, attempts: u32) -> Self {
        Self { interval, attempts }
    }
}

/// Polls `lb_id` until its status is `ACTIVE` and returns it.
///
/// # Errors
///
/// Returns `Error::Timeout` if the load balancer is still busy after
/// `policy.attempts` polls, or any API error from the lookup.
pub async fn wait_until_active<L>(api: &L, lb_id: u64, policy: WaitPolicy) -> Result<LoadBalancer>
where
    L: LoadBalancerApi + ?Sized,
{
    for attempt in 0..policy.attempts.max(1) {
        let lb = api.get_load_balancer(lb_id).await?;
        if lb.is_active() {
            return Ok(lb);
        }
        debug!(lb_id, status = %lb.status, attempt, "load balancer busy");
        sleep(policy.interval).await;
    }

    Err(Error::Timeout(format!(
        "load balancer {} to become ACTIVE",
        lb_id
    )))
}
