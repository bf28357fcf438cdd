//! Readiness poller — bounded wait for a predicate to hold.
//!
//! Each iteration evaluates the predicate once against freshly fetched
//! state. A timeout is an ordinary outcome, not an error; a gateway failure
//! inside the predicate aborts the loop immediately.

use std::future::Future;

use fleetshift_core::{MemberStatus, Service, Task};
use fleetshift_gateway::{GatewayResult, PlatformGateway};
use tracing::{debug, info, warn};

use crate::attempt::RolloutAttempt;
use crate::policy::PollPolicy;

/// How a polling phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { elapsed_secs: u64 },
    TimedOut { elapsed_secs: u64 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn elapsed_secs(&self) -> u64 {
        match self {
            PollOutcome::Ready { elapsed_secs } | PollOutcome::TimedOut { elapsed_secs } => {
                *elapsed_secs
            }
        }
    }
}

/// Evaluate `ready` until it holds or the attempt's budget runs out.
///
/// The clock is not reset here; callers reset it when a new phase starts.
pub async fn poll_until<P, F, Fut>(
    attempt: &mut RolloutAttempt<P>,
    policy: &PollPolicy,
    what: &str,
    mut ready: F,
) -> GatewayResult<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<bool>>,
{
    loop {
        if ready().await? {
            debug!(what, elapsed = attempt.elapsed_secs, "condition met");
            return Ok(PollOutcome::Ready {
                elapsed_secs: attempt.elapsed_secs,
            });
        }
        if attempt.budget_exhausted() {
            warn!(
                what,
                elapsed = attempt.elapsed_secs,
                timeout = attempt.timeout_secs,
                "poll budget exhausted"
            );
            return Ok(PollOutcome::TimedOut {
                elapsed_secs: attempt.elapsed_secs,
            });
        }
        tokio::time::sleep(policy.interval()).await;
        attempt.tick(policy.interval_secs);
        info!(
            elapsed = attempt.elapsed_secs,
            timeout = attempt.timeout_secs,
            "polling for {what}"
        );
    }
}

/// AMI readiness: exactly twice the pre-rollout member count is active.
///
/// Exact match: overshoot does not count as ready.
pub fn capacity_doubled(prior_members: usize, active_now: usize) -> bool {
    active_now == prior_members * 2
}

pub async fn cluster_capacity_doubled(
    gateway: &dyn PlatformGateway,
    cluster: &str,
    prior_members: usize,
) -> GatewayResult<bool> {
    let active = gateway
        .list_container_instances(cluster, MemberStatus::Active)
        .await?;
    debug!(active = active.len(), expected = prior_members * 2, "active members");
    Ok(capacity_doubled(prior_members, active.len()))
}

/// Service readiness.
///
/// All of: bound to `target`, desired == running, nothing pending, and no
/// task left running another revision.
pub fn success_condition(service: &Service, other_tasks: &[Task], target: &str) -> bool {
    if service.task_definition != target {
        return false;
    }
    if service.desired_count != service.running_count {
        return false;
    }
    if service.pending_count != 0 {
        return false;
    }
    other_tasks.is_empty()
}

pub async fn service_converged(
    gateway: &dyn PlatformGateway,
    cluster: &str,
    service: &str,
    target: &str,
) -> GatewayResult<bool> {
    let current = gateway.describe_service(cluster, service).await?;
    let task_arns = gateway.list_tasks(cluster, service).await?;
    debug!(tasks = ?task_arns, "tasks found");

    let tasks = if task_arns.is_empty() {
        Vec::new()
    } else {
        gateway.describe_tasks(cluster, &task_arns).await?
    };
    let other_tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.task_definition_arn != target)
        .collect();

    Ok(success_condition(&current, &other_tasks, target))
}
