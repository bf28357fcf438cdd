//! Drain controller — moves workload off the pre-rollout capacity and
//! retires it.

use fleetshift_core::MemberStatus;
use fleetshift_gateway::{GatewayResult, PlatformGateway};
use tracing::{debug, info, warn};

use crate::attempt::{RolloutAttempt, RolloutPhase};
use crate::cutover::Touched;
use crate::poller::{PollOutcome, poll_until};
use crate::policy::PollPolicy;
use crate::snapshot::AmiSnapshot;

/// Mark the snapshot's members DRAINING and wait for their tasks to stop.
///
/// Restarts the attempt's polling clock.
pub async fn drain_members(
    gateway: &dyn PlatformGateway,
    attempt: &mut RolloutAttempt<AmiSnapshot>,
    cluster: &str,
    policy: &PollPolicy,
    touched: &mut Touched,
) -> GatewayResult<PollOutcome> {
    attempt.enter(RolloutPhase::Draining);
    attempt.reset_clock();

    let arns = attempt.prior.member_arns();
    if arns.is_empty() {
        info!("no previous cluster members to drain");
        return Ok(PollOutcome::Ready { elapsed_secs: 0 });
    }

    gateway
        .update_container_instances_state(cluster, &arns, MemberStatus::Draining)
        .await?;
    touched.record(format!("marked {} members draining", arns.len()));
    info!(count = arns.len(), "draining tasks from old instances");

    let arns = &arns;
    poll_until(attempt, policy, "old instances to drain", move || async move {
        running_tasks(gateway, cluster, arns).await.map(|n| n == 0)
    })
    .await
}

async fn running_tasks(
    gateway: &dyn PlatformGateway,
    cluster: &str,
    arns: &[String],
) -> GatewayResult<u32> {
    let members = gateway.describe_container_instances(cluster, arns).await?;
    let total = members.iter().map(|m| m.running_tasks).sum();
    debug!(running = total, "tasks left on old instances");
    Ok(total)
}

/// Force-delete the original scaling groups, then the parking template.
pub async fn retire_old_capacity(
    gateway: &dyn PlatformGateway,
    snapshot: &AmiSnapshot,
    copy: &str,
    touched: &mut Touched,
) -> GatewayResult<()> {
    for group in &snapshot.groups {
        gateway.delete_scaling_group(&group.name, true).await?;
        touched.record(format!("deleted group {}", group.name));
        info!(group = %group.name, "deleted old scaling group");
    }

    match gateway.delete_launch_template(copy).await {
        Ok(()) => {
            touched.record(format!("deleted template {copy}"));
            info!(template = %copy, "deleted copied launch template");
        }
        Err(e) if e.is_not_found() => warn!(template = %copy, "copied launch template already gone"),
        Err(e) => return Err(e),
    }
    Ok(())
}
