//! Rollback handler for service rollouts.

use fleetshift_core::ServiceUpdate;
use fleetshift_gateway::{GatewayResult, PlatformGateway};
use tracing::{info, warn};

use crate::attempt::{RolloutAttempt, RolloutPhase};
use crate::poller::{PollOutcome, poll_until, service_converged};
use crate::policy::PollPolicy;
use crate::snapshot::ServiceSnapshot;

/// Point the service back at its pre-rollout revision and wait for it to
/// converge there.
///
/// Issues exactly one service update, restores the prior desired count and
/// deployment configuration, and polls against a fresh clock.
pub async fn rollback_service(
    gateway: &dyn PlatformGateway,
    attempt: &mut RolloutAttempt<ServiceSnapshot>,
    policy: &PollPolicy,
) -> GatewayResult<PollOutcome> {
    attempt.enter(RolloutPhase::RollingBack);

    let prior = &attempt.prior.service;
    let update = ServiceUpdate {
        cluster: prior.cluster.clone(),
        service: prior.name.clone(),
        task_definition: prior.task_definition.clone(),
        desired_count: prior.desired_count,
        deployment_configuration: prior.deployment_configuration,
    };
    warn!(
        service = %update.service,
        revision = %update.task_definition,
        "rolling back service to previous task definition"
    );
    gateway.update_service(&update).await?;

    attempt.reset_clock();
    let (cluster, service, target) = (
        update.cluster.as_str(),
        update.service.as_str(),
        update.task_definition.as_str(),
    );
    let outcome = poll_until(attempt, policy, "service rollback", move || {
        service_converged(gateway, cluster, service, target)
    })
    .await?;

    if outcome.is_ready() {
        info!(service, revision = target, "service rolled back");
    }
    Ok(outcome)
}
