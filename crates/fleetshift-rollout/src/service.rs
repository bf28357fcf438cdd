//! Service rollout orchestrator.
//!
//! Registers a task definition revision with a new container image, points
//! the service at it and waits for the service to converge. If it does not
//! converge in time the service is pointed back at the revision it ran
//! before; a rollback that fails or also times out is fatal.

use std::time::Duration;

use fleetshift_core::DeploymentConfiguration;
use fleetshift_core::validate::{container_image, require};
use fleetshift_gateway::PlatformGateway;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span, warn};

use crate::attempt::{RolloutAttempt, RolloutPhase};
use crate::cutover::execute_service_cutover;
use crate::error::{RolloutError, RolloutResult};
use crate::poller::{PollOutcome, poll_until, service_converged};
use crate::policy::PollPolicy;
use crate::rollback::rollback_service;
use crate::snapshot::load_service_snapshot;

/// Operator input for a service rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRolloutRequest {
    pub cluster: String,
    pub service: String,
    /// Container image reference for the first container.
    pub image: String,
    /// Keeps the current desired count when unset.
    pub desired_count: Option<u32>,
    pub deployment: DeploymentConfiguration,
    /// Wait between the service update and the first readiness poll. Not
    /// counted against the poll budget.
    pub settle_secs: u64,
    pub poll: PollPolicy,
}

/// How a service rollout that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceOutcome {
    Deployed {
        revision: String,
    },
    /// The new revision never converged; the service is back on its prior
    /// revision.
    RolledBack {
        failed_revision: String,
        restored_revision: String,
    },
}

impl ServiceOutcome {
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, ServiceOutcome::RolledBack { .. })
    }
}

pub async fn run_service_rollout(
    gateway: &dyn PlatformGateway,
    request: &ServiceRolloutRequest,
) -> RolloutResult<ServiceOutcome> {
    let span = info_span!(
        "deploy",
        cluster = %request.cluster,
        service = %request.service
    );
    execute(gateway, request).instrument(span).await
}

async fn execute(
    gateway: &dyn PlatformGateway,
    request: &ServiceRolloutRequest,
) -> RolloutResult<ServiceOutcome> {
    let cluster = require("cluster", &request.cluster)?;
    let service = require("service", &request.service)?;
    let image = container_image(&request.image)?;

    let snapshot = load_service_snapshot(gateway, cluster, service)
        .await
        .map_err(RolloutError::Snapshot)?;
    info!(
        revision = %snapshot.service.task_definition,
        image = snapshot.current_image().unwrap_or("<none>"),
        desired = snapshot.service.desired_count,
        "current service state"
    );

    let desired_count = request
        .desired_count
        .unwrap_or(snapshot.service.desired_count);
    let rollout_id = format!("{cluster}/{service}");
    let mut attempt = RolloutAttempt::new(&rollout_id, snapshot, request.poll.timeout_secs);

    attempt.enter(RolloutPhase::Cutover);
    let result = execute_service_cutover(
        gateway,
        &attempt.prior,
        image,
        desired_count,
        request.deployment,
    )
    .await;
    let cutover = result.map_err(|e| attempt.abort(e))?;
    let target = cutover.revision.arn.as_str();

    if request.settle_secs > 0 {
        info!(secs = request.settle_secs, "waiting for service to settle");
        tokio::time::sleep(Duration::from_secs(request.settle_secs)).await;
    }

    attempt.enter(RolloutPhase::AwaitingReadiness);
    attempt.reset_clock();
    let result = poll_until(&mut attempt, &request.poll, "service deployment", move || {
        service_converged(gateway, cluster, service, target)
    })
    .await;
    let outcome = result
        .map_err(|e| attempt.abort(cutover.touched.after_cutover("readiness polling", e)))?;

    if let PollOutcome::Ready { elapsed_secs } = outcome {
        info!(revision = target, elapsed = elapsed_secs, "service deployed");
        attempt.complete();
        return Ok(ServiceOutcome::Deployed {
            revision: target.to_string(),
        });
    }

    warn!(
        revision = target,
        elapsed = outcome.elapsed_secs(),
        "timeout reached waiting for service deployment, rolling back"
    );
    let restored = attempt.prior.service.task_definition.clone();
    let result = rollback_service(gateway, &mut attempt, &request.poll).await;
    let rolled_back = result.map_err(|e| {
        attempt.abort(RolloutError::RollbackFailed {
            service: service.to_string(),
            revision: restored.clone(),
            source: Some(e),
        })
    })?;

    if rolled_back.is_ready() {
        attempt.roll_back();
        Ok(ServiceOutcome::RolledBack {
            failed_revision: target.to_string(),
            restored_revision: restored,
        })
    } else {
        Err(attempt.abort(RolloutError::RollbackFailed {
            service: service.to_string(),
            revision: restored,
            source: None,
        }))
    }
}
