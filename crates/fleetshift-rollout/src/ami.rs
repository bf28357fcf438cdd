//! AMI rollout orchestrator.
//!
//! Replaces the machine image under a cluster's capacity without downtime:
//!
//! 1. Snapshot the cluster, the launch template and its scaling groups.
//! 2. Cut over: park the groups on a copy of the template, recreate the
//!    template with the new image, and start one new group per old group.
//! 3. Wait until the cluster has exactly twice its previous active members.
//! 4. Drain the previous members, then delete the old groups and the copy.
//!
//! There is no rollback on this path. Every failure after cutover is fatal,
//! leaves both generations of capacity running, and lists every resource
//! changed so far so an operator can finish by hand.

use std::time::{SystemTime, UNIX_EPOCH};

use fleetshift_core::ImageId;
use fleetshift_core::validate::require;
use fleetshift_gateway::PlatformGateway;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span, warn};

use crate::attempt::{RolloutAttempt, RolloutPhase};
use crate::cutover::{AmiCutoverPlan, execute_ami_cutover};
use crate::drain::{drain_members, retire_old_capacity};
use crate::error::{RolloutError, RolloutResult};
use crate::poller::{PollOutcome, cluster_capacity_doubled, poll_until};
use crate::policy::PollPolicy;
use crate::snapshot::load_ami_snapshot;

/// Operator input for an AMI rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmiRolloutRequest {
    pub cluster: String,
    /// Launch template whose image is replaced.
    pub template: String,
    pub image_id: String,
    pub instance_type: Option<String>,
    pub scaling_group_prefix: String,
    pub poll: PollPolicy,
}

/// What a completed AMI rollout did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmiRolloutReport {
    pub image_id: String,
    /// Images the cluster ran before the rollout.
    pub previous_images: Vec<String>,
    pub repointed_groups: usize,
    pub new_groups: Vec<String>,
    pub retired_groups: Vec<String>,
    pub drained_members: usize,
    pub readiness_secs: u64,
    pub drain_secs: u64,
}

pub async fn run_ami_rollout(
    gateway: &dyn PlatformGateway,
    request: &AmiRolloutRequest,
) -> RolloutResult<AmiRolloutReport> {
    let span = info_span!(
        "ami-update",
        cluster = %request.cluster,
        template = %request.template
    );
    execute(gateway, request).instrument(span).await
}

async fn execute(
    gateway: &dyn PlatformGateway,
    request: &AmiRolloutRequest,
) -> RolloutResult<AmiRolloutReport> {
    let cluster = require("cluster", &request.cluster)?;
    let template = require("launch template", &request.template)?;
    let image = ImageId::parse(request.image_id.trim())?;
    let instance_type = match request.instance_type.as_deref() {
        Some(t) => Some(require("instance type", t)?),
        None => None,
    };

    info!(image = %image, "starting ami rollout");
    let snapshot = load_ami_snapshot(gateway, cluster, template, &image)
        .await
        .map_err(RolloutError::Snapshot)?;

    info!(
        image = %snapshot.image.image_id,
        name = %snapshot.image.name,
        state = %snapshot.image.state,
        "found machine image"
    );
    info!(
        members = snapshot.members.len(),
        current_images = ?snapshot.current_images,
        "current cluster members"
    );
    info!(
        groups = ?snapshot.group_names(),
        instances = snapshot.group_instance_count(),
        "scaling groups using launch template"
    );
    if snapshot.members.is_empty() {
        warn!("cluster has no active members, readiness will be immediate");
    }

    let rollout_id = format!("{cluster}/{template}");
    let mut attempt = RolloutAttempt::new(&rollout_id, snapshot, request.poll.timeout_secs);

    // Cutover.
    attempt.enter(RolloutPhase::Cutover);
    let plan = AmiCutoverPlan {
        image_id: image.as_str(),
        instance_type,
        group_prefix: &request.scaling_group_prefix,
        stamp: epoch_secs(),
    };
    let result = execute_ami_cutover(gateway, &attempt.prior, &plan).await;
    let cutover = result.map_err(|e| attempt.abort(e))?;
    let mut touched = cutover.touched;

    // Readiness.
    attempt.enter(RolloutPhase::AwaitingReadiness);
    attempt.reset_clock();
    let prior_members = attempt.prior.members.len();
    info!(expected = prior_members * 2, "waiting for new instances to join cluster");
    let result = poll_until(
        &mut attempt,
        &request.poll,
        "new instances to join cluster",
        move || cluster_capacity_doubled(gateway, cluster, prior_members),
    )
    .await;
    let readiness =
        result.map_err(|e| attempt.abort(touched.after_cutover("readiness polling", e)))?;
    let readiness_secs = match readiness {
        PollOutcome::Ready { elapsed_secs } => elapsed_secs,
        PollOutcome::TimedOut { elapsed_secs } => {
            return Err(attempt.abort(RolloutError::ReadinessTimeout {
                what: "new instances to join the cluster".to_string(),
                elapsed_secs,
                touched: touched.to_vec(),
            }));
        }
    };
    info!(elapsed = readiness_secs, "new instances joined cluster");

    // Drain.
    let result = drain_members(gateway, &mut attempt, cluster, &request.poll, &mut touched).await;
    let drained = result.map_err(|e| attempt.abort(touched.after_cutover("drain", e)))?;
    let drain_secs = match drained {
        PollOutcome::Ready { elapsed_secs } => elapsed_secs,
        PollOutcome::TimedOut { elapsed_secs } => {
            return Err(attempt.abort(RolloutError::DrainTimeout {
                elapsed_secs,
                touched: touched.to_vec(),
            }));
        }
    };
    info!(elapsed = drain_secs, "old instances drained");

    let result = retire_old_capacity(
        gateway,
        &attempt.prior,
        &cutover.copy_template,
        &mut touched,
    )
    .await;
    result.map_err(|e| attempt.abort(touched.after_cutover("retire old capacity", e)))?;

    attempt.complete();
    Ok(AmiRolloutReport {
        image_id: image.to_string(),
        previous_images: attempt.prior.current_images.clone(),
        repointed_groups: cutover.repointed_groups,
        new_groups: cutover.new_groups,
        retired_groups: attempt.prior.group_names(),
        drained_members: prior_members,
        readiness_secs,
        drain_secs,
    })
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
