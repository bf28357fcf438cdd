//! Cutover executor — applies the mutating steps of a rollout in order.
//!
//! Steps run at most once and are never retried or compensated. A failure
//! aborts with the step name and everything touched so far, which is enough
//! for an operator to finish the job by hand or re-run.

use fleetshift_core::{DeploymentConfiguration, ServiceUpdate, TaskDefinition};
use fleetshift_gateway::{GatewayError, PlatformGateway};
use tracing::info;

use crate::error::{CutoverStep, RolloutError, RolloutResult};
use crate::planner::{
    PlanTarget, TemplateOverrides, plan_replacement_groups, plan_task_definition, plan_template,
};
use crate::snapshot::{AmiSnapshot, ServiceSnapshot};

/// Resources a rollout has changed, in the order it changed them.
///
/// Started by the cutover and extended by the drain and retire phases, so
/// any later failure can name what is left for an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched(Vec<String>);

impl Touched {
    pub fn record(&mut self, what: String) {
        self.0.push(what);
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }

    fn fail(&self, step: CutoverStep, source: GatewayError) -> RolloutError {
        RolloutError::Cutover {
            step,
            touched: self.to_vec(),
            source,
        }
    }

    pub fn after_cutover(&self, stage: &'static str, source: GatewayError) -> RolloutError {
        RolloutError::AfterCutover {
            stage,
            touched: self.to_vec(),
            source,
        }
    }
}

/// Parameters of an AMI cutover.
#[derive(Debug, Clone)]
pub struct AmiCutoverPlan<'a> {
    pub image_id: &'a str,
    pub instance_type: Option<&'a str>,
    pub group_prefix: &'a str,
    /// Unix seconds, used to name replacement groups.
    pub stamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmiCutoverReport {
    pub copy_template: String,
    pub repointed_groups: usize,
    pub new_groups: Vec<String>,
    pub touched: Touched,
}

/// Swap the launch template under every dependent group and double capacity.
pub async fn execute_ami_cutover(
    gateway: &dyn PlatformGateway,
    snapshot: &AmiSnapshot,
    plan: &AmiCutoverPlan<'_>,
) -> RolloutResult<AmiCutoverReport> {
    let mut touched = Touched::default();
    let original = &snapshot.template.name;

    // 0. Parking spot.
    let copy = plan_template(&snapshot.template, &TemplateOverrides::default(), PlanTarget::Copy);
    gateway
        .create_launch_template(&copy)
        .await
        .map_err(|e| touched.fail(CutoverStep::CreateCopyTemplate, e))?;
    touched.record(format!("created template {}", copy.name));
    info!(template = %copy.name, "copied launch template");

    // 1. Repoint.
    let mut repointed = 0;
    for group in &snapshot.groups {
        gateway
            .update_scaling_group_template(&group.name, &copy.name)
            .await
            .map_err(|e| touched.fail(CutoverStep::RepointGroups, e))?;
        touched.record(format!("repointed group {} to {}", group.name, copy.name));
        repointed += 1;
    }
    info!(count = repointed, "updated scaling groups with copied launch template");

    // 2. Free the original name.
    gateway
        .delete_launch_template(original)
        .await
        .map_err(|e| touched.fail(CutoverStep::DeleteOriginalTemplate, e))?;
    touched.record(format!("deleted template {original}"));
    info!(template = %original, "deleted launch template");

    // 3. Recreate under the original name with the new image.
    let overrides = TemplateOverrides {
        image_id: Some(plan.image_id.to_string()),
        instance_type: plan.instance_type.map(str::to_string),
    };
    let replacement = plan_template(&snapshot.template, &overrides, PlanTarget::Final);
    gateway
        .create_launch_template(&replacement)
        .await
        .map_err(|e| touched.fail(CutoverStep::CreateFinalTemplate, e))?;
    touched.record(format!("created template {}", replacement.name));
    info!(
        template = %replacement.name,
        image = %replacement.image_id,
        instance_type = %replacement.instance_type,
        "created new launch template"
    );

    // 4. Double up: new groups alongside the old ones.
    info!("doubling up scaling group capacity");
    let planned = plan_replacement_groups(
        &snapshot.groups,
        &replacement.name,
        plan.group_prefix,
        plan.stamp,
    );
    let mut new_groups = Vec::with_capacity(planned.len());
    for group in &planned {
        gateway
            .create_scaling_group(group)
            .await
            .map_err(|e| touched.fail(CutoverStep::CreateReplacementGroups, e))?;
        touched.record(format!("created group {}", group.name));
        info!(
            group = %group.name,
            desired = group.desired_capacity,
            "created replacement scaling group"
        );
        new_groups.push(group.name.clone());
    }

    Ok(AmiCutoverReport {
        copy_template: copy.name,
        repointed_groups: repointed,
        new_groups,
        touched,
    })
}

#[derive(Debug, Clone)]
pub struct ServiceCutoverReport {
    pub revision: TaskDefinition,
    pub touched: Touched,
}

/// Register a new revision with `image` and point the service at it.
pub async fn execute_service_cutover(
    gateway: &dyn PlatformGateway,
    snapshot: &ServiceSnapshot,
    image: &str,
    desired_count: u32,
    deployment: DeploymentConfiguration,
) -> RolloutResult<ServiceCutoverReport> {
    let mut touched = Touched::default();
    let request = plan_task_definition(&snapshot.task_definition, image)?;

    info!(family = %request.family, "registering new task definition");
    let revision = gateway
        .register_task_definition(&request)
        .await
        .map_err(|e| touched.fail(CutoverStep::RegisterTaskDefinition, e))?;
    touched.record(format!("registered task definition {}", revision.arn));

    let update = ServiceUpdate {
        cluster: snapshot.service.cluster.clone(),
        service: snapshot.service.name.clone(),
        task_definition: revision.arn.clone(),
        desired_count,
        deployment_configuration: deployment,
    };
    info!(service = %update.service, revision = %update.task_definition, "updating service");
    let service = gateway
        .update_service(&update)
        .await
        .map_err(|e| touched.fail(CutoverStep::UpdateService, e))?;
    touched.record(format!("updated service {} to {}", service.name, revision.arn));
    info!(service = %service.name, "service updated");

    Ok(ServiceCutoverReport { revision, touched })
}
