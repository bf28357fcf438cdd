//! Snapshot loader — reads the state a rollout is planned from.
//!
//! Pure reads, no retries. Any failure here aborts the rollout before the
//! first mutation.

use fleetshift_core::{
    ClusterMember, ImageId, LaunchTemplate, MachineImage, MemberStatus, ScalingGroup, Service,
    TaskDefinition,
};
use fleetshift_gateway::{GatewayResult, PlatformGateway};
use tracing::debug;

/// Everything an AMI rollout needs to know before it starts.
#[derive(Debug, Clone)]
pub struct AmiSnapshot {
    /// The requested replacement image, confirmed to exist.
    pub image: MachineImage,
    /// Active cluster members before scale-up, with their backing images.
    pub members: Vec<ClusterMember>,
    /// Distinct backing images of `members`.
    pub current_images: Vec<String>,
    pub template: LaunchTemplate,
    /// Scaling groups bound to `template`.
    pub groups: Vec<ScalingGroup>,
}

impl AmiSnapshot {
    pub fn member_arns(&self) -> Vec<String> {
        self.members.iter().map(|m| m.arn.clone()).collect()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Instances across all dependent scaling groups.
    pub fn group_instance_count(&self) -> usize {
        self.groups.iter().map(|g| g.instances.len()).sum()
    }
}

/// The service and the revision it runs before a service rollout.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub service: Service,
    pub task_definition: TaskDefinition,
}

impl ServiceSnapshot {
    /// Image of the first container, the one a rollout replaces.
    pub fn current_image(&self) -> Option<&str> {
        self.task_definition
            .containers
            .first()
            .map(|c| c.image.as_str())
    }
}

pub async fn load_ami_snapshot(
    gateway: &dyn PlatformGateway,
    cluster: &str,
    template_name: &str,
    image: &ImageId,
) -> GatewayResult<AmiSnapshot> {
    let image = gateway.describe_image(image.as_str()).await?;
    let members = load_active_members(gateway, cluster).await?;
    let current_images = distinct_images(&members);
    let template = gateway.describe_launch_template(template_name).await?;
    let groups = gateway.describe_scaling_groups(template_name).await?;

    debug!(
        members = members.len(),
        groups = groups.len(),
        "ami snapshot loaded"
    );

    Ok(AmiSnapshot {
        image,
        members,
        current_images,
        template,
        groups,
    })
}

pub async fn load_service_snapshot(
    gateway: &dyn PlatformGateway,
    cluster: &str,
    service: &str,
) -> GatewayResult<ServiceSnapshot> {
    let service = gateway.describe_service(cluster, service).await?;
    let task_definition = gateway
        .describe_task_definition(&service.task_definition)
        .await?;

    debug!(
        service = %service.name,
        revision = %task_definition.arn,
        "service snapshot loaded"
    );

    Ok(ServiceSnapshot {
        service,
        task_definition,
    })
}

/// Active members of `cluster`, joined with their backing machine images.
async fn load_active_members(
    gateway: &dyn PlatformGateway,
    cluster: &str,
) -> GatewayResult<Vec<ClusterMember>> {
    let arns = gateway
        .list_container_instances(cluster, MemberStatus::Active)
        .await?;
    if arns.is_empty() {
        return Ok(Vec::new());
    }

    let mut members = gateway.describe_container_instances(cluster, &arns).await?;
    let instance_ids: Vec<String> = members.iter().map(|m| m.instance_id.clone()).collect();
    let instances = gateway.describe_instances(&instance_ids).await?;

    for member in &mut members {
        member.image_id = instances
            .iter()
            .find(|i| i.instance_id == member.instance_id)
            .map(|i| i.image_id.clone());
    }
    Ok(members)
}

/// Backing image ids in member order, consecutive repeats collapsed.
fn distinct_images(members: &[ClusterMember]) -> Vec<String> {
    let mut images: Vec<String> = members.iter().filter_map(|m| m.image_id.clone()).collect();
    images.dedup();
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(arn: &str, image: Option<&str>) -> ClusterMember {
        ClusterMember {
            arn: arn.to_string(),
            instance_id: format!("i-{arn}"),
            status: MemberStatus::Active,
            running_tasks: 1,
            image_id: image.map(str::to_string),
        }
    }

    #[test]
    fn distinct_images_collapses_runs() {
        let members = vec![
            member("a", Some("ami-11111111")),
            member("b", Some("ami-11111111")),
            member("c", Some("ami-22222222")),
            member("d", None),
        ];
        assert_eq!(
            distinct_images(&members),
            vec!["ami-11111111".to_string(), "ami-22222222".to_string()]
        );
    }

    #[test]
    fn current_image_is_first_container() {
        let snapshot = ServiceSnapshot {
            service: Service {
                name: "web".to_string(),
                cluster: "prod".to_string(),
                task_definition: "arn:td/web:1".to_string(),
                desired_count: 1,
                running_count: 1,
                pending_count: 0,
                deployment_configuration: Default::default(),
            },
            task_definition: TaskDefinition {
                arn: "arn:td/web:1".to_string(),
                family: "web".to_string(),
                revision: 1,
                task_role_arn: None,
                containers: Vec::new(),
            },
        };
        assert_eq!(snapshot.current_image(), None);
    }
}
